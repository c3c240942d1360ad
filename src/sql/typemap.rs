//! Column Type Mapping
//!
//! Maps a field to a dialect column type through a frozen chain of responsibility:
//!
//! 1. raw column definition override
//! 2. custom rules, in registration order
//! 3. the dialect's built-in table, keyed by the field's type family
//! 4. the dialect's fallback type
//!
//! The first step that produces a type wins. Mapping never fails.

use std::fmt;
use std::sync::Arc;

use crate::types::{Dialect, Field};

/// Default `VARCHAR` length when a string field has none
pub const DEFAULT_STRING_LENGTH: u32 = 255;
/// Default decimal precision
pub const DEFAULT_PRECISION: u32 = 10;
/// Default decimal scale
pub const DEFAULT_SCALE: u32 = 2;

// ============================================================================
// Type families
// ============================================================================

/// Source type families the built-in tables are keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    Int,
    Long,
    Short,
    Byte,
    Float,
    Double,
    Decimal,
    BigInteger,
    Boolean,
    Char,
    String,
    Date,
    Time,
    DateTime,
    ZonedDateTime,
    Uuid,
    Bytes,
    Json,
}

impl TypeFamily {
    /// Classify a source type name
    ///
    /// Fully-qualified names are checked first, then the simple name with
    /// generic arguments and a trailing `?` removed.
    pub fn classify(type_name: &str) -> Option<TypeFamily> {
        let trimmed = type_name.trim().trim_end_matches('?').trim();
        if let Some(family) = Self::by_full_name(trimmed) {
            return Some(family);
        }

        let base = trimmed.split('<').next().unwrap_or(trimmed).trim();
        if let Some(family) = Self::by_full_name(base) {
            return Some(family);
        }

        let simple = base.rsplit(['.', ':']).next().unwrap_or(base);
        Self::by_simple_name(simple)
    }

    fn by_full_name(name: &str) -> Option<TypeFamily> {
        let family = match name {
            "java.util.Date" | "java.sql.Timestamp" => TypeFamily::DateTime,
            "java.sql.Date" => TypeFamily::Date,
            "java.sql.Time" => TypeFamily::Time,
            "byte[]" | "Byte[]" | "[B" | "Vec<u8>" | "&[u8]" | "kotlin.ByteArray" => {
                TypeFamily::Bytes
            }
            "serde_json::Value" | "com.fasterxml.jackson.databind.JsonNode" => TypeFamily::Json,
            _ => return None,
        };
        Some(family)
    }

    fn by_simple_name(name: &str) -> Option<TypeFamily> {
        let family = match name {
            "Integer" | "Int" | "int" | "i32" | "u16" => TypeFamily::Int,
            "Long" | "long" | "i64" | "u32" | "u64" | "isize" | "usize" => TypeFamily::Long,
            "Short" | "short" | "i16" | "u8" => TypeFamily::Short,
            "Byte" | "byte" | "i8" => TypeFamily::Byte,
            "Float" | "float" | "f32" => TypeFamily::Float,
            "Double" | "double" | "f64" => TypeFamily::Double,
            "BigDecimal" | "Decimal" => TypeFamily::Decimal,
            "BigInteger" | "i128" | "u128" => TypeFamily::BigInteger,
            "Boolean" | "boolean" | "bool" => TypeFamily::Boolean,
            "Character" | "Char" | "char" => TypeFamily::Char,
            "String" | "str" | "&str" | "CharSequence" => TypeFamily::String,
            "LocalDate" | "NaiveDate" => TypeFamily::Date,
            "LocalTime" | "NaiveTime" => TypeFamily::Time,
            "LocalDateTime" | "NaiveDateTime" | "Timestamp" => TypeFamily::DateTime,
            "ZonedDateTime" | "OffsetDateTime" | "Instant" | "DateTime" => {
                TypeFamily::ZonedDateTime
            }
            "UUID" | "Uuid" => TypeFamily::Uuid,
            "ByteArray" => TypeFamily::Bytes,
            "JsonNode" | "JsonObject" | "Json" => TypeFamily::Json,
            _ => return None,
        };
        Some(family)
    }

    /// Date and time families usable as a time-series timestamp
    pub fn is_timestamp_like(&self) -> bool {
        matches!(
            self,
            TypeFamily::DateTime | TypeFamily::ZonedDateTime | TypeFamily::Date
        )
    }
}

// ============================================================================
// Built-in table helpers
// ============================================================================

/// Declared length or the default of 255
pub fn string_length(field: &Field) -> u32 {
    field.length.unwrap_or(DEFAULT_STRING_LENGTH)
}

/// Whether a string field should use the long-text type given the dialect threshold
pub fn is_long_text(field: &Field, threshold: u32) -> bool {
    field.text || field.length.is_some_and(|len| len > threshold)
}

/// `KEYWORD(p, s)` with the default precision and scale
pub fn decimal_type(keyword: &str, field: &Field) -> String {
    format!(
        "{}({}, {})",
        keyword,
        field.precision.unwrap_or(DEFAULT_PRECISION),
        field.scale.unwrap_or(DEFAULT_SCALE)
    )
}

// ============================================================================
// Rules and the mapper
// ============================================================================

/// A partial mapping rule; `None` means the rule does not apply
pub trait TypeRule: Send + Sync {
    fn map_type(&self, field: &Field) -> Option<String>;
}

impl<F> TypeRule for F
where
    F: Fn(&Field) -> Option<String> + Send + Sync,
{
    fn map_type(&self, field: &Field) -> Option<String> {
        self(field)
    }
}

/// A dialect's built-in table: total over the known families
pub type BaseTypeFn = fn(TypeFamily, &Field) -> String;

/// Which step of the chain produced a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSource {
    Override,
    /// Index of the custom rule, in registration order
    Rule(usize),
    Builtin(TypeFamily),
    Fallback,
}

/// A mapped column type and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    pub sql: String,
    pub source: TypeSource,
}

impl MappedType {
    pub fn is_fallback(&self) -> bool {
        self.source == TypeSource::Fallback
    }
}

/// Frozen per-dialect mapping chain
#[derive(Clone)]
pub struct TypeMapper {
    dialect: Dialect,
    rules: Vec<Arc<dyn TypeRule>>,
    base: BaseTypeFn,
    fallback: &'static str,
}

impl fmt::Debug for TypeMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMapper")
            .field("dialect", &self.dialect)
            .field("rules", &self.rules.len())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl TypeMapper {
    /// Start building a mapper around a dialect's built-in table
    pub fn builder(dialect: Dialect, base: BaseTypeFn, fallback: &'static str) -> TypeMapperBuilder {
        TypeMapperBuilder {
            dialect,
            rules: Vec::new(),
            base,
            fallback,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn fallback(&self) -> &'static str {
        self.fallback
    }

    /// Run the chain and report which step answered
    pub fn resolve(&self, field: &Field) -> MappedType {
        if let Some(raw) = field.raw_column_definition() {
            return MappedType {
                sql: raw.to_string(),
                source: TypeSource::Override,
            };
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(sql) = rule.map_type(field).filter(|s| !s.trim().is_empty()) {
                return MappedType {
                    sql,
                    source: TypeSource::Rule(index),
                };
            }
        }

        if let Some(family) = TypeFamily::classify(&field.type_name) {
            return MappedType {
                sql: (self.base)(family, field),
                source: TypeSource::Builtin(family),
            };
        }

        MappedType {
            sql: self.fallback.to_string(),
            source: TypeSource::Fallback,
        }
    }

    /// Column type for a field; always produces a type
    pub fn map_type(&self, field: &Field) -> String {
        self.resolve(field).sql
    }
}

/// Builder for TypeMapper; the rule list is fixed once built
pub struct TypeMapperBuilder {
    dialect: Dialect,
    rules: Vec<Arc<dyn TypeRule>>,
    base: BaseTypeFn,
    fallback: &'static str,
}

impl TypeMapperBuilder {
    /// Append a rule closure
    pub fn rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&Field) -> Option<String> + Send + Sync + 'static,
    {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Append an already shared rule
    pub fn shared_rule(mut self, rule: Arc<dyn TypeRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append several shared rules, keeping their order
    pub fn rules(mut self, rules: impl IntoIterator<Item = Arc<dyn TypeRule>>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn build(self) -> TypeMapper {
        TypeMapper {
            dialect: self.dialect,
            rules: self.rules,
            base: self.base,
            fallback: self.fallback,
        }
    }
}
