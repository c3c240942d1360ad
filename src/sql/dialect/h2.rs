//! H2 DDL

use std::sync::Arc;

use super::{DdlStrategy, default_clause};
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::sql::sanitize::QuoteStyle;
use crate::sql::typemap::{
    TypeFamily, TypeMapper, TypeRule, decimal_type, is_long_text, string_length,
};
use crate::types::{Dialect, Field};

/// Longest VARCHAR before switching to CLOB
pub const VARCHAR_MAX_LENGTH: u32 = 1_000_000;

const FALLBACK: &str = "VARCHAR(255)";

/// Built-in H2 column types
pub fn base_type(family: TypeFamily, field: &Field) -> String {
    let sql = match family {
        TypeFamily::Int => "INT",
        TypeFamily::Long => "BIGINT",
        TypeFamily::Short => "SMALLINT",
        TypeFamily::Byte => "TINYINT",
        TypeFamily::Float => "REAL",
        TypeFamily::Double => "DOUBLE PRECISION",
        TypeFamily::Decimal => return decimal_type("DECIMAL", field),
        TypeFamily::BigInteger => "NUMERIC(65, 0)",
        TypeFamily::Boolean => "BOOLEAN",
        TypeFamily::Char => "CHAR(1)",
        TypeFamily::String => {
            if is_long_text(field, VARCHAR_MAX_LENGTH) {
                "CLOB"
            } else {
                return format!("VARCHAR({})", string_length(field));
            }
        }
        TypeFamily::Date => "DATE",
        TypeFamily::Time => "TIME",
        TypeFamily::DateTime => "TIMESTAMP",
        TypeFamily::ZonedDateTime => "TIMESTAMP WITH TIME ZONE",
        TypeFamily::Uuid => "UUID",
        TypeFamily::Bytes => "BLOB",
        TypeFamily::Json => "JSON",
    };
    sql.to_string()
}

/// H2 strategy; auto-increment columns use `IDENTITY` as their type
#[derive(Debug, Clone)]
pub struct H2Strategy {
    config: GeneratorConfig,
    mapper: TypeMapper,
}

impl H2Strategy {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_rules(config, Vec::new())
    }

    pub fn with_rules(config: GeneratorConfig, rules: Vec<Arc<dyn TypeRule>>) -> Self {
        let mapper = TypeMapper::builder(Dialect::H2, base_type, FALLBACK)
            .rules(rules)
            .build();
        Self { config, mapper }
    }
}

impl Default for H2Strategy {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl DdlStrategy for H2Strategy {
    fn dialect(&self) -> Dialect {
        Dialect::H2
    }

    fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn type_mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn column_definition(&self, field: &Field, inline_primary_key: bool) -> Result<String> {
        let column_type = if field.auto_increment {
            "IDENTITY".to_string()
        } else {
            self.column_type(field)?
        };
        let mut parts = vec![
            self.quote_identifier(&field.resolved_column_name()?),
            column_type,
        ];

        if !field.auto_increment {
            if let Some(default) = default_clause(field) {
                parts.push(default);
            }
        }
        if field.is_not_null() {
            parts.push("NOT NULL".to_string());
        }
        if inline_primary_key {
            parts.push("PRIMARY KEY".to_string());
        }

        Ok(parts.join(" "))
    }

    fn generate_modify_column(&self, table_name: &str, field: &Field) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} ALTER COLUMN {};",
            self.quote_identifier(table_name),
            self.column_definition(field, false)?
        )])
    }
}
