//! DM (Dameng) DDL
//!
//! MySQL-style backtick quoting with Oracle-style `COMMENT ON` statements.

use std::sync::Arc;

use super::{DdlStrategy, default_clause};
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::sql::sanitize::QuoteStyle;
use crate::sql::typemap::{
    TypeFamily, TypeMapper, TypeRule, decimal_type, is_long_text, string_length,
};
use crate::types::{Dialect, Field};

/// Strings longer than this become TEXT
pub const VARCHAR_TEXT_THRESHOLD: u32 = 1000;

const FALLBACK: &str = "VARCHAR(255)";

/// Built-in DM column types
pub fn base_type(family: TypeFamily, field: &Field) -> String {
    let sql = match family {
        TypeFamily::Int => "INT",
        TypeFamily::Long => "BIGINT",
        TypeFamily::Short => "SMALLINT",
        TypeFamily::Byte => "TINYINT",
        TypeFamily::Float => "FLOAT",
        TypeFamily::Double => "DOUBLE",
        TypeFamily::Decimal => return decimal_type("DECIMAL", field),
        TypeFamily::BigInteger => "DECIMAL(38, 0)",
        TypeFamily::Boolean => "BIT",
        TypeFamily::Char => "CHAR(1)",
        TypeFamily::String => {
            if is_long_text(field, VARCHAR_TEXT_THRESHOLD) {
                "TEXT"
            } else {
                return format!("VARCHAR({})", string_length(field));
            }
        }
        TypeFamily::Date => "DATE",
        TypeFamily::Time => "TIME",
        TypeFamily::DateTime => "TIMESTAMP",
        TypeFamily::ZonedDateTime => "TIMESTAMP WITH TIME ZONE",
        TypeFamily::Uuid => "CHAR(36)",
        TypeFamily::Bytes => "BLOB",
        TypeFamily::Json => "CLOB",
    };
    sql.to_string()
}

/// DM strategy
#[derive(Debug, Clone)]
pub struct DmStrategy {
    config: GeneratorConfig,
    mapper: TypeMapper,
}

impl DmStrategy {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_rules(config, Vec::new())
    }

    pub fn with_rules(config: GeneratorConfig, rules: Vec<Arc<dyn TypeRule>>) -> Self {
        let mapper = TypeMapper::builder(Dialect::Dm, base_type, FALLBACK)
            .rules(rules)
            .build();
        Self { config, mapper }
    }
}

impl Default for DmStrategy {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl DdlStrategy for DmStrategy {
    fn dialect(&self) -> Dialect {
        Dialect::Dm
    }

    fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn type_mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::Backtick
    }

    fn column_definition(&self, field: &Field, inline_primary_key: bool) -> Result<String> {
        let mut parts = vec![
            self.quote_identifier(&field.resolved_column_name()?),
            self.column_type(field)?,
        ];

        if field.auto_increment {
            parts.push("IDENTITY(1, 1)".to_string());
        } else if let Some(default) = default_clause(field) {
            parts.push(default);
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
            "ALTER TABLE {} MODIFY {};",
            self.quote_identifier(table_name),
            self.column_definition(field, false)?
        )])
    }
}
