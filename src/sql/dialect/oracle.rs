//! Oracle DDL

use std::sync::Arc;

use super::{DdlStrategy, default_clause};
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::sql::sanitize::QuoteStyle;
use crate::sql::typemap::{
    TypeFamily, TypeMapper, TypeRule, decimal_type, is_long_text, string_length,
};
use crate::types::{Dialect, Field};

/// Longest VARCHAR2 before switching to CLOB
pub const VARCHAR2_MAX_LENGTH: u32 = 4000;

const FALLBACK: &str = "VARCHAR2(255)";

/// Built-in Oracle column types
pub fn base_type(family: TypeFamily, field: &Field) -> String {
    let sql = match family {
        TypeFamily::Int => "NUMBER(10)",
        TypeFamily::Long => "NUMBER(19)",
        TypeFamily::Short => "NUMBER(5)",
        TypeFamily::Byte => "NUMBER(3)",
        TypeFamily::Float => "BINARY_FLOAT",
        TypeFamily::Double => "BINARY_DOUBLE",
        TypeFamily::Decimal => return decimal_type("NUMBER", field),
        TypeFamily::BigInteger => "NUMBER(38)",
        TypeFamily::Boolean => "NUMBER(1)",
        TypeFamily::Char => "CHAR(1)",
        TypeFamily::String => {
            if is_long_text(field, VARCHAR2_MAX_LENGTH) {
                "CLOB"
            } else {
                return format!("VARCHAR2({})", string_length(field));
            }
        }
        TypeFamily::Date => "DATE",
        TypeFamily::Time | TypeFamily::DateTime => "TIMESTAMP",
        TypeFamily::ZonedDateTime => "TIMESTAMP WITH TIME ZONE",
        TypeFamily::Uuid => "VARCHAR2(36)",
        TypeFamily::Bytes => "BLOB",
        TypeFamily::Json => "CLOB",
    };
    sql.to_string()
}

/// Oracle strategy; identifiers are upper-cased inside double quotes
#[derive(Debug, Clone)]
pub struct OracleStrategy {
    config: GeneratorConfig,
    mapper: TypeMapper,
}

impl OracleStrategy {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_rules(config, Vec::new())
    }

    pub fn with_rules(config: GeneratorConfig, rules: Vec<Arc<dyn TypeRule>>) -> Self {
        let mapper = TypeMapper::builder(Dialect::Oracle, base_type, FALLBACK)
            .rules(rules)
            .build();
        Self { config, mapper }
    }
}

impl Default for OracleStrategy {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl DdlStrategy for OracleStrategy {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn type_mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::UpperDoubleQuote
    }

    fn column_definition(&self, field: &Field, inline_primary_key: bool) -> Result<String> {
        let mut parts = vec![
            self.quote_identifier(&field.resolved_column_name()?),
            self.column_type(field)?,
        ];

        // DEFAULT must precede NOT NULL in Oracle
        if field.auto_increment {
            parts.push("GENERATED BY DEFAULT AS IDENTITY".to_string());
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

    fn generate_add_column(&self, table_name: &str, field: &Field) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD {};",
            self.quote_identifier(table_name),
            self.column_definition(field, false)?
        ))
    }

    fn generate_modify_column(&self, table_name: &str, field: &Field) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} MODIFY ({});",
            self.quote_identifier(table_name),
            self.column_definition(field, false)?
        )])
    }
}
