//! MySQL DDL
//!
//! Backtick quoting, `AUTO_INCREMENT`, InnoDB table options and inline comments.

use std::sync::Arc;

use super::{DdlStrategy, default_clause};
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::sql::sanitize::{QuoteStyle, string_literal};
use crate::sql::typemap::{
    TypeFamily, TypeMapper, TypeRule, decimal_type, is_long_text, string_length,
};
use crate::types::{Dialect, Entity, Field};

/// Strings longer than this become a TEXT type
pub const VARCHAR_TEXT_THRESHOLD: u32 = 1000;
/// Largest length stored as TEXT
pub const TEXT_MAX_LENGTH: u32 = 65_535;
/// Largest length stored as MEDIUMTEXT
pub const MEDIUMTEXT_MAX_LENGTH: u32 = 16_777_215;

const FALLBACK: &str = "VARCHAR(255)";

/// Built-in MySQL column types
pub fn base_type(family: TypeFamily, field: &Field) -> String {
    let sql = match family {
        TypeFamily::Int => "INT",
        TypeFamily::Long => "BIGINT",
        TypeFamily::Short => "SMALLINT",
        TypeFamily::Byte => "TINYINT",
        TypeFamily::Float => "FLOAT",
        TypeFamily::Double => "DOUBLE",
        TypeFamily::Decimal => return decimal_type("DECIMAL", field),
        TypeFamily::BigInteger => "DECIMAL(65, 0)",
        TypeFamily::Boolean => "TINYINT(1)",
        TypeFamily::Char => "CHAR(1)",
        TypeFamily::String => return string_type(field),
        TypeFamily::Date => "DATE",
        TypeFamily::Time => "TIME",
        TypeFamily::DateTime => "DATETIME",
        TypeFamily::ZonedDateTime => "TIMESTAMP",
        TypeFamily::Uuid => "CHAR(36)",
        TypeFamily::Bytes => "BLOB",
        TypeFamily::Json => "JSON",
    };
    sql.to_string()
}

fn string_type(field: &Field) -> String {
    if !is_long_text(field, VARCHAR_TEXT_THRESHOLD) {
        return format!("VARCHAR({})", string_length(field));
    }
    let sql = match field.length {
        Some(len) if len > MEDIUMTEXT_MAX_LENGTH => "LONGTEXT",
        Some(len) if len > TEXT_MAX_LENGTH => "MEDIUMTEXT",
        _ => "TEXT",
    };
    sql.to_string()
}

/// MySQL strategy
#[derive(Debug, Clone)]
pub struct MySqlStrategy {
    config: GeneratorConfig,
    mapper: TypeMapper,
}

impl MySqlStrategy {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_rules(config, Vec::new())
    }

    /// Build with custom type rules ahead of the built-in table
    pub fn with_rules(config: GeneratorConfig, rules: Vec<Arc<dyn TypeRule>>) -> Self {
        let mapper = TypeMapper::builder(Dialect::Mysql, base_type, FALLBACK)
            .rules(rules)
            .build();
        Self { config, mapper }
    }
}

impl Default for MySqlStrategy {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl DdlStrategy for MySqlStrategy {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
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

        if field.is_not_null() {
            parts.push("NOT NULL".to_string());
        }
        if field.auto_increment {
            parts.push("AUTO_INCREMENT".to_string());
        } else if let Some(default) = default_clause(field) {
            parts.push(default);
        }
        if inline_primary_key {
            parts.push("PRIMARY KEY".to_string());
        }
        if let Some(comment) = &field.comment {
            parts.push(format!("COMMENT {}", string_literal(comment)));
        }

        Ok(parts.join(" "))
    }

    fn table_options(&self, entity: &Entity) -> String {
        let mut options = String::new();
        if !self.config.mysql_table_options.is_empty() {
            options.push(' ');
            options.push_str(&self.config.mysql_table_options);
        }
        if let Some(comment) = &entity.comment {
            options.push_str(&format!(" COMMENT={}", string_literal(comment)));
        }
        options
    }

    fn inline_comments(&self) -> bool {
        true
    }

    fn generate_modify_column(&self, table_name: &str, field: &Field) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} MODIFY COLUMN {};",
            self.quote_identifier(table_name),
            self.column_definition(field, false)?
        )])
    }

    fn generate_add_comment(&self, entity: &Entity) -> Result<Vec<String>> {
        let table = self.quote_identifier(&entity.table_name());
        let mut statements = Vec::new();

        if let Some(comment) = &entity.comment {
            statements.push(format!(
                "ALTER TABLE {} COMMENT={};",
                table,
                string_literal(comment)
            ));
        }

        for field in entity.columns().filter(|f| f.comment.is_some()) {
            statements.push(format!(
                "ALTER TABLE {} MODIFY COLUMN {};",
                table,
                self.column_definition(field, false)?
            ));
        }

        Ok(statements)
    }
}
