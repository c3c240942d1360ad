//! TDengine DDL
//!
//! Super-simple time-series tables: bare identifiers, no constraints, no
//! comments or foreign keys, and a mandatory leading TIMESTAMP column.

use std::sync::Arc;

use super::DdlStrategy;
use crate::config::GeneratorConfig;
use crate::error::{DdlError, Result};
use crate::schema::{DatabaseColumnInfo, DatabaseTableInfo};
use crate::sql::sanitize::QuoteStyle;
use crate::sql::typemap::{TypeFamily, TypeMapper, TypeRule, string_length};
use crate::types::{Dialect, Entity, Field, ForeignKeyInfo, IndexDefinition};

/// Name of the synthesized timestamp column
pub const TIMESTAMP_COLUMN: &str = "ts";

const FALLBACK: &str = "NCHAR(255)";

/// Built-in TDengine column types
pub fn base_type(family: TypeFamily, field: &Field) -> String {
    let sql = match family {
        TypeFamily::Int => "INT",
        TypeFamily::Long | TypeFamily::BigInteger => "BIGINT",
        TypeFamily::Short => "SMALLINT",
        TypeFamily::Byte => "TINYINT",
        TypeFamily::Float => "FLOAT",
        TypeFamily::Double | TypeFamily::Decimal => "DOUBLE",
        TypeFamily::Boolean => "BOOL",
        TypeFamily::Char => "NCHAR(1)",
        TypeFamily::String => return format!("NCHAR({})", string_length(field)),
        TypeFamily::Date
        | TypeFamily::Time
        | TypeFamily::DateTime
        | TypeFamily::ZonedDateTime => "TIMESTAMP",
        TypeFamily::Uuid => "NCHAR(36)",
        TypeFamily::Bytes => "VARBINARY(255)",
        TypeFamily::Json => "NCHAR(4096)",
    };
    sql.to_string()
}

/// TDengine strategy
#[derive(Debug, Clone)]
pub struct TdengineStrategy {
    config: GeneratorConfig,
    mapper: TypeMapper,
}

impl TdengineStrategy {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_rules(config, Vec::new())
    }

    pub fn with_rules(config: GeneratorConfig, rules: Vec<Arc<dyn TypeRule>>) -> Self {
        let mapper = TypeMapper::builder(Dialect::Tdengine, base_type, FALLBACK)
            .rules(rules)
            .build();
        Self { config, mapper }
    }

    /// Field used as the leading timestamp column, and the remaining column fields
    ///
    /// The first date/time field wins; otherwise a field already named `ts`.
    fn split_timestamp(entity: &Entity) -> Result<(Option<&Field>, Vec<&Field>)> {
        let mut columns: Vec<&Field> = entity.columns().collect();
        let mut position = columns.iter().position(|f| {
            TypeFamily::classify(&f.type_name).is_some_and(|family| family.is_timestamp_like())
        });

        if position.is_none() {
            for (index, field) in columns.iter().enumerate() {
                if field
                    .resolved_column_name()?
                    .eq_ignore_ascii_case(TIMESTAMP_COLUMN)
                {
                    position = Some(index);
                    break;
                }
            }
        }

        let timestamp = position.map(|index| columns.remove(index));
        Ok((timestamp, columns))
    }
}

impl Default for TdengineStrategy {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl DdlStrategy for TdengineStrategy {
    fn dialect(&self) -> Dialect {
        Dialect::Tdengine
    }

    fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn type_mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::Bare
    }

    fn supports_foreign_keys(&self) -> bool {
        false
    }

    fn supports_indexes(&self) -> bool {
        false
    }

    /// Columns only: no keys, constraints or comments are ever created
    fn expected_table(&self, entity: &Entity) -> Result<DatabaseTableInfo> {
        let mut table = DatabaseTableInfo::new(entity.table_name());
        table.columns = self.expected_columns(entity)?;
        Ok(table)
    }

    /// Leading TIMESTAMP column first, then the remaining fields
    fn expected_columns(&self, entity: &Entity) -> Result<Vec<DatabaseColumnInfo>> {
        let (timestamp, rest) = Self::split_timestamp(entity)?;
        let mut columns = Vec::with_capacity(rest.len() + 1);

        let leading = match timestamp {
            Some(field) => DatabaseColumnInfo::new(field.resolved_column_name()?, "TIMESTAMP"),
            None => DatabaseColumnInfo::new(TIMESTAMP_COLUMN, "TIMESTAMP"),
        };
        columns.push(leading.not_null());

        for field in rest {
            columns.push(self.expected_column(field)?);
        }
        Ok(columns)
    }

    fn column_definition(&self, field: &Field, _inline_primary_key: bool) -> Result<String> {
        Ok(format!(
            "{} {}",
            self.quote_identifier(&field.resolved_column_name()?),
            self.column_type(field)?
        ))
    }

    fn generate_create_table(&self, entity: &Entity) -> Result<String> {
        let (timestamp, rest) = Self::split_timestamp(entity)?;

        let leading = match timestamp {
            Some(field) => self.quote_identifier(&field.resolved_column_name()?),
            None => TIMESTAMP_COLUMN.to_string(),
        };
        let mut column_defs = vec![format!("{} TIMESTAMP", leading)];

        for field in rest {
            column_defs.push(self.column_definition(field, false)?);
        }

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ( {} );",
            self.quote_identifier(&entity.table_name()),
            column_defs.join(", ")
        ))
    }

    fn generate_modify_column(&self, table_name: &str, field: &Field) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} MODIFY COLUMN {};",
            self.quote_identifier(table_name),
            self.column_definition(field, false)?
        )])
    }

    fn generate_add_foreign_key(&self, _table_name: &str, _fk: &ForeignKeyInfo) -> Result<String> {
        Err(DdlError::unsupported("Foreign keys", Dialect::Tdengine))
    }

    fn generate_create_index(&self, _table_name: &str, _index: &IndexDefinition) -> Result<String> {
        Err(DdlError::unsupported("Indexes", Dialect::Tdengine))
    }

    fn generate_add_comment(&self, _entity: &Entity) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
