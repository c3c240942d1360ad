//! Dialect Strategies
//!
//! A [`DdlStrategy`] turns entity metadata into DDL text for one SQL dialect.
//! The trait supplies the statement shapes most dialects share; each dialect
//! overrides the parts where its syntax differs.
//!
//! Strategies are immutable once built and safe to share across threads.

pub mod dm;
pub mod h2;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod tdengine;

pub use dm::DmStrategy;
pub use h2::H2Strategy;
pub use mysql::MySqlStrategy;
pub use oracle::OracleStrategy;
pub use postgres::PostgresStrategy;
pub use tdengine::TdengineStrategy;

use tracing::warn;

use crate::config::{GeneratorConfig, UnmappedTypePolicy};
use crate::error::{DdlError, Result};
use crate::schema::{DatabaseColumnInfo, DatabaseTableInfo};
use crate::sql::sanitize::{QuoteStyle, quote_identifier, string_literal};
use crate::sql::typemap::TypeMapper;
use crate::types::{
    Dialect, Entity, Field, ForeignKeyInfo, IndexDefinition, ManyToManyTable,
    scan_many_to_many_tables,
};

/// DDL formatting for one SQL dialect
pub trait DdlStrategy: Send + Sync {
    /// Dialect this strategy was built for
    fn dialect(&self) -> Dialect;

    /// Whether this strategy can serve `dialect`
    fn supports(&self, dialect: Dialect) -> bool {
        self.dialect() == dialect
    }

    fn config(&self) -> &GeneratorConfig;

    fn type_mapper(&self) -> &TypeMapper;

    fn quote_style(&self) -> QuoteStyle;

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_identifier(identifier, self.quote_style())
    }

    /// Mapped column type, applying the configured unmapped-type policy
    fn column_type(&self, field: &Field) -> Result<String> {
        let mapped = self.type_mapper().resolve(field);
        if mapped.is_fallback() {
            match self.config().unmapped_types {
                UnmappedTypePolicy::Fallback => {
                    warn!(
                        field = %field.name,
                        type_name = %field.type_name,
                        dialect = %self.dialect(),
                        fallback = %mapped.sql,
                        "No type mapping found, using fallback type"
                    );
                }
                UnmappedTypePolicy::Reject => {
                    return Err(DdlError::UnmappedType {
                        field: field.name.clone(),
                        type_name: field.type_name.clone(),
                        dialect: self.dialect(),
                    });
                }
            }
        }
        Ok(mapped.sql)
    }

    /// One column clause of a CREATE / ALTER statement
    ///
    /// `inline_primary_key` is set for the single primary key column of a CREATE TABLE.
    fn column_definition(&self, field: &Field, inline_primary_key: bool) -> Result<String>;

    /// Text appended after the closing parenthesis of CREATE TABLE, with its leading space
    fn table_options(&self, _entity: &Entity) -> String {
        String::new()
    }

    /// Whether comments are already part of the CREATE TABLE text
    fn inline_comments(&self) -> bool {
        false
    }

    fn supports_foreign_keys(&self) -> bool {
        true
    }

    fn supports_indexes(&self) -> bool {
        true
    }

    /// Column a live catalog reports for `field` once the generated DDL ran
    fn expected_column(&self, field: &Field) -> Result<DatabaseColumnInfo> {
        Ok(DatabaseColumnInfo {
            name: field.resolved_column_name()?,
            type_name: self.column_type(field)?,
            size: field.length,
            nullable: !field.is_not_null(),
            default_value: field.default_value.clone(),
            comment: field.comment.clone(),
        })
    }

    /// Catalog view of the table [`generate_create_table`](Self::generate_create_table) creates
    fn expected_table(&self, entity: &Entity) -> Result<DatabaseTableInfo> {
        let mut table = DatabaseTableInfo::new(entity.table_name());
        table.comment = entity.comment.clone();
        table.columns = self.expected_columns(entity)?;
        for field in entity.primary_key_fields() {
            table.primary_keys.push(field.resolved_column_name()?);
        }
        if self.supports_foreign_keys() {
            table.foreign_keys = entity.foreign_keys.clone();
        }
        Ok(table)
    }

    /// Columns of the table [`generate_create_table`](Self::generate_create_table) creates, in order
    fn expected_columns(&self, entity: &Entity) -> Result<Vec<DatabaseColumnInfo>> {
        entity
            .columns()
            .map(|field| self.expected_column(field))
            .collect()
    }

    fn generate_create_table(&self, entity: &Entity) -> Result<String> {
        let primary_keys = entity.primary_key_fields();
        let inline_pk = primary_keys.len() == 1;

        let mut column_defs = Vec::with_capacity(entity.fields.len() + 1);
        for field in entity.columns() {
            column_defs.push(self.column_definition(field, inline_pk && field.primary_key)?);
        }

        if primary_keys.len() > 1 {
            let columns = primary_keys
                .iter()
                .map(|f| f.resolved_column_name().map(|c| self.quote_identifier(&c)))
                .collect::<Result<Vec<_>>>()?;
            column_defs.push(format!("PRIMARY KEY ({})", columns.join(", ")));
        }

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ( {} ){};",
            self.quote_identifier(&entity.table_name()),
            column_defs.join(", "),
            self.table_options(entity)
        ))
    }

    fn generate_drop_table(&self, table_name: &str) -> String {
        format!("DROP TABLE IF EXISTS {};", self.quote_identifier(table_name))
    }

    fn generate_add_column(&self, table_name: &str, field: &Field) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {};",
            self.quote_identifier(table_name),
            self.column_definition(field, false)?
        ))
    }

    fn generate_drop_column(&self, table_name: &str, column_name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {};",
            self.quote_identifier(table_name),
            self.quote_identifier(column_name)
        )
    }

    /// Statements changing an existing column to match `field`
    fn generate_modify_column(&self, table_name: &str, field: &Field) -> Result<Vec<String>>;

    fn generate_add_foreign_key(&self, table_name: &str, fk: &ForeignKeyInfo) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});",
            self.quote_identifier(table_name),
            self.quote_identifier(&fk.constraint_name(table_name)),
            self.quote_identifier(&fk.column_name),
            self.quote_identifier(&fk.referenced_table),
            self.quote_identifier(&fk.referenced_column)
        ))
    }

    fn generate_create_index(&self, table_name: &str, index: &IndexDefinition) -> Result<String> {
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        Ok(format!(
            "CREATE {}INDEX {} ON {} ({});",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&index.name),
            self.quote_identifier(table_name),
            columns.join(", ")
        ))
    }

    /// Junction table without its foreign keys
    fn generate_many_to_many_table(&self, table: &ManyToManyTable) -> Result<String> {
        self.generate_create_table(&table.to_entity())
    }

    /// Foreign keys of a junction table, added once both sides exist
    fn generate_many_to_many_foreign_keys(&self, table: &ManyToManyTable) -> Result<Vec<String>> {
        if !self.supports_foreign_keys() {
            return Ok(Vec::new());
        }
        table
            .foreign_keys()
            .iter()
            .map(|fk| self.generate_add_foreign_key(&table.table_name, fk))
            .collect()
    }

    /// Table and column comments as separate `COMMENT ON` statements
    fn generate_add_comment(&self, entity: &Entity) -> Result<Vec<String>> {
        let table = self.quote_identifier(&entity.table_name());
        let mut statements = Vec::new();

        if let Some(comment) = &entity.comment {
            statements.push(format!(
                "COMMENT ON TABLE {} IS {};",
                table,
                string_literal(comment)
            ));
        }

        for field in entity.columns() {
            if let Some(comment) = &field.comment {
                statements.push(format!(
                    "COMMENT ON COLUMN {}.{} IS {};",
                    table,
                    self.quote_identifier(&field.resolved_column_name()?),
                    string_literal(comment)
                ));
            }
        }

        Ok(statements)
    }

    /// Statements creating the sequences `fields` take their defaults from
    ///
    /// Dialects without sequence-backed defaults return nothing.
    fn sequence_prelude(&self, _fields: &[&Field]) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Every statement of a schema, for entities already in dependency order
    fn schema_statements(&self, entities: &[Entity]) -> Result<Vec<String>> {
        compose_schema(self, entities)
    }

    /// Whole-schema document, statements separated by blank lines
    fn generate_schema(&self, entities: &[Entity]) -> Result<String> {
        Ok(self.schema_statements(entities)?.join("\n\n"))
    }
}

/// Standard schema composition
///
/// Every CREATE TABLE, then the junction tables the entities declare, then
/// indexes, then foreign keys and comments per entity, then junction foreign keys.
pub fn compose_schema<S>(strategy: &S, entities: &[Entity]) -> Result<Vec<String>>
where
    S: DdlStrategy + ?Sized,
{
    let junctions: Vec<ManyToManyTable> = scan_many_to_many_tables(entities)?
        .into_iter()
        .filter(|j| {
            !entities
                .iter()
                .any(|e| e.table_name().eq_ignore_ascii_case(&j.table_name))
        })
        .collect();
    let mut statements = Vec::new();

    for entity in entities {
        statements.push(strategy.generate_create_table(entity)?);
    }
    for junction in &junctions {
        statements.push(strategy.generate_many_to_many_table(junction)?);
    }

    if strategy.supports_indexes() {
        for entity in entities {
            let table = entity.table_name();
            for index in entity.index_definitions()? {
                statements.push(strategy.generate_create_index(&table, &index)?);
            }
        }
    }

    for entity in entities {
        let table = entity.table_name();
        if strategy.supports_foreign_keys() {
            for fk in &entity.foreign_keys {
                statements.push(strategy.generate_add_foreign_key(&table, fk)?);
            }
        }
        if !strategy.inline_comments() && entity.has_comments() {
            statements.extend(strategy.generate_add_comment(entity)?);
        }
    }

    for junction in &junctions {
        statements.extend(strategy.generate_many_to_many_foreign_keys(junction)?);
    }

    Ok(statements)
}

/// `DEFAULT <expr>` clause for a field's default value
fn default_clause(field: &Field) -> Option<String> {
    field
        .default_value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| format!("DEFAULT {}", v))
}
