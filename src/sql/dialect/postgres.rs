//! PostgreSQL DDL
//!
//! Identity columns (or SERIAL), sequence-backed defaults with a
//! `CREATE SEQUENCE` prelude, and split ALTER COLUMN statements.

use std::sync::Arc;

use super::{DdlStrategy, compose_schema, default_clause};
use crate::config::{GeneratorConfig, PostgresIdentity};
use crate::error::Result;
use crate::sql::sanitize::{QuoteStyle, string_literal};
use crate::sql::typemap::{
    TypeFamily, TypeMapper, TypeRule, decimal_type, is_long_text, string_length,
};
use crate::types::{Dialect, Entity, Field};

/// Longest length PostgreSQL accepts for VARCHAR(n)
pub const VARCHAR_MAX_LENGTH: u32 = 10_485_760;

const FALLBACK: &str = "VARCHAR(255)";

/// Built-in PostgreSQL column types
pub fn base_type(family: TypeFamily, field: &Field) -> String {
    let sql = match family {
        TypeFamily::Int => "INTEGER",
        TypeFamily::Long => "BIGINT",
        TypeFamily::Short | TypeFamily::Byte => "SMALLINT",
        TypeFamily::Float => "REAL",
        TypeFamily::Double => "DOUBLE PRECISION",
        TypeFamily::Decimal => return decimal_type("NUMERIC", field),
        TypeFamily::BigInteger => "NUMERIC(65, 0)",
        TypeFamily::Boolean => "BOOLEAN",
        TypeFamily::Char => "CHAR(1)",
        TypeFamily::String => {
            if is_long_text(field, VARCHAR_MAX_LENGTH) {
                "TEXT"
            } else {
                return format!("VARCHAR({})", string_length(field));
            }
        }
        TypeFamily::Date => "DATE",
        TypeFamily::Time => "TIME",
        TypeFamily::DateTime => "TIMESTAMP",
        TypeFamily::ZonedDateTime => "TIMESTAMP WITH TIME ZONE",
        TypeFamily::Uuid => "UUID",
        TypeFamily::Bytes => "BYTEA",
        TypeFamily::Json => "JSONB",
    };
    sql.to_string()
}

/// `@CaseInsensitive` string columns use the citext extension type
fn case_insensitive_text(field: &Field) -> Option<String> {
    field
        .has_annotation("CaseInsensitive")
        .then(|| "CITEXT".to_string())
}

fn serial_type(column_type: &str) -> &'static str {
    match column_type.to_ascii_uppercase().as_str() {
        "SMALLINT" => "SMALLSERIAL",
        "INTEGER" | "INT" => "SERIAL",
        _ => "BIGSERIAL",
    }
}

/// PostgreSQL strategy
#[derive(Debug, Clone)]
pub struct PostgresStrategy {
    config: GeneratorConfig,
    mapper: TypeMapper,
}

impl PostgresStrategy {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_rules(config, Vec::new())
    }

    /// Build with custom type rules; they run after the built-in CITEXT rule
    pub fn with_rules(config: GeneratorConfig, rules: Vec<Arc<dyn TypeRule>>) -> Self {
        let mapper = TypeMapper::builder(Dialect::Postgresql, base_type, FALLBACK)
            .rule(case_insensitive_text)
            .rules(rules)
            .build();
        Self { config, mapper }
    }

    /// Distinct sequence names used by non-identity fields, in first-appearance order
    fn sequence_names<'a>(&self, fields: impl IntoIterator<Item = &'a Field>) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for field in fields {
            if field.auto_increment {
                continue;
            }
            if let Some(name) = field.resolved_sequence_name()? {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}

impl Default for PostgresStrategy {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl DdlStrategy for PostgresStrategy {
    fn dialect(&self) -> Dialect {
        Dialect::Postgresql
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
        let mut column_type = self.column_type(field)?;
        let identity = field.auto_increment;
        let serial = identity && self.config.postgres_identity == PostgresIdentity::Serial;
        if serial {
            column_type = serial_type(&column_type).to_string();
        }

        let mut parts = vec![
            self.quote_identifier(&field.resolved_column_name()?),
            column_type,
        ];

        if identity && !serial {
            parts.push("GENERATED BY DEFAULT AS IDENTITY".to_string());
        }
        if field.is_not_null() {
            parts.push("NOT NULL".to_string());
        }
        if !identity {
            if let Some(sequence) = field.resolved_sequence_name()? {
                parts.push(format!(
                    "DEFAULT nextval({})",
                    string_literal(&self.quote_identifier(&sequence))
                ));
            } else if let Some(default) = default_clause(field) {
                parts.push(default);
            }
        }
        if inline_primary_key {
            parts.push("PRIMARY KEY".to_string());
        }

        Ok(parts.join(" "))
    }

    fn generate_modify_column(&self, table_name: &str, field: &Field) -> Result<Vec<String>> {
        let table = self.quote_identifier(table_name);
        let column = self.quote_identifier(&field.resolved_column_name()?);

        let mut statements = vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {};",
            table,
            column,
            self.column_type(field)?
        )];

        let nullability = if field.is_not_null() {
            "SET NOT NULL"
        } else {
            "DROP NOT NULL"
        };
        statements.push(format!(
            "ALTER TABLE {} ALTER COLUMN {} {};",
            table, column, nullability
        ));

        if let Some(default) = default_clause(field) {
            statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} SET {};",
                table, column, default
            ));
        }

        Ok(statements)
    }

    fn sequence_prelude(&self, fields: &[&Field]) -> Result<Vec<String>> {
        Ok(self
            .sequence_names(fields.iter().copied())?
            .iter()
            .map(|name| {
                format!(
                    "CREATE SEQUENCE IF NOT EXISTS {} INCREMENT BY 1 START WITH 1;",
                    self.quote_identifier(name)
                )
            })
            .collect())
    }

    fn schema_statements(&self, entities: &[Entity]) -> Result<Vec<String>> {
        let fields: Vec<&Field> = entities.iter().flat_map(Entity::columns).collect();
        let mut statements = self.sequence_prelude(&fields)?;
        statements.extend(compose_schema(self, entities)?);
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Annotation, ForeignKeyInfo};

    fn strategy() -> PostgresStrategy {
        PostgresStrategy::default()
    }

    fn product() -> Entity {
        Entity::new("Product")
            .with_field(Field::new("id", "java.lang.Long").primary_key().auto_increment())
            .with_field(Field::new("name", "java.lang.String").not_null())
    }

    // ==================== Type Mapping Tests ====================

    #[test]
    fn test_type_mapping() {
        let mapper = strategy().mapper;
        assert_eq!(mapper.map_type(&Field::new("a", "Integer")), "INTEGER");
        assert_eq!(mapper.map_type(&Field::new("a", "Byte")), "SMALLINT");
        assert_eq!(mapper.map_type(&Field::new("a", "Float")), "REAL");
        assert_eq!(mapper.map_type(&Field::new("a", "Double")), "DOUBLE PRECISION");
        assert_eq!(mapper.map_type(&Field::new("a", "BigDecimal")), "NUMERIC(10, 2)");
        assert_eq!(mapper.map_type(&Field::new("a", "Boolean")), "BOOLEAN");
        assert_eq!(mapper.map_type(&Field::new("a", "LocalDateTime")), "TIMESTAMP");
        assert_eq!(mapper.map_type(&Field::new("a", "Instant")), "TIMESTAMP WITH TIME ZONE");
        assert_eq!(mapper.map_type(&Field::new("a", "java.util.UUID")), "UUID");
        assert_eq!(mapper.map_type(&Field::new("a", "byte[]")), "BYTEA");
        assert_eq!(mapper.map_type(&Field::new("a", "JsonNode")), "JSONB");
    }

    #[test]
    fn test_string_mapping() {
        let mapper = strategy().mapper;
        assert_eq!(mapper.map_type(&Field::new("a", "String")), "VARCHAR(255)");
        assert_eq!(mapper.map_type(&Field::new("a", "String").with_length(70_000)), "VARCHAR(70000)");
        assert_eq!(mapper.map_type(&Field::new("a", "String").text()), "TEXT");
        assert_eq!(
            mapper.map_type(&Field::new("a", "String").with_length(VARCHAR_MAX_LENGTH + 1)),
            "TEXT"
        );
    }

    #[test]
    fn test_case_insensitive_rule() {
        let field = Field::new("email", "String").with_annotation(Annotation::new("CaseInsensitive"));
        assert_eq!(strategy().mapper.map_type(&field), "CITEXT");
    }

    // ==================== Column Definition Tests ====================

    #[test]
    fn test_create_table_product() {
        let sql = strategy().generate_create_table(&product()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"product\" ( \"id\" BIGINT GENERATED BY DEFAULT AS IDENTITY \
             NOT NULL PRIMARY KEY, \"name\" VARCHAR(255) NOT NULL );"
        );
    }

    #[test]
    fn test_serial_identity() {
        let config = GeneratorConfig::builder()
            .postgres_identity(PostgresIdentity::Serial)
            .build();
        let s = PostgresStrategy::new(config);

        let id = Field::new("id", "Long").primary_key().auto_increment();
        assert_eq!(s.column_definition(&id, true).unwrap(), "\"id\" BIGSERIAL NOT NULL PRIMARY KEY");

        let small = Field::new("n", "Integer").auto_increment();
        assert_eq!(s.column_definition(&small, false).unwrap(), "\"n\" SERIAL");
    }

    #[test]
    fn test_sequence_default() {
        let field = Field::new("id", "Long").primary_key().with_sequence(None);
        assert_eq!(
            strategy().column_definition(&field, true).unwrap(),
            "\"id\" BIGINT NOT NULL DEFAULT nextval('\"id_seq\"') PRIMARY KEY"
        );
    }

    #[test]
    fn test_sequence_default_keeps_case() {
        let field = Field::new("id", "Long").with_sequence(Some("Invoice_Seq"));
        let s = strategy();

        assert_eq!(
            s.column_definition(&field, false).unwrap(),
            "\"id\" BIGINT DEFAULT nextval('\"Invoice_Seq\"')"
        );
        assert_eq!(
            s.sequence_prelude(&[&field]).unwrap(),
            vec!["CREATE SEQUENCE IF NOT EXISTS \"Invoice_Seq\" INCREMENT BY 1 START WITH 1;"]
        );

        let quoted = Field::new("code", "Long").with_sequence(Some("o'brien_seq"));
        assert_eq!(
            s.column_definition(&quoted, false).unwrap(),
            "\"code\" BIGINT DEFAULT nextval('\"o''brien_seq\"')"
        );
    }

    #[test]
    fn test_sequence_prelude_skips_identity_and_duplicates() {
        let a = Field::new("a", "Long").with_sequence(Some("shared_seq"));
        let b = Field::new("b", "Long").with_sequence(Some("shared_seq"));
        let identity = Field::new("id", "Long").auto_increment().with_sequence(None);
        let plain = Field::new("name", "String");

        assert_eq!(
            strategy().sequence_prelude(&[&identity, &a, &plain, &b]).unwrap(),
            vec!["CREATE SEQUENCE IF NOT EXISTS \"shared_seq\" INCREMENT BY 1 START WITH 1;"]
        );
    }

    #[test]
    fn test_plain_default() {
        let field = Field::new("active", "Boolean").not_null().with_default("TRUE");
        assert_eq!(
            strategy().column_definition(&field, false).unwrap(),
            "\"active\" BOOLEAN NOT NULL DEFAULT TRUE"
        );
    }

    // ==================== Alter Table Tests ====================

    #[test]
    fn test_modify_column_three_statements() {
        let field = Field::new("status", "String").with_length(20).not_null().with_default("'new'");
        let statements = strategy().generate_modify_column("orders", &field).unwrap();

        assert_eq!(
            statements,
            vec![
                "ALTER TABLE \"orders\" ALTER COLUMN \"status\" TYPE VARCHAR(20);",
                "ALTER TABLE \"orders\" ALTER COLUMN \"status\" SET NOT NULL;",
                "ALTER TABLE \"orders\" ALTER COLUMN \"status\" SET DEFAULT 'new';",
            ]
        );
    }

    #[test]
    fn test_modify_column_nullable_without_default() {
        let field = Field::new("note", "String").text();
        let statements = strategy().generate_modify_column("orders", &field).unwrap();

        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1], "ALTER TABLE \"orders\" ALTER COLUMN \"note\" DROP NOT NULL;");
    }

    #[test]
    fn test_comments() {
        let entity = Entity::new("Customer")
            .with_comment("People who buy")
            .with_field(Field::new("name", "String").with_comment("Full name, e.g. O'Neil"));

        let statements = strategy().generate_add_comment(&entity).unwrap();
        assert_eq!(
            statements,
            vec![
                "COMMENT ON TABLE \"customer\" IS 'People who buy';",
                "COMMENT ON COLUMN \"customer\".\"name\" IS 'Full name, e.g. O''Neil';",
            ]
        );
    }

    // ==================== Schema Tests ====================

    #[test]
    fn test_schema_with_sequences_first() {
        let invoice = Entity::new("Invoice")
            .with_comment("Invoices")
            .with_field(Field::new("id", "Long").primary_key().with_sequence(Some("invoice_seq")))
            .with_field(Field::new("customerId", "Long"))
            .with_foreign_key(ForeignKeyInfo::new("customer_id", "customer", "id").named("fk_invoice_customer"));
        let line = Entity::new("InvoiceLine")
            .with_field(Field::new("id", "Long").primary_key().with_sequence(Some("invoice_seq")));

        let schema = strategy().generate_schema(&[invoice, line]).unwrap();
        let statements: Vec<&str> = schema.split("\n\n").collect();

        assert_eq!(
            statements,
            vec![
                "CREATE SEQUENCE IF NOT EXISTS \"invoice_seq\" INCREMENT BY 1 START WITH 1;",
                "CREATE TABLE IF NOT EXISTS \"invoice\" ( \"id\" BIGINT NOT NULL DEFAULT nextval('\"invoice_seq\"') \
                 PRIMARY KEY, \"customer_id\" BIGINT );",
                "CREATE TABLE IF NOT EXISTS \"invoice_line\" ( \"id\" BIGINT NOT NULL DEFAULT nextval('\"invoice_seq\"') \
                 PRIMARY KEY );",
                "ALTER TABLE \"invoice\" ADD CONSTRAINT \"fk_invoice_customer\" FOREIGN KEY (\"customer_id\") \
                 REFERENCES \"customer\" (\"id\");",
                "COMMENT ON TABLE \"invoice\" IS 'Invoices';",
            ]
        );
    }

    #[test]
    fn test_schema_without_sequences() {
        let schema = strategy().generate_schema(&[product()]).unwrap();
        assert!(schema.starts_with("CREATE TABLE IF NOT EXISTS \"product\""));
        assert!(!schema.contains("CREATE SEQUENCE"));
    }
}
