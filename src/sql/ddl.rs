//! DDL Generation
//!
//! [`DdlGenerator`] pairs a dialect strategy with the dependency resolver.
//! It produces whole-schema documents in FK-safe order and turns a
//! [`SchemaComparison`] into migration DDL.

use std::sync::Arc;

use tracing::debug;

use crate::error::{DdlError, Result};
use crate::factory::StrategyFactory;
use crate::resolver::DependencyResolver;
use crate::schema::{SchemaComparison, TableContext};
use crate::sql::dialect::DdlStrategy;
use crate::types::{
    Entity, Field, ForeignKeyInfo, IndexDefinition, ManyToManyTable, names_match,
    with_junction_entities,
};

/// DDL generator for one dialect
#[derive(Clone)]
pub struct DdlGenerator {
    strategy: Arc<dyn DdlStrategy>,
    resolver: DependencyResolver,
}

impl DdlGenerator {
    /// Create a new DDL generator around a resolved strategy
    pub fn new(strategy: Arc<dyn DdlStrategy>) -> Self {
        Self {
            strategy,
            resolver: DependencyResolver::new(),
        }
    }

    /// Resolve `dialect` through the factory
    pub fn for_dialect(factory: &StrategyFactory, dialect: &str) -> Result<Self> {
        Ok(Self::new(factory.resolve(dialect)?))
    }

    pub fn strategy(&self) -> &Arc<dyn DdlStrategy> {
        &self.strategy
    }

    pub fn generate_create_table(&self, entity: &Entity) -> Result<String> {
        self.strategy.generate_create_table(entity)
    }

    pub fn generate_drop_table(&self, table_name: &str) -> String {
        self.strategy.generate_drop_table(table_name)
    }

    pub fn generate_add_column(&self, table_name: &str, field: &Field) -> Result<String> {
        self.strategy.generate_add_column(table_name, field)
    }

    pub fn generate_drop_column(&self, table_name: &str, column_name: &str) -> String {
        self.strategy.generate_drop_column(table_name, column_name)
    }

    pub fn generate_modify_column(&self, table_name: &str, field: &Field) -> Result<Vec<String>> {
        self.strategy.generate_modify_column(table_name, field)
    }

    pub fn generate_add_foreign_key(&self, table_name: &str, fk: &ForeignKeyInfo) -> Result<String> {
        self.strategy.generate_add_foreign_key(table_name, fk)
    }

    pub fn generate_add_comment(&self, entity: &Entity) -> Result<Vec<String>> {
        self.strategy.generate_add_comment(entity)
    }

    pub fn generate_create_index(&self, table_name: &str, index: &IndexDefinition) -> Result<String> {
        self.strategy.generate_create_index(table_name, index)
    }

    pub fn generate_many_to_many_table(&self, table: &ManyToManyTable) -> Result<String> {
        self.strategy.generate_many_to_many_table(table)
    }

    pub fn generate_many_to_many_foreign_keys(&self, table: &ManyToManyTable) -> Result<Vec<String>> {
        self.strategy.generate_many_to_many_foreign_keys(table)
    }

    /// CREATE INDEX statements for every index `entity` declares
    pub fn generate_indexes(&self, entity: &Entity) -> Result<Vec<String>> {
        let table = entity.table_name();
        entity
            .index_definitions()?
            .iter()
            .map(|index| self.strategy.generate_create_index(&table, index))
            .collect()
    }

    /// Schema document with tables created before the tables referencing them
    pub fn create_schema(&self, context: &TableContext) -> Result<String> {
        let ordered = self.ordered_entities(context)?;
        self.strategy.generate_schema(&ordered)
    }

    /// DROP TABLE statements in reverse dependency order
    pub fn drop_schema(&self, context: &TableContext) -> Result<String> {
        let statements: Vec<String> = self
            .resolver
            .resolve_deletion_order(context)?
            .into_iter()
            .map(|entity| self.strategy.generate_drop_table(&entity.table_name()))
            .collect();
        Ok(statements.join("\n\n"))
    }

    /// Statements that bring a live schema in line with `entities`
    ///
    /// New tables come first (dependency ordered, with their foreign keys and
    /// comments), then the sequences added columns draw from, then column
    /// additions and type changes per modified table. Column and table drops
    /// are emitted only when `allow_drop` is set. Junction tables declared by
    /// many-to-many fields count as tables of their own.
    pub fn migration_statements(
        &self,
        comparison: &SchemaComparison,
        entities: &[Entity],
    ) -> Result<Vec<String>> {
        let allow_drop = self.strategy.config().allow_drop;
        let entities = with_junction_entities(entities)?;
        let mut statements = Vec::new();

        if !comparison.new_tables.is_empty() {
            let new_entities = comparison
                .new_tables
                .iter()
                .map(|table| self.find_entity(&entities, table).cloned())
                .collect::<Result<Vec<_>>>()?;
            let ordered = self.ordered_entities(&TableContext::new(new_entities))?;
            statements.extend(self.strategy.schema_statements(&ordered)?);
        }

        let mut modified = Vec::with_capacity(comparison.modified_tables.len());
        let mut added_fields: Vec<&Field> = Vec::new();
        for (table, modification) in &comparison.modified_tables {
            let entity = self.find_entity(&entities, table)?;
            let added = modification
                .added_columns
                .iter()
                .map(|column| self.find_field(entity, column))
                .collect::<Result<Vec<_>>>()?;
            added_fields.extend(added.iter().copied());
            modified.push((entity, modification, added));
        }

        for statement in self.strategy.sequence_prelude(&added_fields)? {
            if !statements.contains(&statement) {
                statements.push(statement);
            }
        }

        for (entity, modification, added) in modified {
            let table_name = entity.table_name();

            for field in added {
                statements.push(self.strategy.generate_add_column(&table_name, field)?);
            }
            for change in &modification.modified_columns {
                let field = self.find_field(entity, &change.column)?;
                statements.extend(self.strategy.generate_modify_column(&table_name, field)?);
            }
            if allow_drop {
                for column in &modification.dropped_columns {
                    statements.push(self.strategy.generate_drop_column(&table_name, column));
                }
            }
        }

        if allow_drop {
            for table in &comparison.dropped_tables {
                statements.push(self.strategy.generate_drop_table(table));
            }
        }

        debug!(
            dialect = %self.strategy.dialect(),
            statements = statements.len(),
            "Generated migration DDL"
        );
        Ok(statements)
    }

    /// [`migration_statements`](Self::migration_statements) as one document
    pub fn migration_script(
        &self,
        comparison: &SchemaComparison,
        entities: &[Entity],
    ) -> Result<String> {
        Ok(self.migration_statements(comparison, entities)?.join("\n\n"))
    }

    fn ordered_entities(&self, context: &TableContext) -> Result<Vec<Entity>> {
        Ok(self
            .resolver
            .resolve_creation_order(context)?
            .into_iter()
            .cloned()
            .collect())
    }

    fn find_entity<'a>(&self, entities: &'a [Entity], table: &str) -> Result<&'a Entity> {
        let ignore_case = self.strategy.config().ignore_case;
        entities
            .iter()
            .find(|e| names_match(&e.table_name(), table, ignore_case))
            .ok_or_else(|| DdlError::validation(format!("No entity maps to table '{}'", table)))
    }

    fn find_field<'a>(&self, entity: &'a Entity, column: &str) -> Result<&'a Field> {
        entity
            .field_by_column(column, self.strategy.config().ignore_case)?
            .ok_or_else(|| {
                DdlError::validation(format!(
                    "No field maps to column '{}' in table '{}'",
                    column,
                    entity.table_name()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::schema::{ColumnTypeChange, TableModification};
    use crate::types::{Annotation, Dialect};

    // ==================== Test Helpers ====================

    fn generator(dialect: &str) -> DdlGenerator {
        DdlGenerator::for_dialect(&StrategyFactory::default(), dialect).unwrap()
    }

    fn dropping_generator(dialect: &str) -> DdlGenerator {
        let factory = StrategyFactory::new(GeneratorConfig::builder().allow_drop(true).build());
        DdlGenerator::for_dialect(&factory, dialect).unwrap()
    }

    fn customer() -> Entity {
        Entity::new("Customer")
            .with_comment("Customers")
            .with_field(Field::new("id", "Long").primary_key().auto_increment())
            .with_field(Field::new("name", "String").not_null())
            .with_field(Field::new("phone", "String").with_length(32))
    }

    fn order() -> Entity {
        Entity::new("Orders")
            .with_field(Field::new("id", "Long").primary_key().auto_increment())
            .with_field(Field::new("customerId", "Long").not_null())
            .with_foreign_key(ForeignKeyInfo::new("customer_id", "customer", "id"))
    }

    // ==================== Schema Tests ====================

    #[test]
    fn test_create_schema_orders_tables() {
        let context = TableContext::new(vec![order(), customer()]);
        let ddl = generator("postgresql").create_schema(&context).unwrap();

        let statements: Vec<&str> = ddl.split("\n\n").collect();
        assert_eq!(
            statements,
            vec![
                "CREATE TABLE IF NOT EXISTS \"customer\" ( \"id\" BIGINT GENERATED BY DEFAULT AS IDENTITY NOT NULL PRIMARY KEY, \"name\" VARCHAR(255) NOT NULL, \"phone\" VARCHAR(32) );",
                "CREATE TABLE IF NOT EXISTS \"orders\" ( \"id\" BIGINT GENERATED BY DEFAULT AS IDENTITY NOT NULL PRIMARY KEY, \"customer_id\" BIGINT NOT NULL );",
                "COMMENT ON TABLE \"customer\" IS 'Customers';",
                "ALTER TABLE \"orders\" ADD CONSTRAINT \"fk_orders_customer_id\" FOREIGN KEY (\"customer_id\") REFERENCES \"customer\" (\"id\");",
            ]
        );
    }

    #[test]
    fn test_create_schema_cycle_fails() {
        let a = Entity::new("A").with_foreign_key(ForeignKeyInfo::new("b_id", "b", "id"));
        let b = Entity::new("B").with_foreign_key(ForeignKeyInfo::new("a_id", "a", "id"));

        let err = generator("mysql")
            .create_schema(&TableContext::new(vec![a, b]))
            .unwrap_err();
        assert!(matches!(err, DdlError::CircularDependency { .. }));
    }

    #[test]
    fn test_drop_schema_reverse_order() {
        let context = TableContext::new(vec![customer(), order()]);
        let ddl = generator("mysql").drop_schema(&context).unwrap();

        assert_eq!(
            ddl,
            "DROP TABLE IF EXISTS `orders`;\n\nDROP TABLE IF EXISTS `customer`;"
        );
    }

    #[test]
    fn test_unknown_dialect() {
        let result = DdlGenerator::for_dialect(&StrategyFactory::default(), "informix");
        assert!(matches!(result, Err(DdlError::UnsupportedDialect(_))));
    }

    #[test]
    fn test_pass_through_operations() {
        let g = generator("oracle");
        assert_eq!(g.strategy().dialect(), Dialect::Oracle);
        assert_eq!(g.generate_drop_table("customer"), "DROP TABLE IF EXISTS \"CUSTOMER\";");
        assert_eq!(
            g.generate_drop_column("customer", "phone"),
            "ALTER TABLE \"CUSTOMER\" DROP COLUMN \"PHONE\";"
        );
        assert_eq!(
            g.generate_add_comment(&customer()).unwrap(),
            vec!["COMMENT ON TABLE \"CUSTOMER\" IS 'Customers';"]
        );
    }

    // ==================== Migration Tests ====================

    fn customer_changes() -> SchemaComparison {
        let mut comparison = SchemaComparison {
            new_tables: vec!["orders".to_string()],
            dropped_tables: vec!["legacy_audit".to_string()],
            ..Default::default()
        };
        comparison.modified_tables.insert(
            "customer".to_string(),
            TableModification {
                added_columns: vec!["phone".to_string()],
                modified_columns: vec![ColumnTypeChange {
                    column: "name".to_string(),
                    old_type: "varchar(100)".to_string(),
                    new_type: "VARCHAR(255)".to_string(),
                }],
                dropped_columns: vec!["legacy_code".to_string()],
            },
        );
        comparison
    }

    #[test]
    fn test_migration_without_drops() {
        let statements = generator("mysql")
            .migration_statements(&customer_changes(), &[customer(), order()])
            .unwrap();

        assert_eq!(
            statements,
            vec![
                "CREATE TABLE IF NOT EXISTS `orders` ( `id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, `customer_id` BIGINT NOT NULL ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;",
                "ALTER TABLE `orders` ADD CONSTRAINT `fk_orders_customer_id` FOREIGN KEY (`customer_id`) REFERENCES `customer` (`id`);",
                "ALTER TABLE `customer` ADD COLUMN `phone` VARCHAR(32);",
                "ALTER TABLE `customer` MODIFY COLUMN `name` VARCHAR(255) NOT NULL;",
            ]
        );
    }

    #[test]
    fn test_migration_with_drops() {
        let statements = dropping_generator("mysql")
            .migration_statements(&customer_changes(), &[customer(), order()])
            .unwrap();

        assert_eq!(statements.len(), 6);
        assert_eq!(statements[4], "ALTER TABLE `customer` DROP COLUMN `legacy_code`;");
        assert_eq!(statements[5], "DROP TABLE IF EXISTS `legacy_audit`;");
    }

    #[test]
    fn test_migration_postgres_modify_splits() {
        let mut comparison = SchemaComparison::default();
        comparison.modified_tables.insert(
            "customer".to_string(),
            TableModification {
                modified_columns: vec![ColumnTypeChange {
                    column: "name".to_string(),
                    old_type: "text".to_string(),
                    new_type: "VARCHAR(255)".to_string(),
                }],
                ..Default::default()
            },
        );

        let script = generator("postgresql")
            .migration_script(&comparison, &[customer()])
            .unwrap();
        assert!(script.starts_with("ALTER TABLE \"customer\" ALTER COLUMN \"name\" TYPE VARCHAR(255);"));
        assert!(script.contains("ALTER TABLE \"customer\" ALTER COLUMN \"name\" SET NOT NULL;"));
    }

    #[test]
    fn test_migration_new_tables_in_dependency_order() {
        let comparison = SchemaComparison {
            new_tables: vec!["orders".to_string(), "customer".to_string()],
            ..Default::default()
        };

        let statements = generator("h2")
            .migration_statements(&comparison, &[order(), customer()])
            .unwrap();

        assert!(statements[0].contains("\"customer\""));
        assert!(statements[1].contains("\"orders\""));
    }

    #[test]
    fn test_migration_creates_sequence_for_added_column() {
        let mut comparison = SchemaComparison::default();
        comparison.modified_tables.insert(
            "customer".to_string(),
            TableModification {
                added_columns: vec!["code".to_string()],
                ..Default::default()
            },
        );
        let evolved = customer().with_field(Field::new("code", "Long").with_sequence(Some("customer_code_seq")));

        let statements = generator("postgresql")
            .migration_statements(&comparison, &[evolved])
            .unwrap();

        assert_eq!(
            statements,
            vec![
                "CREATE SEQUENCE IF NOT EXISTS \"customer_code_seq\" INCREMENT BY 1 START WITH 1;",
                "ALTER TABLE \"customer\" ADD COLUMN \"code\" BIGINT DEFAULT nextval('\"customer_code_seq\"');",
            ]
        );
    }

    #[test]
    fn test_migration_sequence_not_repeated_after_new_tables() {
        let mut comparison = SchemaComparison {
            new_tables: vec!["invoice".to_string()],
            ..Default::default()
        };
        comparison.modified_tables.insert(
            "customer".to_string(),
            TableModification {
                added_columns: vec!["code".to_string()],
                ..Default::default()
            },
        );
        let invoice = Entity::new("Invoice")
            .with_field(Field::new("id", "Long").primary_key().with_sequence(Some("shared_seq")));
        let evolved = customer().with_field(Field::new("code", "Long").with_sequence(Some("shared_seq")));

        let statements = generator("postgresql")
            .migration_statements(&comparison, &[evolved, invoice])
            .unwrap();

        let sequences = statements.iter().filter(|s| s.starts_with("CREATE SEQUENCE")).count();
        assert_eq!(sequences, 1);
        assert!(statements[0].starts_with("CREATE SEQUENCE IF NOT EXISTS \"shared_seq\""));
        assert!(statements.last().unwrap().starts_with("ALTER TABLE \"customer\" ADD COLUMN \"code\""));
    }

    #[test]
    fn test_migration_creates_new_junction_table() {
        let role = Entity::new("Role").with_field(Field::new("id", "Long").primary_key());
        let user = Entity::new("User")
            .with_field(Field::new("id", "Long").primary_key())
            .with_field(Field::new("roles", "List<Role>").with_annotation(Annotation::new("ManyToMany")));
        let comparison = SchemaComparison {
            new_tables: vec!["user_role_mapping".to_string()],
            ..Default::default()
        };

        let statements = generator("mysql")
            .migration_statements(&comparison, &[user, role])
            .unwrap();

        assert_eq!(
            statements,
            vec![
                "CREATE TABLE IF NOT EXISTS `user_role_mapping` ( `user_id` BIGINT NOT NULL, `role_id` BIGINT NOT NULL, PRIMARY KEY (`user_id`, `role_id`) ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;",
                "ALTER TABLE `user_role_mapping` ADD CONSTRAINT `fk_user_role_mapping_user_id` FOREIGN KEY (`user_id`) REFERENCES `user` (`id`);",
                "ALTER TABLE `user_role_mapping` ADD CONSTRAINT `fk_user_role_mapping_role_id` FOREIGN KEY (`role_id`) REFERENCES `role` (`id`);",
            ]
        );
    }

    #[test]
    fn test_indexes_pass_through() {
        let user = Entity::new("User")
            .with_field(Field::new("id", "Long").primary_key())
            .with_field(Field::new("email", "String").with_annotation(Annotation::new("Key")));

        assert_eq!(
            generator("postgresql").generate_indexes(&user).unwrap(),
            vec!["CREATE UNIQUE INDEX \"uk_user_email\" ON \"user\" (\"email\");"]
        );
    }

    #[test]
    fn test_migration_empty_comparison() {
        let statements = generator("dm")
            .migration_statements(&SchemaComparison::default(), &[customer()])
            .unwrap();
        assert!(statements.is_empty());
    }

    #[test]
    fn test_migration_unknown_table_fails() {
        let comparison = SchemaComparison {
            new_tables: vec!["invoice".to_string()],
            ..Default::default()
        };
        let err = generator("mysql")
            .migration_statements(&comparison, &[customer()])
            .unwrap_err();
        assert!(matches!(err, DdlError::Validation(ref msg) if msg.contains("invoice")));
    }

    #[test]
    fn test_migration_unknown_column_fails() {
        let mut comparison = SchemaComparison::default();
        comparison.modified_tables.insert(
            "customer".to_string(),
            TableModification {
                added_columns: vec!["fax".to_string()],
                ..Default::default()
            },
        );
        let err = generator("mysql")
            .migration_statements(&comparison, &[customer()])
            .unwrap_err();
        assert!(matches!(err, DdlError::Validation(ref msg) if msg.contains("fax")));
    }
}
