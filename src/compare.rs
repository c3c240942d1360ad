//! Schema comparison
//!
//! Diffs the tables implied by entity metadata against a catalog snapshot.
//! Column types are compared after [`normalize_type`], so spelling differences
//! between generated DDL and what a catalog reports (`VARCHAR(255)` versus
//! `character varying(255)`) do not count as changes.
//!
//! Nullability and default-value drift are not diffed.

use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::catalog;
use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::schema::{
    ColumnTypeChange, DatabaseColumnInfo, DatabaseTableInfo, SchemaComparison, TableModification,
};
use crate::sql::dialect::DdlStrategy;
use crate::types::{Entity, names_match, with_junction_entities};

static PUNCTUATION_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[(,]\s*|\s+\)").expect("valid regex"));

static INTEGER_DISPLAY_WIDTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(TINYINT|SMALLINT|MEDIUMINT|INT|INTEGER|BIGINT)\(\d+\)").expect("valid regex")
});

/// Canonical spelling of a column type for comparison
///
/// ```
/// use entity_ddl::compare::normalize_type;
///
/// assert_eq!(normalize_type("character varying(255)"), "VARCHAR(255)");
/// assert_eq!(normalize_type("DECIMAL(10, 2)"), normalize_type("numeric(10,2)"));
/// assert_eq!(normalize_type("bigint(20)"), "BIGINT");
/// ```
pub fn normalize_type(type_name: &str) -> String {
    let collapsed = type_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    let compact = PUNCTUATION_SPACING
        .replace_all(&collapsed, |caps: &Captures| caps[0].trim().to_string())
        .replace(" WITHOUT TIME ZONE", "");

    // TINYINT(1) is MySQL's boolean, not a display width
    let stripped = if compact.starts_with("TINYINT(1)") {
        compact
    } else {
        INTEGER_DISPLAY_WIDTH.replace(&compact, "$1").into_owned()
    };

    let (base, rest) = match stripped.find('(') {
        Some(index) => stripped.split_at(index),
        None => (stripped.as_str(), ""),
    };
    let base = match base {
        "CHARACTER VARYING" => "VARCHAR",
        "CHARACTER" => "CHAR",
        "INT" | "INT4" | "SERIAL" | "SERIAL4" => "INTEGER",
        "INT8" | "BIGSERIAL" | "SERIAL8" => "BIGINT",
        "INT2" | "SMALLSERIAL" | "SERIAL2" => "SMALLINT",
        "FLOAT4" => "REAL",
        "FLOAT8" => "DOUBLE PRECISION",
        "BOOL" => "BOOLEAN",
        "TIMESTAMPTZ" => "TIMESTAMP WITH TIME ZONE",
        "TIMETZ" => "TIME WITH TIME ZONE",
        "DECIMAL" => "NUMERIC",
        other => other,
    };
    format!("{}{}", base, rest)
}

/// Diffs entity metadata against live or snapshot catalogs for one dialect
pub struct SchemaComparator {
    strategy: Arc<dyn DdlStrategy>,
    ignore_case: bool,
}

impl SchemaComparator {
    /// Name matching follows the strategy's `ignore_case` setting
    pub fn new(strategy: Arc<dyn DdlStrategy>) -> Self {
        let ignore_case = strategy.config().ignore_case;
        Self {
            strategy,
            ignore_case,
        }
    }

    pub fn strategy(&self) -> &Arc<dyn DdlStrategy> {
        &self.strategy
    }

    /// Tables the generated DDL would create
    ///
    /// Entities in order, followed by the junction tables they declare.
    pub fn expected_schema(&self, entities: &[Entity]) -> Result<Vec<DatabaseTableInfo>> {
        with_junction_entities(entities)?
            .iter()
            .map(|entity| self.strategy.expected_table(entity))
            .collect()
    }

    /// Diff entities against an already introspected catalog
    pub fn compare(
        &self,
        entities: &[Entity],
        db_tables: &[DatabaseTableInfo],
    ) -> Result<SchemaComparison> {
        let expected = self.expected_schema(entities)?;
        Ok(self.diff(&expected, db_tables))
    }

    /// Introspect the database behind `connection`, then diff
    pub async fn compare_live(
        &self,
        entities: &[Entity],
        connection: &ConnectionConfig,
    ) -> Result<SchemaComparison> {
        let db_tables = catalog::introspect(connection).await?;
        let comparison = self.compare(entities, &db_tables)?;

        info!(
            dialect = %connection.dialect,
            new_tables = comparison.new_tables.len(),
            dropped_tables = comparison.dropped_tables.len(),
            modified_tables = comparison.modified_tables.len(),
            "Compared entities against live schema"
        );
        Ok(comparison)
    }

    /// Diff two catalog snapshots; `expected` is the desired state
    pub fn diff(
        &self,
        expected: &[DatabaseTableInfo],
        actual: &[DatabaseTableInfo],
    ) -> SchemaComparison {
        let mut comparison = SchemaComparison::default();

        for table in expected {
            match self.find_table(actual, &table.name) {
                None => {
                    if !comparison.new_tables.contains(&table.name) {
                        comparison.new_tables.push(table.name.clone());
                    }
                }
                Some(live) => {
                    let modification = self.diff_table(table, live);
                    if !modification.is_empty() {
                        debug!(table = %table.name, ?modification, "Table differs from live schema");
                        comparison
                            .modified_tables
                            .insert(table.name.clone(), modification);
                    }
                }
            }
        }

        for table in actual {
            if self.find_table(expected, &table.name).is_none() {
                comparison.dropped_tables.push(table.name.clone());
            }
        }

        comparison
    }

    fn diff_table(&self, expected: &DatabaseTableInfo, live: &DatabaseTableInfo) -> TableModification {
        let mut modification = TableModification::default();

        for column in &expected.columns {
            match self.find_column(&live.columns, &column.name) {
                None => modification.added_columns.push(column.name.clone()),
                Some(live_column) => {
                    if normalize_type(&column.type_name) != normalize_type(&live_column.type_name) {
                        modification.modified_columns.push(ColumnTypeChange {
                            column: column.name.clone(),
                            old_type: live_column.type_name.clone(),
                            new_type: column.type_name.clone(),
                        });
                    }
                }
            }
        }

        for column in &live.columns {
            if self.find_column(&expected.columns, &column.name).is_none() {
                modification.dropped_columns.push(column.name.clone());
            }
        }

        modification
    }

    fn find_table<'a>(
        &self,
        tables: &'a [DatabaseTableInfo],
        name: &str,
    ) -> Option<&'a DatabaseTableInfo> {
        tables
            .iter()
            .find(|t| names_match(&t.name, name, self.ignore_case))
    }

    fn find_column<'a>(
        &self,
        columns: &'a [DatabaseColumnInfo],
        name: &str,
    ) -> Option<&'a DatabaseColumnInfo> {
        columns
            .iter()
            .find(|c| names_match(&c.name, name, self.ignore_case))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::sql::DdlGenerator;
    use crate::sql::dialect::{MySqlStrategy, PostgresStrategy, TdengineStrategy};
    use crate::types::{Annotation, Field, ForeignKeyInfo};

    fn postgres() -> SchemaComparator {
        SchemaComparator::new(Arc::new(PostgresStrategy::default()))
    }

    fn customer() -> Entity {
        Entity::new("Customer")
            .with_field(Field::new("id", "Long").primary_key().auto_increment())
            .with_field(Field::new("name", "String").not_null())
            .with_field(Field::new("phone", "String").with_length(32))
    }

    fn order() -> Entity {
        Entity::new("Order")
            .with_field(Field::new("id", "Long").primary_key())
            .with_field(Field::new("customerId", "Long"))
            .with_field(Field::new("total", "BigDecimal").with_precision(12, 2))
            .with_foreign_key(ForeignKeyInfo::new("customer_id", "customer", "id"))
    }

    // ==================== normalize_type Tests ====================

    #[test]
    fn test_normalize_postgres_spellings() {
        assert_eq!(normalize_type("character varying(255)"), "VARCHAR(255)");
        assert_eq!(normalize_type("character(1)"), "CHAR(1)");
        assert_eq!(normalize_type("timestamp without time zone"), "TIMESTAMP");
        assert_eq!(normalize_type("timestamp(3) without time zone"), "TIMESTAMP(3)");
        assert_eq!(normalize_type("timestamptz"), "TIMESTAMP WITH TIME ZONE");
        assert_eq!(normalize_type("int4"), "INTEGER");
        assert_eq!(normalize_type("int8"), "BIGINT");
        assert_eq!(normalize_type("float8"), "DOUBLE PRECISION");
        assert_eq!(normalize_type("bool"), "BOOLEAN");
        assert_eq!(normalize_type("bigserial"), "BIGINT");
        assert_eq!(normalize_type("time without time zone"), "TIME");
    }

    #[test]
    fn test_normalize_spacing_and_case() {
        assert_eq!(normalize_type("  numeric( 10 ,  2 ) "), "NUMERIC(10,2)");
        assert_eq!(normalize_type("DECIMAL(10, 2)"), "NUMERIC(10,2)");
        assert_eq!(normalize_type("double   precision"), "DOUBLE PRECISION");
        assert_eq!(
            normalize_type("timestamp(6) with time zone"),
            "TIMESTAMP(6) WITH TIME ZONE"
        );
    }

    #[test]
    fn test_normalize_mysql_display_width() {
        assert_eq!(normalize_type("bigint(20)"), "BIGINT");
        assert_eq!(normalize_type("int(11)"), "INTEGER");
        assert_eq!(normalize_type("int(10) unsigned"), "INT UNSIGNED");
        assert_eq!(normalize_type("tinyint(1)"), "TINYINT(1)");
        assert_eq!(normalize_type("tinyint(4)"), "TINYINT");
        assert_eq!(normalize_type("varchar(64)"), "VARCHAR(64)");
    }

    // ==================== Comparison Tests ====================

    #[test]
    fn test_compare_against_own_schema_is_empty() {
        let comparator = postgres();
        let entities = vec![customer(), order()];
        let db = comparator.expected_schema(&entities).unwrap();

        let comparison = comparator.compare(&entities, &db).unwrap();
        assert!(comparison.is_empty(), "{comparison:?}");
    }

    #[test]
    fn test_compare_against_empty_database() {
        let entities = vec![customer(), order()];
        let comparison = postgres().compare(&entities, &[]).unwrap();

        assert_eq!(comparison.new_tables, vec!["customer", "order"]);
        assert!(comparison.dropped_tables.is_empty());
        assert!(comparison.modified_tables.is_empty());
    }

    #[test]
    fn test_customer_added_and_dropped_columns() {
        let db = vec![
            DatabaseTableInfo::new("customer")
                .with_column(DatabaseColumnInfo::new("id", "bigint").not_null())
                .with_column(DatabaseColumnInfo::new("name", "character varying(255)").not_null())
                .with_column(DatabaseColumnInfo::new("legacy_code", "character varying(16)")),
        ];

        let comparison = postgres().compare(&[customer()], &db).unwrap();

        assert!(comparison.new_tables.is_empty());
        assert!(comparison.dropped_tables.is_empty());
        let modification = &comparison.modified_tables["customer"];
        assert_eq!(modification.added_columns, vec!["phone"]);
        assert_eq!(modification.dropped_columns, vec!["legacy_code"]);
        assert!(modification.modified_columns.is_empty());
    }

    #[test]
    fn test_type_mismatch_reported() {
        let db = vec![
            DatabaseTableInfo::new("customer")
                .with_column(DatabaseColumnInfo::new("id", "integer"))
                .with_column(DatabaseColumnInfo::new("name", "text"))
                .with_column(DatabaseColumnInfo::new("phone", "character varying(32)")),
        ];

        let comparison = postgres().compare(&[customer()], &db).unwrap();
        let modification = &comparison.modified_tables["customer"];

        assert_eq!(
            modification.modified_columns,
            vec![
                ColumnTypeChange {
                    column: "id".to_string(),
                    old_type: "integer".to_string(),
                    new_type: "BIGINT".to_string(),
                },
                ColumnTypeChange {
                    column: "name".to_string(),
                    old_type: "text".to_string(),
                    new_type: "VARCHAR(255)".to_string(),
                },
            ]
        );
        assert!(modification.added_columns.is_empty());
    }

    #[test]
    fn test_nullability_and_default_drift_ignored() {
        let db = vec![
            DatabaseTableInfo::new("customer")
                .with_column(DatabaseColumnInfo::new("id", "bigint"))
                .with_column(DatabaseColumnInfo {
                    default_value: Some("'anon'::character varying".to_string()),
                    ..DatabaseColumnInfo::new("name", "varchar(255)")
                })
                .with_column(DatabaseColumnInfo::new("phone", "varchar(32)").not_null()),
        ];

        assert!(postgres().compare(&[customer()], &db).unwrap().is_empty());
    }

    #[test]
    fn test_dropped_tables_follow_catalog_order() {
        let db = vec![
            DatabaseTableInfo::new("zeta"),
            DatabaseTableInfo::new("alpha"),
        ];
        let comparison = postgres().compare(&[], &db).unwrap();
        assert_eq!(comparison.dropped_tables, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_case_insensitive_names() {
        let db = vec![
            DatabaseTableInfo::new("CUSTOMER")
                .with_column(DatabaseColumnInfo::new("ID", "BIGINT"))
                .with_column(DatabaseColumnInfo::new("NAME", "VARCHAR(255)"))
                .with_column(DatabaseColumnInfo::new("PHONE", "VARCHAR(32)")),
        ];

        assert!(postgres().compare(&[customer()], &db).unwrap().is_empty());

        let strict = SchemaComparator::new(Arc::new(PostgresStrategy::new(
            GeneratorConfig::builder().ignore_case(false).build(),
        )));
        let comparison = strict.compare(&[customer()], &db).unwrap();
        assert_eq!(comparison.new_tables, vec!["customer"]);
        assert_eq!(comparison.dropped_tables, vec!["CUSTOMER"]);
    }

    #[test]
    fn test_mysql_catalog_spellings() {
        let comparator = SchemaComparator::new(Arc::new(MySqlStrategy::default()));
        let entity = Entity::new("Flag")
            .with_field(Field::new("id", "Long").primary_key())
            .with_field(Field::new("active", "Boolean"))
            .with_field(Field::new("weight", "BigDecimal"));
        let db = vec![
            DatabaseTableInfo::new("flag")
                .with_column(DatabaseColumnInfo::new("id", "bigint(20)"))
                .with_column(DatabaseColumnInfo::new("active", "tinyint(1)"))
                .with_column(DatabaseColumnInfo::new("weight", "decimal(10,2)")),
        ];

        assert!(comparator.compare(&[entity], &db).unwrap().is_empty());
    }

    #[test]
    fn test_expected_schema_shape() {
        let tables = postgres().expected_schema(&[order()]).unwrap();
        let table = &tables[0];

        assert_eq!(table.name, "order");
        assert_eq!(table.primary_keys, vec!["id"]);
        assert_eq!(table.foreign_keys.len(), 1);
        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "customer_id", "total"]);
        assert_eq!(table.columns[2].type_name, "NUMERIC(12, 2)");
        assert!(!table.columns[0].nullable);
        assert!(table.columns[1].nullable);
    }

    #[test]
    fn test_tdengine_round_trip_keeps_timestamp() {
        let strategy: Arc<dyn DdlStrategy> = Arc::new(TdengineStrategy::new(
            GeneratorConfig::builder().allow_drop(true).build(),
        ));
        let comparator = SchemaComparator::new(Arc::clone(&strategy));
        let meter = Entity::new("Meter").with_field(Field::new("voltage", "Double"));

        // Catalog view of `CREATE TABLE IF NOT EXISTS meter ( ts TIMESTAMP, voltage DOUBLE );`
        let db = vec![
            DatabaseTableInfo::new("meter")
                .with_column(DatabaseColumnInfo::new("ts", "TIMESTAMP").not_null())
                .with_column(DatabaseColumnInfo::new("voltage", "DOUBLE")),
        ];

        let comparison = comparator.compare(&[meter.clone()], &db).unwrap();
        assert!(comparison.is_empty(), "{comparison:?}");
        assert!(
            DdlGenerator::new(strategy)
                .migration_statements(&comparison, &[meter])
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_tdengine_reused_ts_field_is_timestamp() {
        let comparator = SchemaComparator::new(Arc::new(TdengineStrategy::default()));
        let tick = Entity::new("Tick")
            .with_field(Field::new("id", "Long").primary_key())
            .with_field(Field::new("ts", "Long"));

        let tables = comparator.expected_schema(&[tick]).unwrap();
        let columns: Vec<(&str, &str)> = tables[0]
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.type_name.as_str()))
            .collect();
        assert_eq!(columns, vec![("ts", "TIMESTAMP"), ("id", "BIGINT")]);
        assert!(tables[0].primary_keys.is_empty());
    }

    #[test]
    fn test_expected_schema_includes_junction_tables() {
        let role = Entity::new("Role").with_field(Field::new("id", "Long").primary_key());
        let user = Entity::new("User")
            .with_field(Field::new("id", "Long").primary_key())
            .with_field(Field::new("roles", "List<Role>").with_annotation(Annotation::new("ManyToMany")));
        let comparator = postgres();
        let entities = vec![user, role];

        let tables = comparator.expected_schema(&entities).unwrap();
        let junction = &tables[2];
        assert_eq!(junction.name, "user_role_mapping");
        assert_eq!(junction.primary_keys, vec!["user_id", "role_id"]);
        assert_eq!(junction.foreign_keys.len(), 2);

        let comparison = comparator.compare(&entities, &tables).unwrap();
        assert!(comparison.is_empty(), "{comparison:?}");

        let comparison = comparator.compare(&entities, &tables[..2]).unwrap();
        assert_eq!(comparison.new_tables, vec!["user_role_mapping"]);
    }

    #[test]
    fn test_comparison_is_deterministic() {
        let comparator = postgres();
        let entities = vec![customer(), order()];
        let db = vec![DatabaseTableInfo::new("customer"), DatabaseTableInfo::new("audit")];

        let first = comparator.compare(&entities, &db).unwrap();
        for _ in 0..3 {
            assert_eq!(comparator.compare(&entities, &db).unwrap(), first);
        }
    }
}
