//! Schema-level types
//!
//! Includes the per-request TableContext, the live catalog mirrors
//! (DatabaseTableInfo / DatabaseColumnInfo) and the SchemaComparison output.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{Entity, ForeignKeyInfo};

/// Entities plus their table-level dependency map for one generation request
#[derive(Debug, Clone, Default)]
pub struct TableContext {
    entities: Vec<Entity>,
    dependencies: HashMap<String, Vec<String>>,
}

impl TableContext {
    /// Build a context whose dependencies are derived from the entities' foreign keys
    ///
    /// A referenced table matches an entity's table ignoring ASCII case and is
    /// recorded under that entity's spelling; an exact match wins.
    pub fn new(entities: Vec<Entity>) -> Self {
        let tables: Vec<String> = entities.iter().map(Entity::table_name).collect();
        let mut dependencies: HashMap<String, Vec<String>> = HashMap::new();

        for (entity, table) in entities.iter().zip(&tables) {
            let deps = dependencies.entry(table.clone()).or_default();
            for fk in &entity.foreign_keys {
                let target = tables
                    .iter()
                    .find(|t| **t == fk.referenced_table)
                    .or_else(|| {
                        tables
                            .iter()
                            .find(|t| t.eq_ignore_ascii_case(&fk.referenced_table))
                    })
                    .unwrap_or(&fk.referenced_table);
                if !target.eq_ignore_ascii_case(table) && !deps.contains(target) {
                    deps.push(target.clone());
                }
            }
        }

        Self {
            entities,
            dependencies,
        }
    }

    /// Build a context with an explicit `table -> [depends on]` map
    pub fn with_dependencies(
        entities: Vec<Entity>,
        dependencies: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            entities,
            dependencies,
        }
    }

    /// Record that `table` must be created after `depends_on`
    pub fn add_dependency(mut self, table: impl Into<String>, depends_on: impl Into<String>) -> Self {
        let depends_on = depends_on.into();
        let deps = self.dependencies.entry(table.into()).or_default();
        if !deps.contains(&depends_on) {
            deps.push(depends_on);
        }
        self
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn dependencies(&self) -> &HashMap<String, Vec<String>> {
        &self.dependencies
    }

    /// Tables `table` depends on; empty when unknown
    pub fn dependencies_of(&self, table: &str) -> &[String] {
        self.dependencies.get(table).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Column as reported by a live catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseColumnInfo {
    pub name: String,
    /// Reported type, e.g. `character varying(255)` or `decimal(10,2)`
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl DatabaseColumnInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            size: None,
            nullable: true,
            default_value: None,
            comment: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Table as reported by a live catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseTableInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub columns: Vec<DatabaseColumnInfo>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyInfo>,
}

impl DatabaseTableInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            columns: Vec::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: DatabaseColumnInfo) -> Self {
        self.columns.push(column);
        self
    }
}

/// A column whose live type differs from the expected one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnTypeChange {
    pub column: String,
    /// Type reported by the database
    pub old_type: String,
    /// Type implied by the entity
    pub new_type: String,
}

/// Column-level differences for a table present on both sides
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableModification {
    pub added_columns: Vec<String>,
    pub modified_columns: Vec<ColumnTypeChange>,
    pub dropped_columns: Vec<String>,
}

impl TableModification {
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.modified_columns.is_empty()
            && self.dropped_columns.is_empty()
    }
}

/// Result of diffing entity metadata against a live schema
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaComparison {
    pub new_tables: Vec<String>,
    pub dropped_tables: Vec<String>,
    pub modified_tables: BTreeMap<String, TableModification>,
}

impl SchemaComparison {
    /// True when the live schema already matches the entities
    pub fn is_empty(&self) -> bool {
        self.new_tables.is_empty() && self.dropped_tables.is_empty() && self.modified_tables.is_empty()
    }
}
