//! Entity metadata model
//!
//! Dialect-neutral description of table-backed classes, as handed over by the
//! source introspection layer: entities, fields, annotations and foreign keys.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DdlError, Result};

// ============================================================================
// Dialects
// ============================================================================

/// SQL dialects known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dialect {
    Mysql,
    Postgresql,
    Oracle,
    Sqlserver,
    H2,
    Sqlite,
    Dm,
    Tdengine,
}

impl Dialect {
    /// Every dialect identifier, in declaration order
    pub const ALL: [Dialect; 8] = [
        Dialect::Mysql,
        Dialect::Postgresql,
        Dialect::Oracle,
        Dialect::Sqlserver,
        Dialect::H2,
        Dialect::Sqlite,
        Dialect::Dm,
        Dialect::Tdengine,
    ];

    /// Upper-case identifier, e.g. `POSTGRESQL`
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Mysql => "MYSQL",
            Dialect::Postgresql => "POSTGRESQL",
            Dialect::Oracle => "ORACLE",
            Dialect::Sqlserver => "SQLSERVER",
            Dialect::H2 => "H2",
            Dialect::Sqlite => "SQLITE",
            Dialect::Dm => "DM",
            Dialect::Tdengine => "TDENGINE",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = DdlError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Dialect::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let available: Vec<&str> = Dialect::ALL.iter().map(|d| d.as_str()).collect();
                DdlError::unsupported_dialect(format!(
                    "{}. Available: {}",
                    s,
                    available.join(", ")
                ))
            })
    }
}

// ============================================================================
// Naming
// ============================================================================

static ACRONYM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid regex"));
static WORD_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

/// Convert a camelCase / PascalCase name to snake_case
///
/// `OrderItem` -> `order_item`, `HTTPServer` -> `http_server`.
pub fn to_snake_case(name: &str) -> String {
    let step = ACRONYM_BOUNDARY.replace_all(name.trim(), "${1}_${2}");
    let step = WORD_BOUNDARY.replace_all(&step, "${1}_${2}");
    step.replace(['-', ' '], "_").to_lowercase()
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

// ============================================================================
// Annotations
// ============================================================================

/// Source-level annotation carried on an entity or field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Annotation {
    /// Simple or fully-qualified annotation name
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Name without its package prefix
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

fn find_annotation<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.simple_name() == name)
}

// ============================================================================
// Fields
// ============================================================================

fn default_nullable() -> bool {
    true
}

/// A single persisted property of an entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    /// Explicit column name; derived from `name` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    /// Source type name, simple or fully qualified (`java.lang.Long`, `i64`, ...)
    pub type_name: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub sequence: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// SQL default expression, emitted verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Long-text hint
    #[serde(default)]
    pub text: bool,
    /// Raw column type, used verbatim when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_definition: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Field {
    /// Create a nullable field with the given source type
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_name: None,
            type_name: type_name.into(),
            nullable: true,
            primary_key: false,
            auto_increment: false,
            sequence: false,
            sequence_name: None,
            length: None,
            precision: None,
            scale: None,
            default_value: None,
            comment: None,
            text: false,
            column_definition: None,
            annotations: Vec::new(),
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Mark as a long-text column
    pub fn text(mut self) -> Self {
        self.text = true;
        self
    }

    /// Assign values from a sequence; `None` uses `{column}_seq`
    pub fn with_sequence(mut self, name: Option<&str>) -> Self {
        self.sequence = true;
        self.sequence_name = name.map(str::to_string);
        self
    }

    pub fn with_column_name(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = Some(column_name.into());
        self
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_column_definition(mut self, definition: impl Into<String>) -> Self {
        self.column_definition = Some(definition.into());
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Column name: explicit override, `@Column(name)`, else snake_case of the field name
    pub fn resolved_column_name(&self) -> Result<String> {
        let explicit = self
            .column_name
            .as_deref()
            .or_else(|| self.annotation("Column").and_then(|a| a.get("name")))
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let resolved = match explicit {
            Some(name) => name.to_string(),
            None => to_snake_case(&self.name),
        };

        if resolved.is_empty() {
            return Err(DdlError::MissingColumnName(self.type_name.clone()));
        }
        Ok(resolved)
    }

    /// Raw column definition override, if any annotation or explicit value carries one
    pub fn raw_column_definition(&self) -> Option<&str> {
        self.column_definition
            .as_deref()
            .or_else(|| {
                self.annotations
                    .iter()
                    .filter(|a| a.simple_name().ends_with("Column"))
                    .find_map(|a| a.get("columnDefinition"))
            })
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotation(name).is_some()
    }

    /// Whether the field is stored in a column of its entity's table
    ///
    /// Collection relations and `@Transient` fields are not.
    pub fn is_column(&self) -> bool {
        !["ManyToMany", "OneToMany", "Transient"]
            .iter()
            .any(|name| self.has_annotation(name))
    }

    /// Primary keys are always NOT NULL
    pub fn is_not_null(&self) -> bool {
        !self.nullable || self.primary_key
    }

    /// Element type of a collection-typed field: `List<Role>` -> `Role`
    pub fn element_type(&self) -> Option<&str> {
        let start = self.type_name.find('<')?;
        let end = self.type_name.rfind('>')?;
        let inner = self.type_name.get(start + 1..end)?;
        let element = inner.rsplit(',').next()?.trim().trim_end_matches('?');
        (!element.is_empty()).then_some(element)
    }

    /// Sequence backing this column, if it uses one
    pub fn resolved_sequence_name(&self) -> Result<Option<String>> {
        if !self.sequence {
            return Ok(None);
        }
        match self.sequence_name.as_deref().filter(|s| !s.is_empty()) {
            Some(name) => Ok(Some(name.to_string())),
            None => Ok(Some(format!("{}_seq", self.resolved_column_name()?))),
        }
    }
}

// ============================================================================
// Foreign keys
// ============================================================================

/// Foreign key from one column into another table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyInfo {
    /// Constraint name; `fk_{table}_{column}` when empty
    #[serde(default)]
    pub name: String,
    pub column_name: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

impl ForeignKeyInfo {
    pub fn new(
        column_name: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            name: String::new(),
            column_name: column_name.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Constraint name used in DDL for a key declared on `table`
    pub fn constraint_name(&self, table: &str) -> String {
        if self.name.is_empty() {
            format!("fk_{}_{}", table, self.column_name)
        } else {
            self.name.clone()
        }
    }
}

// ============================================================================
// Indexes
// ============================================================================

/// Index over one or more columns of a table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

// ============================================================================
// Many-to-many
// ============================================================================

/// Junction table linking two entity tables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManyToManyTable {
    pub table_name: String,
    pub left_table: String,
    pub left_column: String,
    pub left_referenced_column: String,
    pub right_table: String,
    pub right_column: String,
    pub right_referenced_column: String,
}

impl ManyToManyTable {
    /// `{left}_{right}_mapping` with `{left}_id` / `{right}_id` columns referencing `id`
    pub fn new(left_table: impl Into<String>, right_table: impl Into<String>) -> Self {
        let left_table = left_table.into();
        let right_table = right_table.into();
        Self {
            table_name: format!("{}_{}_mapping", left_table, right_table),
            left_column: format!("{}_id", left_table),
            left_referenced_column: "id".to_string(),
            right_column: format!("{}_id", right_table),
            right_referenced_column: "id".to_string(),
            left_table,
            right_table,
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_columns(mut self, left_column: impl Into<String>, right_column: impl Into<String>) -> Self {
        self.left_column = left_column.into();
        self.right_column = right_column.into();
        self
    }

    /// Foreign keys from the junction columns to both sides
    pub fn foreign_keys(&self) -> Vec<ForeignKeyInfo> {
        vec![
            ForeignKeyInfo::new(&self.left_column, &self.left_table, &self.left_referenced_column),
            ForeignKeyInfo::new(&self.right_column, &self.right_table, &self.right_referenced_column),
        ]
    }

    /// The junction as an entity: two non-null BIGINT-family columns forming the primary key
    pub fn to_entity(&self) -> Entity {
        let column = |name: &str| {
            Field::new(name, "Long")
                .with_column_name(name)
                .primary_key()
                .not_null()
        };
        let mut entity = Entity::new(&self.table_name)
            .with_table_name(&self.table_name)
            .with_field(column(&self.left_column))
            .with_field(column(&self.right_column));
        entity.foreign_keys = self.foreign_keys();
        entity
    }
}

/// Single primary key column of `entity`, else `id`
fn referenced_key(entity: Option<&Entity>) -> Result<String> {
    match entity.map(|e| e.primary_key_fields()).as_deref() {
        Some([key]) => key.resolved_column_name(),
        _ => Ok("id".to_string()),
    }
}

/// Junction tables declared by `@ManyToMany` fields
///
/// The owning side declares the table; fields with `mappedBy` are the inverse
/// side and are skipped. `@JoinTable(name, joinColumnName, inverseJoinColumnName)`
/// overrides the derived names. Tables are de-duplicated by name.
pub fn scan_many_to_many_tables(entities: &[Entity]) -> Result<Vec<ManyToManyTable>> {
    let mut tables: Vec<ManyToManyTable> = Vec::new();

    for entity in entities {
        for field in &entity.fields {
            let Some(relation) = field.annotation("ManyToMany") else {
                continue;
            };
            if relation.get("mappedBy").is_some_and(|v| !v.trim().is_empty()) {
                continue;
            }

            let target = relation
                .get("targetEntity")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .or_else(|| field.element_type())
                .ok_or_else(|| {
                    DdlError::validation(format!(
                        "Cannot determine the target entity of many-to-many field '{}.{}'",
                        entity.name, field.name
                    ))
                })?;
            let target_entity = entities
                .iter()
                .find(|e| e.qualified_name == target || e.name == simple_name(target));

            let left_table = entity.table_name();
            let right_table = target_entity
                .map(Entity::table_name)
                .unwrap_or_else(|| to_snake_case(simple_name(target)));

            let mut table = ManyToManyTable::new(&left_table, &right_table);
            table.left_referenced_column = referenced_key(Some(entity))?;
            table.right_referenced_column = referenced_key(target_entity)?;
            if table.left_column == table.right_column {
                table.right_column = format!("{}_id", field.resolved_column_name()?);
            }

            if let Some(join) = field.annotation("JoinTable") {
                let attr = |key: &str| join.get(key).map(str::trim).filter(|v| !v.is_empty());
                if let Some(name) = attr("name") {
                    table.table_name = name.to_string();
                }
                if let Some(column) = attr("joinColumnName") {
                    table.left_column = column.to_string();
                }
                if let Some(column) = attr("inverseJoinColumnName") {
                    table.right_column = column.to_string();
                }
            }

            if !tables
                .iter()
                .any(|t| t.table_name.eq_ignore_ascii_case(&table.table_name))
            {
                tables.push(table);
            }
        }
    }

    Ok(tables)
}

/// `entities` followed by the junction tables they declare, as entities
///
/// Junctions whose table name is already taken by an entity are not repeated.
pub fn with_junction_entities(entities: &[Entity]) -> Result<Vec<Entity>> {
    let mut all = entities.to_vec();
    for junction in scan_many_to_many_tables(entities)? {
        if !all
            .iter()
            .any(|e| e.table_name().eq_ignore_ascii_case(&junction.table_name))
        {
            all.push(junction.to_entity());
        }
    }
    Ok(all)
}

// ============================================================================
// Entities
// ============================================================================

/// A table-backed class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub qualified_name: String,
    /// Explicit table name; resolved from annotations or `name` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyInfo>,
    /// Explicitly declared indexes; `@Key` / `@Index` fields add more
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
    #[serde(default)]
    pub is_interface: bool,
    #[serde(default)]
    pub is_enum: bool,
    #[serde(default)]
    pub is_pojo: bool,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            qualified_name: name.clone(),
            name,
            table_name: None,
            comment: None,
            fields: Vec::new(),
            annotations: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            is_interface: false,
            is_enum: false,
            is_pojo: false,
        }
    }

    pub fn with_qualified_name(mut self, qualified_name: impl Into<String>) -> Self {
        self.qualified_name = qualified_name.into();
        self
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKeyInfo) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// Explicit indexes followed by those declared on fields
    ///
    /// `@Key` makes a unique index `uk_{table}_{column}`; fields sharing a
    /// `@Key(group)` form one composite unique index `uk_{table}_{group}`.
    /// `@Index` makes `idx_{table}_{column}` (`name` and `unique` attributes
    /// override). Primary key columns never get a key index.
    pub fn index_definitions(&self) -> Result<Vec<IndexDefinition>> {
        let table = self.table_name();
        let mut indexes = self.indexes.clone();
        let mut groups: Vec<(String, usize)> = Vec::new();

        for field in self.columns() {
            let column = field.resolved_column_name()?;

            if let Some(key) = field.annotation("Key").filter(|_| !field.primary_key) {
                match key.get("group").map(str::trim).filter(|g| !g.is_empty()) {
                    Some(group) => match groups.iter().find(|(g, _)| g == group) {
                        Some(&(_, position)) => indexes[position].columns.push(column.clone()),
                        None => {
                            groups.push((group.to_string(), indexes.len()));
                            indexes.push(
                                IndexDefinition::new(format!("uk_{}_{}", table, group), [column.clone()])
                                    .unique(),
                            );
                        }
                    },
                    None => indexes.push(
                        IndexDefinition::new(format!("uk_{}_{}", table, column), [column.clone()])
                            .unique(),
                    ),
                }
            }

            if let Some(index) = field.annotation("Index") {
                let name = index
                    .get("name")
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("idx_{}_{}", table, column));
                let mut definition = IndexDefinition::new(name, [column]);
                definition.unique = index.get("unique").is_some_and(|u| u.eq_ignore_ascii_case("true"));
                indexes.push(definition);
            }
        }

        Ok(indexes)
    }

    /// Table name: explicit value, `@Table(name)`, else snake_case of the entity name
    pub fn table_name(&self) -> String {
        self.table_name
            .as_deref()
            .or_else(|| find_annotation(&self.annotations, "Table").and_then(|a| a.get("name")))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| to_snake_case(&self.name))
    }

    /// Fields backed by a column, in declaration order
    pub fn columns(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_column())
    }

    pub fn primary_key_fields(&self) -> Vec<&Field> {
        self.columns().filter(|f| f.primary_key).collect()
    }

    /// Whether the table or any column carries a comment
    pub fn has_comments(&self) -> bool {
        self.comment.is_some() || self.columns().any(|f| f.comment.is_some())
    }

    /// Look up a field by its resolved column name
    pub fn field_by_column(&self, column: &str, ignore_case: bool) -> Result<Option<&Field>> {
        for field in self.columns() {
            let name = field.resolved_column_name()?;
            if names_match(&name, column, ignore_case) {
                return Ok(Some(field));
            }
        }
        Ok(None)
    }
}

/// Compare two identifiers, optionally ignoring ASCII case
pub fn names_match(a: &str, b: &str, ignore_case: bool) -> bool {
    if ignore_case {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}
