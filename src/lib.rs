//! # entity-ddl
//!
//! Multi-dialect DDL generation and schema evolution from entity metadata.
//!
//! Entities describe table-backed classes (fields, keys, comments, foreign
//! keys). This crate turns them into `CREATE`/`ALTER`/`DROP` statements for
//! several SQL dialects, orders tables so referenced ones are created first,
//! and diffs the entities against a live database to produce migration DDL.
//! No statement is ever executed; applying the output is the caller's job.
//!
//! ## Features
//!
//! - **Dialects**: MySQL, PostgreSQL, Oracle, H2, DM and TDengine built in; more via registration
//! - **Type Mapping Chain**: raw column definitions, custom rules, built-in tables, then a fallback
//! - **Dependency Ordering**: depth-first topological sort that fails on cycles
//! - **Indexes and Junction Tables**: `@Key` / `@Index` indexes and `@ManyToMany` join tables with deferred foreign keys
//! - **Schema Comparison**: new, dropped and modified tables against a PostgreSQL or MySQL catalog
//! - **Migration DDL**: comparison results rendered as ordered ALTER statements
//!
//! ## Quick Start
//!
//! ```rust
//! use entity_ddl::{DdlGenerator, Entity, Field, ForeignKeyInfo, StrategyFactory, TableContext};
//!
//! # fn main() -> entity_ddl::Result<()> {
//! let factory = StrategyFactory::default();
//! let generator = DdlGenerator::for_dialect(&factory, "mysql")?;
//!
//! let customer = Entity::new("Customer")
//!     .with_field(Field::new("id", "Long").primary_key().auto_increment())
//!     .with_field(Field::new("name", "String").not_null());
//! let order = Entity::new("Orders")
//!     .with_field(Field::new("id", "Long").primary_key().auto_increment())
//!     .with_field(Field::new("customerId", "Long"))
//!     .with_foreign_key(ForeignKeyInfo::new("customer_id", "customer", "id"));
//!
//! let ddl = generator.create_schema(&TableContext::new(vec![order, customer]))?;
//! assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS `customer`"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Comparing Against a Live Database
//!
//! ```rust,no_run
//! use entity_ddl::{ConnectionConfig, DdlGenerator, Dialect, Entity, Field, SchemaComparator, StrategyFactory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let factory = StrategyFactory::default();
//!     let strategy = factory.strategy(Dialect::Postgresql)?;
//!
//!     let entities = vec![
//!         Entity::new("Customer")
//!             .with_field(Field::new("id", "Long").primary_key())
//!             .with_field(Field::new("phone", "String").with_length(32)),
//!     ];
//!
//!     let connection = ConnectionConfig::builder("postgres://localhost/app", Dialect::Postgresql)
//!         .username("reader")
//!         .password("secret")
//!         .build();
//!
//!     let comparison = SchemaComparator::new(strategy.clone())
//!         .compare_live(&entities, &connection)
//!         .await?;
//!
//!     let script = DdlGenerator::new(strategy).migration_script(&comparison, &entities)?;
//!     println!("{}", script);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Strategies share a `GeneratorConfig`:
//!
//! ```rust
//! use entity_ddl::{GeneratorConfig, PostgresIdentity, UnmappedTypePolicy};
//!
//! let config = GeneratorConfig::builder()
//!     .unmapped_types(UnmappedTypePolicy::Reject) // Fail instead of falling back to VARCHAR(255)
//!     .postgres_identity(PostgresIdentity::Serial)
//!     .mysql_table_options("ENGINE=InnoDB")    // Default: ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
//!     .ignore_case(true)                       // Case-insensitive name matching (default)
//!     .allow_drop(false)                       // No DROP statements in migrations (default)
//!     .build();
//! ```

pub mod catalog;
pub mod compare;
pub mod config;
pub mod error;
pub mod factory;
pub mod resolver;
pub mod schema;
pub mod sql;
pub mod types;

// Re-export main types for convenience
pub use compare::{SchemaComparator, normalize_type};
pub use config::{
    ConnectionConfig, ConnectionConfigBuilder, GeneratorConfig, GeneratorConfigBuilder,
    PostgresIdentity, UnmappedTypePolicy,
};
pub use error::{DdlError, Result};
pub use factory::{StrategyFactory, StrategyFactoryBuilder};
pub use resolver::DependencyResolver;
pub use schema::{
    ColumnTypeChange, DatabaseColumnInfo, DatabaseTableInfo, SchemaComparison, TableContext,
    TableModification,
};
pub use types::{
    Annotation, Dialect, Entity, Field, ForeignKeyInfo, IndexDefinition, ManyToManyTable,
    scan_many_to_many_tables, with_junction_entities,
};

// Re-export SQL building blocks for custom strategies
pub use sql::ddl::DdlGenerator;
pub use sql::dialect::{DdlStrategy, compose_schema};
pub use sql::typemap::{TypeMapper, TypeRule};
