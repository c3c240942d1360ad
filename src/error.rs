//! Error types for DDL generation and schema comparison

use thiserror::Error;

use crate::types::Dialect;

/// Errors that can occur while generating DDL or diffing a live schema
#[derive(Debug, Error)]
pub enum DdlError {
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("Circular dependency detected involving table: {table}")]
    CircularDependency { table: String },

    #[error("Field of type '{0}' does not resolve to a column name")]
    MissingColumnName(String),

    #[error("No type mapping for field '{field}' ({type_name}) in dialect {dialect}")]
    UnmappedType {
        field: String,
        type_name: String,
        dialect: Dialect,
    },

    #[error("{feature} is not supported by {dialect}")]
    Unsupported { feature: String, dialect: Dialect },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Introspection error: {0}")]
    Introspection(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

impl DdlError {
    pub fn unsupported_dialect(dialect: impl Into<String>) -> Self {
        Self::UnsupportedDialect(dialect.into())
    }

    pub fn circular_dependency(table: impl Into<String>) -> Self {
        Self::CircularDependency {
            table: table.into(),
        }
    }

    pub fn unsupported(feature: impl Into<String>, dialect: Dialect) -> Self {
        Self::Unsupported {
            feature: feature.into(),
            dialect,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn introspection(msg: impl Into<String>) -> Self {
        Self::Introspection(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DdlError>;
