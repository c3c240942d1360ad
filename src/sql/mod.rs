//! SQL generation
//!
//! Identifier quoting, type mapping, the per-dialect strategies and the
//! schema-level DDL generator built on top of them.

pub mod ddl;
pub mod dialect;
pub mod sanitize;
pub mod typemap;

pub use ddl::DdlGenerator;
pub use dialect::DdlStrategy;
pub use sanitize::{QuoteStyle, escape_literal, quote_identifier, string_literal};
pub use typemap::{MappedType, TypeFamily, TypeMapper, TypeRule, TypeSource};
