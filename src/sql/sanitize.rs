//! SQL Identifier and Literal Quoting
//!
//! Every dialect quotes identifiers its own way; string literals are escaped
//! the same way everywhere (single quotes are doubled).

/// How a dialect quotes identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `` `name` `` (MySQL, DM)
    Backtick,
    /// `"name"` (PostgreSQL, H2)
    DoubleQuote,
    /// `"NAME"` (Oracle)
    UpperDoubleQuote,
    /// `name` (TDengine)
    Bare,
}

/// Quote an identifier for the given style
///
/// Embedded quote characters are doubled so the identifier cannot terminate early.
pub fn quote_identifier(identifier: &str, style: QuoteStyle) -> String {
    match style {
        QuoteStyle::Backtick => format!("`{}`", identifier.replace('`', "``")),
        QuoteStyle::DoubleQuote => format!("\"{}\"", identifier.replace('"', "\"\"")),
        QuoteStyle::UpperDoubleQuote => {
            format!("\"{}\"", identifier.to_uppercase().replace('"', "\"\""))
        }
        QuoteStyle::Bare => identifier.to_string(),
    }
}

/// Escape the body of a single-quoted string literal
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render a complete single-quoted string literal
pub fn string_literal(value: &str) -> String {
    format!("'{}'", escape_literal(value))
}
