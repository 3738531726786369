//! Text-like vs numeric-like column classification.
//!
//! The rule is deliberately coarse: a type descriptor containing `char` or
//! `date` (case-sensitive) is [`ValueClass::Quoted`], everything else,
//! including booleans, arrays, JSON and columns missing from the schema, is
//! [`ValueClass::Raw`]. Statements are executed with bound parameters; the
//! classification drives the inline-literal rendering of the same statement
//! that is logged and returned to callers.

use crate::schema::TableSchema;
use crate::value::Value;

/// How a value is spliced into literal SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    /// Rendered through [`quote_literal`].
    Quoted,
    /// Rendered with the value's `Display` output, unescaped.
    Raw,
}

/// Classify a column type descriptor.
pub fn classify(type_descriptor: &str) -> ValueClass {
    if type_descriptor.contains("char") || type_descriptor.contains("date") {
        ValueClass::Quoted
    } else {
        ValueClass::Raw
    }
}

/// Classify `column` of `schema`; unknown columns are [`ValueClass::Raw`].
pub fn classify_column(schema: &TableSchema, column: &str) -> ValueClass {
    schema
        .column_type(column)
        .map_or(ValueClass::Raw, classify)
}

/// Quote a string as a Postgres literal.
///
/// Single quotes are doubled. If the input contains a backslash, every
/// backslash is doubled and the literal becomes an escape string (` E'...'`,
/// note the leading space) so the result is valid regardless of
/// `standard_conforming_strings`.
pub fn quote_literal(s: &str) -> String {
    let escaped = s.replace('\'', "''");
    if escaped.contains('\\') {
        format!(" E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{escaped}'")
    }
}

/// Render `value` as literal SQL according to `class`.
pub fn render_literal(value: &Value, class: ValueClass) -> String {
    match (value, class) {
        (Value::Null, _) => "NULL".to_string(),
        (v, ValueClass::Quoted) => quote_literal(&v.to_string()),
        (v, ValueClass::Raw) => v.to_string(),
    }
}
