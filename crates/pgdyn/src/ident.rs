//! Identifier and type-descriptor allow-listing.
//!
//! Table names, column names and SQL type descriptors cannot be bound as
//! parameters, so they are spliced into statement text. Everything spliced
//! goes through one of the checks below first.
//!
//! - Identifier segments match `[A-Za-z_][A-Za-z0-9_$]*` or are double-quoted
//!   (any characters except NUL, `"` escaped as `""`), joined by `.`.
//! - Type descriptors start with a letter and only contain letters, digits,
//!   spaces and `_ ( ) , [ ] .`.

use crate::error::{DbError, DbResult};

/// Validate a (possibly dotted, possibly quoted) SQL identifier.
///
/// Returns the input unchanged so it can be used inline:
/// `format!("DROP TABLE {}", ident(table)?)`.
pub fn ident(s: &str) -> DbResult<&str> {
    if s.is_empty() {
        return Err(DbError::validation("Identifier cannot be empty"));
    }
    if s.contains('\0') {
        return Err(DbError::validation(
            "Identifier cannot contain NUL character",
        ));
    }

    let mut chars = s.chars().peekable();
    let mut first_part = true;

    while chars.peek().is_some() {
        if !first_part {
            match chars.next() {
                Some('.') if chars.peek().is_some() => {}
                Some('.') => return Err(DbError::validation("Trailing '.' in identifier")),
                Some(c) => {
                    return Err(DbError::validation(format!(
                        "Expected '.' between identifier parts, got '{c}' in '{s}'"
                    )));
                }
                None => break,
            }
        }
        first_part = false;

        if chars.peek() == Some(&'"') {
            chars.next();
            let mut len = 0usize;
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        len += 1;
                    }
                    Some('"') => break,
                    Some(_) => len += 1,
                    None => return Err(DbError::validation("Unclosed quoted identifier")),
                }
            }
            if len == 0 {
                return Err(DbError::validation("Empty quoted identifier"));
            }
            continue;
        }

        let mut len = 0usize;
        while let Some(&c) = chars.peek() {
            if c == '.' {
                break;
            }
            let ok = if len == 0 {
                c == '_' || c.is_ascii_alphabetic()
            } else {
                c == '_' || c == '$' || c.is_ascii_alphanumeric()
            };
            if !ok {
                return Err(DbError::validation(format!(
                    "Invalid character '{c}' in identifier '{s}'"
                )));
            }
            len += 1;
            chars.next();
        }
        if len == 0 {
            return Err(DbError::validation(format!(
                "Empty identifier segment in '{s}'"
            )));
        }
    }

    Ok(s)
}

/// Validate a table name that the DDL, write and schema paths operate on.
///
/// Only a single unquoted segment is accepted: the companion sequence is
/// `<prefix><table>` and the catalog lookup matches on the bare name, so
/// neither a schema qualifier nor quoting can be carried through.
pub fn table_ident(s: &str) -> DbResult<&str> {
    let s = ident(s)?;
    if s.contains('.') || s.contains('"') {
        return Err(DbError::validation(format!(
            "Table '{s}' must be a single unquoted identifier"
        )));
    }
    Ok(s)
}

/// Validate a select-list entry: an identifier or `*`.
pub fn column_or_star(s: &str) -> DbResult<&str> {
    if s == "*" { Ok(s) } else { ident(s) }
}

/// Validate a column type descriptor such as `varchar(50)`,
/// `double precision`, `numeric(10, 2)` or `integer[]`.
pub fn type_descriptor(s: &str) -> DbResult<&str> {
    let trimmed = s.trim();
    let Some(first) = trimmed.chars().next() else {
        return Err(DbError::validation("Column type cannot be empty"));
    };
    if !first.is_ascii_alphabetic() {
        return Err(DbError::validation(format!(
            "Column type must start with a letter: '{s}'"
        )));
    }
    if let Some(bad) = trimmed
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || " _(),[].".contains(*c)))
    {
        return Err(DbError::validation(format!(
            "Invalid character '{bad}' in column type '{s}'"
        )));
    }
    Ok(trimmed)
}
