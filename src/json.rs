//! Example tables from JSON.
//!
//! A table is a JSON array of rows; each row is either an array (one example-set) or a single scalar (a one-value
//! set). Objects have no positional order and are rejected.
//!
//! ```rust
//! use casebook::json::example_sets_from_json;
//! use casebook::Value;
//!
//! let sets = example_sets_from_json(r#"[["NYC", 1], "LA"]"#).unwrap();
//! assert_eq!(sets[0], vec![Value::from("NYC"), Value::from(1)]);
//! assert_eq!(sets[1], vec![Value::from("LA")]);
//! ```

use casebook_core::Value;
use miette::Diagnostic;
use thiserror::Error;

use crate::registry::ClassBuilder;

#[derive(Debug, Error, Diagnostic)]
pub enum JsonTableError {
    #[error("example table is not valid JSON")]
    #[diagnostic(code(casebook::json::parse))]
    Parse(#[from] serde_json::Error),

    #[error("example table must be a JSON array of rows, found {found}")]
    #[diagnostic(code(casebook::json::not_a_table), help("wrap the rows in `[...]`"))]
    NotATable { found: &'static str },

    #[error("row {row} is a JSON object; example values are positional")]
    #[diagnostic(code(casebook::json::object_row))]
    ObjectRow { row: usize },
}

/// Convert one JSON value.
///
/// Integers that fit `i64` stay integers; other numbers become floats. Nested objects are rejected by the caller.
pub fn value_from_json(json: &serde_json::Value) -> Option<Value> {
    Some(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64()?),
        },
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(value_from_json).collect::<Option<_>>()?),
        serde_json::Value::Object(_) => return None,
    })
}

/// Parse a JSON example table into example-sets, in row order.
pub fn example_sets_from_json(text: &str) -> Result<Vec<Vec<Value>>, JsonTableError> {
    let parsed: serde_json::Value = serde_json::from_str(text)?;
    let rows = match parsed {
        serde_json::Value::Array(rows) => rows,
        other => return Err(JsonTableError::NotATable { found: kind(&other) }),
    };

    rows.iter()
        .enumerate()
        .map(|(row, json)| {
            let values = match json {
                serde_json::Value::Array(items) => items.iter().map(value_from_json).collect::<Option<Vec<_>>>(),
                scalar => value_from_json(scalar).map(|v| vec![v]),
            };
            values.ok_or(JsonTableError::ObjectRow { row })
        })
        .collect()
}

impl<T: Send + Sync + 'static> ClassBuilder<T> {
    /// Append every row of a JSON example table to `method` as one example-set.
    pub fn example_table(self, method: impl Into<String>, json: &str) -> Result<Self, JsonTableError> {
        let sets = example_sets_from_json(json)?;
        Ok(self.examples(method, sets))
    }
}

fn kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
