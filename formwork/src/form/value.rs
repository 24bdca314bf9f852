// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Dynamically typed value of a field, a statement parameter or a result cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No value.
    Null,

    /// Boolean flag.
    Bool(bool),

    /// Numeric value.
    Number(f64),

    /// Text value.
    Text(String),

    /// Set of values, for example the selected ids of a multi-value link.
    List(Vec<String>),

    /// Raw file contents.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true for null, blank text and empty lists.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(text) => text.trim().is_empty(),
            Value::List(items) => items.iter().all(|item| item.trim().is_empty()),
            Value::Bytes(bytes) => bytes.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }

    /// Returns the value as text, `None` for null, lists and bytes.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Text(text) => Some(text.clone()),
            Value::Number(number) => Some(format_number(*number)),
            Value::Bool(flag) => Some(flag.to_string()),
            Value::Null | Value::List(_) | Value::Bytes(_) => None,
        }
    }

    /// Interprets the value as an integer id.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(number) if number.fract() == 0.0 => Some(*number as i64),
            Value::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interprets the value as a boolean flag, null and unknown values are false.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(flag) => *flag,
            Value::Number(number) => *number != 0.0,
            Value::Text(text) => matches!(
                text.trim().to_lowercase().as_str(),
                "true" | "1" | "yes"
            ),
            Value::Null | Value::List(_) | Value::Bytes(_) => false,
        }
    }

    /// Splits the value into its items.
    ///
    /// Lists are returned as they are, text is split at commas as backends return multi-value
    /// cells comma-joined. Items are trimmed and blank items dropped.
    pub fn items(&self) -> Vec<String> {
        let items = match self {
            Value::List(items) => items.clone(),
            Value::Text(text) => text.split(',').map(|item| item.to_string()).collect(),
            Value::Number(number) => vec![format_number(*number)],
            Value::Bool(_) | Value::Null | Value::Bytes(_) => Vec::new(),
        };

        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Value::List(value.into_iter().map(String::from).collect())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(flag) => write!(f, "{flag}"),
            Value::Number(number) => write!(f, "{}", format_number(*number)),
            Value::Text(text) => write!(f, "'{text}'"),
            Value::List(items) => write!(f, "[{}]", items.join(", ")),
            Value::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// Formats whole numbers without a fractional part.
fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::Value;

    #[test]
    fn emptiness() {
        assert!(Value::Null.is_empty());
        assert!(Value::Text("  ".into()).is_empty());
        assert!(Value::List(vec![]).is_empty());
        assert!(!Value::Bool(false).is_empty());
        assert!(!Value::Number(0.0).is_empty());
        assert!(!Value::from("Acme").is_empty());
    }

    #[test]
    fn split_multi_value_cells() {
        assert_eq!(Value::from("3, 7,,").items(), vec!["3", "7"]);
        assert_eq!(Value::from(vec!["3", " "]).items(), vec!["3"]);
        assert_eq!(Value::Number(12.0).items(), vec!["12"]);
        assert!(Value::Null.items().is_empty());
    }

    #[test]
    fn numeric_ids() {
        assert_eq!(Value::Number(42.0).as_i64(), Some(42));
        assert_eq!(Value::from(" 42 ").as_i64(), Some(42));
        assert_eq!(Value::Number(4.2).as_i64(), None);
        assert_eq!(Value::Number(42.0).as_text(), Some("42".into()));
    }

    #[test]
    fn deserialize_untagged() {
        let value: Value = serde_json::from_str("null").unwrap();
        assert_eq!(value, Value::Null);

        let value: Value = serde_json::from_str(r#"["3", "7"]"#).unwrap();
        assert_eq!(value, Value::from(vec!["3", "7"]));

        let value: Value = serde_json::from_str("12").unwrap();
        assert_eq!(value, Value::Number(12.0));
    }
}
