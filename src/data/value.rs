//! Field values of experiment records

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field value as it appears in a result file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            _ => None,
        }
    }

    /// Category label used when the value is treated as a factor level.
    ///
    /// Whole numbers drop their fractional part so that `2.0` and `2` land
    /// in the same level. Lists and nulls have no label.
    pub fn category_label(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(x) => Some(format_number(*x)),
            Value::Null | Value::List(_) => None,
        }
    }

    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::List(_) => "list",
        }
    }

    /// Parse a raw delimited-file cell.
    ///
    /// Empty cells become `Null`; numbers and booleans (`True`/`true`) are
    /// recognized, everything else stays text.
    pub fn parse_cell(raw: &str) -> Value {
        let s = raw.trim();
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(x) = s.parse::<f64>() {
            return Value::Number(x);
        }
        match s {
            "True" | "true" | "TRUE" => Value::Bool(true),
            "False" | "false" | "FALSE" => Value::Bool(false),
            _ => Value::Text(s.to_string()),
        }
    }
}

fn format_number(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(";"))
            }
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels() {
        assert_eq!(Value::from("GA").category_label().as_deref(), Some("GA"));
        assert_eq!(Value::from(2.0).category_label().as_deref(), Some("2"));
        assert_eq!(Value::from(0.25).category_label().as_deref(), Some("0.25"));
        assert_eq!(Value::from(true).category_label().as_deref(), Some("true"));
        assert_eq!(Value::Null.category_label(), None);
        assert_eq!(Value::List(vec![Value::from(1.0)]).category_label(), None);
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(Value::parse_cell(" 12.5 "), Value::Number(12.5));
        assert_eq!(Value::parse_cell("True"), Value::Bool(true));
        assert_eq!(Value::parse_cell(""), Value::Null);
        assert_eq!(Value::parse_cell("HEFT"), Value::Text("HEFT".to_string()));
    }

    #[test]
    fn test_untagged_json() {
        let v: Vec<Value> = serde_json::from_str(r#"[1, 2.5, "x", true, null, [1, "a"]]"#).unwrap();
        assert_eq!(v[0], Value::Number(1.0));
        assert_eq!(v[1], Value::Number(2.5));
        assert_eq!(v[2], Value::Text("x".to_string()));
        assert_eq!(v[3], Value::Bool(true));
        assert_eq!(v[4], Value::Null);
        assert!(matches!(v[5], Value::List(_)));
    }
}
