//! Variable values and variable stores.
//!
//! Local variables belong to one actor; global variables are shared by a
//! whole session. Both are plain name-to-[`Value`] maps.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The value of a variable.
///
/// Text values are how formulas pass names around: in `stat[local[weapon]]`
/// the local variable `weapon` holds the name of a stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A number.
    Number(f64),
    /// A boolean, read as `1` or `0` in arithmetic.
    Bool(bool),
    /// Text, usually a stat, attribute or variable name.
    Text(String),
}

impl Value {
    /// Reads the value as a number, if it has a numeric reading.
    ///
    /// Text is parsed with the culture-invariant `.` decimal separator.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) => s.parse().ok(),
        }
    }

    /// The text form of the value when it is used as a name.
    #[must_use]
    pub fn to_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A store of named variables with deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables {
    values: BTreeMap<String, Value>,
}

impl Variables {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a variable's value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Sets a variable, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    /// Removes a variable.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_readings() {
        assert_eq!(Value::Number(2.5).as_number(), Some(2.5));
        assert_eq!(Value::Bool(true).as_number(), Some(1.0));
        assert_eq!(Value::from("0.25").as_number(), Some(0.25));
        assert_eq!(Value::from("strength").as_number(), None);
    }

    #[test]
    fn names_use_invariant_formatting() {
        assert_eq!(Value::Number(3.0).to_name(), "3");
        assert_eq!(Value::Number(0.5).to_name(), "0.5");
        assert_eq!(Value::from("atk").to_name(), "atk");
    }

    #[test]
    fn set_replaces_and_returns_previous() {
        let mut vars = Variables::new();
        assert_eq!(vars.set("weapon", "sword"), None);
        assert_eq!(vars.set("weapon", "axe"), Some(Value::from("sword")));
        assert_eq!(vars.get("weapon"), Some(&Value::from("axe")));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn loads_from_json() {
        let vars: Variables =
            serde_json::from_str(r#"{"level": 3, "stance": "guard", "blessed": true}"#).unwrap();
        assert_eq!(vars.get("level"), Some(&Value::Number(3.0)));
        assert_eq!(vars.get("stance"), Some(&Value::from("guard")));
        assert_eq!(vars.get("blessed"), Some(&Value::Bool(true)));
        let names: Vec<&str> = vars.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["blessed", "level", "stance"]);
    }
}
