//! Core value types shared by query components and filters

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Scalar value compared against an indexed field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    /// 64-bit integer
    Long(i64),
    /// 64-bit floating point
    Double(f64),
    /// String (keywords, encoded ids, ISO dates)
    String(String),
}

impl FieldValue {
    /// Convert to f64 if possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Long(v) => Some(*v as f64),
            FieldValue::Double(v) => Some(*v),
            FieldValue::String(s) => s.parse().ok(),
            FieldValue::Bool(_) => None,
        }
    }

    /// Canonical JSON representation
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Long(v) => Value::from(*v),
            FieldValue::Double(v) => Value::from(*v),
            FieldValue::String(s) => Value::String(s.clone()),
        }
    }

    /// Read a scalar back from JSON; arrays, objects and null have no scalar form
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(FieldValue::Long(i))
                } else {
                    n.as_f64().map(FieldValue::Double)
                }
            }
            Value::String(s) => Some(FieldValue::String(s.clone())),
            _ => None,
        }
    }

    /// Order two values the way the index compares them: numerically when both
    /// sides are numeric, lexically otherwise
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::String(a), FieldValue::String(b)) => match (a.parse::<f64>(), b.parse::<f64>()) {
                (Ok(x), Ok(y)) => x.partial_cmp(&y),
                _ => Some(a.cmp(b)),
            },
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Long(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Long(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Long(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

/// Range bounds for range components
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    /// Greater than
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<FieldValue>,
    /// Greater than or equal to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<FieldValue>,
    /// Less than
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<FieldValue>,
    /// Less than or equal to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<FieldValue>,
}

impl RangeBounds {
    /// Check if a value is within this range
    pub fn contains(&self, value: &FieldValue) -> bool {
        let check = |bound: &Option<FieldValue>, accept: fn(Ordering) -> bool| match bound {
            Some(b) => value.compare(b).map(accept).unwrap_or(false),
            None => true,
        };
        check(&self.gt, |o| o == Ordering::Greater)
            && check(&self.gte, |o| o != Ordering::Less)
            && check(&self.lt, |o| o == Ordering::Less)
            && check(&self.lte, |o| o != Ordering::Greater)
    }

    pub fn is_unbounded(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }
}

/// Sort direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// How a searchable field is matched against the free-text query
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSearchStrategy {
    /// Analyzed match with automatic fuzziness
    Default,
    /// Phrase-prefix match, for identifier-like fields
    WildcardPhrase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_conversions() {
        assert_eq!(FieldValue::Long(42).as_f64(), Some(42.0));
        assert_eq!(FieldValue::String("100".to_string()).as_f64(), Some(100.0));
        assert_eq!(FieldValue::Bool(true).as_f64(), None);
        assert_eq!(
            FieldValue::from_json(&serde_json::json!(7)),
            Some(FieldValue::Long(7))
        );
        assert_eq!(FieldValue::from_json(&Value::Null), None);
    }

    #[test]
    fn test_range_bounds() {
        let bounds = RangeBounds {
            gte: Some(FieldValue::Long(10)),
            lt: Some(FieldValue::Long(20)),
            ..Default::default()
        };

        assert!(bounds.contains(&FieldValue::Long(10)));
        assert!(bounds.contains(&FieldValue::Double(15.5)));
        assert!(!bounds.contains(&FieldValue::Long(20)));
        assert!(!bounds.contains(&FieldValue::Long(9)));
    }

    #[test]
    fn test_range_bounds_on_dates() {
        let bounds = RangeBounds {
            gte: Some("2024-01-01".into()),
            lt: Some("2024-02-01".into()),
            ..Default::default()
        };
        assert!(bounds.contains(&"2024-01-31".into()));
        assert!(!bounds.contains(&"2024-02-01".into()));
    }

    #[test]
    fn test_strategy_serde() {
        let s: FieldSearchStrategy = serde_json::from_str("\"wildcard_phrase\"").unwrap();
        assert_eq!(s, FieldSearchStrategy::WildcardPhrase);
    }
}
