//! Classification reasons

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A reason's value or threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReasonValue {
    Number(f64),
    Text(String),
}

impl From<f64> for ReasonValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for ReasonValue {
    fn from(value: u32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for ReasonValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl std::fmt::Display for ReasonValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// How a value compared with its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<")]
    Below,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "near_threshold")]
    NearThreshold,
    #[serde(rename = "missing")]
    Missing,
}

/// One triggered comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub signal: String,
    pub value: Option<ReasonValue>,
    pub threshold: Option<ReasonValue>,
    pub relation: Relation,
}

impl Reason {
    pub fn new(
        signal: impl Into<String>,
        value: impl Into<ReasonValue>,
        threshold: impl Into<ReasonValue>,
        relation: Relation,
    ) -> Self {
        Self {
            signal: signal.into(),
            value: Some(value.into()),
            threshold: Some(threshold.into()),
            relation,
        }
    }

    /// Advisory reason for an input field that was not supplied
    pub fn missing(field: &str) -> Self {
        Self {
            signal: format!("missing:{}", field),
            value: None,
            threshold: Some(ReasonValue::Number(0.0)),
            relation: Relation::Missing,
        }
    }

    fn key(&self) -> (String, Relation, String) {
        let threshold = self
            .threshold
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        (self.signal.clone(), self.relation, threshold)
    }
}

/// Ordered reasons, unique by (signal, relation, threshold)
#[derive(Debug, Clone, Default)]
pub struct ReasonSet {
    reasons: Vec<Reason>,
    seen: HashSet<(String, Relation, String)>,
}

impl ReasonSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reason unless an equivalent one is already present
    pub fn push(&mut self, reason: Reason) -> bool {
        if self.seen.insert(reason.key()) {
            self.reasons.push(reason);
            true
        } else {
            false
        }
    }

    pub fn extend(&mut self, reasons: impl IntoIterator<Item = Reason>) {
        for reason in reasons {
            self.push(reason);
        }
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn into_vec(self) -> Vec<Reason> {
        self.reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_by_key() {
        let mut set = ReasonSet::new();
        assert!(set.push(Reason::new("perclos", 0.62, 0.6, Relation::AtLeast)));
        // same key, different value
        assert!(!set.push(Reason::new("perclos", 0.65, 0.6, Relation::AtLeast)));
        assert!(set.push(Reason::new("perclos", 0.62, 0.5, Relation::AtLeast)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_wire_format() {
        let reason = Reason::new("fps", 8.0, 10.0, Relation::Below);
        let json = serde_json::to_string(&reason).unwrap();
        assert_eq!(json, r#"{"signal":"fps","value":8.0,"threshold":10.0,"relation":"<"}"#);

        let missing = serde_json::to_value(Reason::missing("yawn_duty")).unwrap();
        assert_eq!(missing["signal"], "missing:yawn_duty");
        assert!(missing["value"].is_null());
        assert_eq!(missing["relation"], "missing");
    }
}
