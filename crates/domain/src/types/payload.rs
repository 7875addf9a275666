//! Raw activity payloads captured by operators

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single captured field value.
///
/// Operators enter free-form labels and values, so a field may arrive as a
/// JSON number or as text such as `"2.4m"`. Numeric coercion happens only
/// when totals are aggregated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Number(f64),
    Text(String),
}

impl PayloadValue {
    /// Strict numeric reading: finite numbers and text that parses fully.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Parse-or-zero coercion used for derived metrics.
    pub fn number_or_zero(&self) -> f64 {
        self.as_number().unwrap_or(0.0)
    }

    /// Numeric reading that tolerates a trailing unit suffix (`"2.4m"`, `"1.8 m"`).
    pub fn measurement(&self) -> Option<f64> {
        match self {
            Self::Number(_) => self.as_number(),
            Self::Text(s) => s
                .trim()
                .trim_end_matches(|c: char| c.is_alphabetic())
                .trim_end()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Number(_) => None,
        }
    }

    /// Text form used for identifiers such as equipment ids.
    pub fn to_label(&self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        }
    }
}

impl From<f64> for PayloadValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for PayloadValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One individually weighed truck load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaulLoad {
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
}

impl HaulLoad {
    pub fn new(weight: f64) -> Self {
        Self { weight, material: None }
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }
}

/// Raw activity record submitted by an operator for one shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityPayload {
    pub activity: String,
    pub sub_activity: String,
    #[serde(default)]
    pub values: BTreeMap<String, PayloadValue>,
    /// Individually weighed loads; empty for legacy scalar hauling entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loads: Vec<HaulLoad>,
}

impl ActivityPayload {
    pub fn new(activity: impl Into<String>, sub_activity: impl Into<String>) -> Self {
        Self {
            activity: activity.into(),
            sub_activity: sub_activity.into(),
            values: BTreeMap::new(),
            loads: Vec::new(),
        }
    }

    /// Builder helper for adding a field value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Builder helper for adding a weighed load.
    pub fn with_load(mut self, load: HaulLoad) -> Self {
        self.loads.push(load);
        self
    }

    pub fn value(&self, key: &str) -> Option<&PayloadValue> {
        self.values.get(key)
    }

    /// Field coerced with parse-or-zero semantics.
    pub fn number(&self, key: &str) -> f64 {
        self.values.get(key).map_or(0.0, PayloadValue::number_or_zero)
    }

    pub fn has_loads(&self) -> bool {
        !self.loads.is_empty()
    }

    pub fn is(&self, activity: &str, sub_activity: &str) -> bool {
        self.activity == activity && self.sub_activity == sub_activity
    }
}
