//! Hierarchical shift totals and metric paths into them

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MinetallyError;

type MetricMap = BTreeMap<String, f64>;
type SubActivityMap = BTreeMap<String, MetricMap>;

/// `activity -> sub_activity -> metric -> value`.
///
/// Always derived from a set of activity payloads; ordered maps keep the
/// serialized form stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShiftTotals(BTreeMap<String, SubActivityMap>);

impl ShiftTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate `value` into `activity/sub_activity/metric`.
    pub fn add(&mut self, activity: &str, sub_activity: &str, metric: &str, value: f64) {
        *self
            .0
            .entry(activity.to_string())
            .or_default()
            .entry(sub_activity.to_string())
            .or_default()
            .entry(metric.to_string())
            .or_insert(0.0) += value;
    }

    pub fn get(&self, activity: &str, sub_activity: &str, metric: &str) -> Option<f64> {
        self.0.get(activity)?.get(sub_activity)?.get(metric).copied()
    }

    /// Value addressed by a metric key, summing across sub-activities for a
    /// wildcard key. Missing paths read as zero.
    pub fn metric(&self, key: &MetricKey) -> f64 {
        let Some(subs) = self.0.get(&key.activity) else {
            return 0.0;
        };
        match &key.sub_activity {
            Some(sub) => subs.get(sub).and_then(|m| m.get(&key.metric)).copied().unwrap_or(0.0),
            None => subs.values().filter_map(|m| m.get(&key.metric)).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn activities(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Flattened `(activity, sub_activity, metric, value)` view.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str, f64)> {
        self.0.iter().flat_map(|(activity, subs)| {
            subs.iter().flat_map(move |(sub, metrics)| {
                metrics.iter().map(move |(metric, value)| {
                    (activity.as_str(), sub.as_str(), metric.as_str(), *value)
                })
            })
        })
    }
}

/// Path into [`ShiftTotals`]: `Activity/SubActivity/Metric`.
///
/// A `*` sub-activity matches every sub-activity of the activity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetricKey {
    pub activity: String,
    pub sub_activity: Option<String>,
    pub metric: String,
}

impl MetricKey {
    pub fn new(activity: &str, sub_activity: &str, metric: &str) -> Self {
        Self {
            activity: activity.to_string(),
            sub_activity: Some(sub_activity.to_string()),
            metric: metric.to_string(),
        }
    }

    pub fn any_sub_activity(activity: &str, metric: &str) -> Self {
        Self { activity: activity.to_string(), sub_activity: None, metric: metric.to_string() }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sub = self.sub_activity.as_deref().unwrap_or("*");
        write!(f, "{}/{}/{}", self.activity, sub, self.metric)
    }
}

impl FromStr for MetricKey {
    type Err = MinetallyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').map(str::trim).collect();
        match parts.as_slice() {
            [activity, sub, metric] if !activity.is_empty() && !sub.is_empty() && !metric.is_empty() => {
                Ok(Self {
                    activity: (*activity).to_string(),
                    sub_activity: (*sub != "*").then(|| (*sub).to_string()),
                    metric: (*metric).to_string(),
                })
            }
            _ => Err(MinetallyError::InvalidInput(format!(
                "metric key must be 'Activity/SubActivity/Metric', got '{s}'"
            ))),
        }
    }
}

impl TryFrom<String> for MetricKey {
    type Error = MinetallyError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MetricKey> for String {
    fn from(value: MetricKey) -> Self {
        value.to_string()
    }
}
