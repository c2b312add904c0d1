//! Objective definitions as returned by the objectives backend.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::Milliseconds;

/// Label name holding the metric name in a selector.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// A service level objective.
///
/// The target is a ratio of good events over the window, e.g. `0.999` for
/// 99.9% over `4w`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Objective {
    /// Name of the objective, usually the metric name of its selector.
    pub name: String,

    /// Target ratio of good events, between 0 and 1.
    pub target: f64,

    /// Window the target applies to.
    pub window: Milliseconds,

    /// Labels identifying this objective.
    pub labels: BTreeMap<String, String>,

    /// Free-text description.
    pub description: String,

    /// Raw configuration the objective was loaded from.
    pub config: String,

    /// How good and bad events are counted.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub indicator: Option<Indicator>,
}

impl Objective {
    /// Create an objective with a name, target and window.
    pub fn new(name: impl Into<String>, target: f64, window: Milliseconds) -> Self {
        Self {
            name: name.into(),
            target,
            window,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    pub fn with_indicator(mut self, indicator: Indicator) -> Self {
        self.indicator = Some(indicator);
        self
    }
}

/// The kind of service level indicator backing an objective.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Indicator {
    /// Errors counted by one metric, all requests by another.
    Ratio {
        errors: Metric,
        total: Metric,
        #[cfg_attr(feature = "serde", serde(default))]
        grouping: Vec<String>,
    },
    /// Requests faster than a threshold counted by a histogram bucket.
    Latency {
        success: Metric,
        total: Metric,
        #[cfg_attr(feature = "serde", serde(default))]
        grouping: Vec<String>,
    },
}

impl Indicator {
    /// The metric counting all requests.
    pub fn total(&self) -> &Metric {
        match self {
            Indicator::Ratio { total, .. } | Indicator::Latency { total, .. } => total,
        }
    }

    /// Labels the indicator aggregates by.
    pub fn grouping(&self) -> &[String] {
        match self {
            Indicator::Ratio { grouping, .. } | Indicator::Latency { grouping, .. } => grouping,
        }
    }
}

/// A metric name with the label matchers selecting its series.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metric {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub matchers: Vec<LabelMatcher>,
}

impl Metric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matchers: Vec::new(),
        }
    }

    /// Add a matcher to the selector.
    pub fn matcher(mut self, name: impl Into<String>, op: MatchOp, value: impl Into<String>) -> Self {
        self.matchers.push(LabelMatcher {
            name: name.into(),
            op,
            value: value.into(),
        });
        self
    }
}

/// A single label matcher, e.g. `code=~"5.."`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelMatcher {
    pub name: String,
    pub op: MatchOp,
    pub value: String,
}

/// Label matching operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchOp {
    #[cfg_attr(feature = "serde", serde(rename = "="))]
    Equal,
    #[cfg_attr(feature = "serde", serde(rename = "!="))]
    NotEqual,
    #[cfg_attr(feature = "serde", serde(rename = "=~"))]
    Regex,
    #[cfg_attr(feature = "serde", serde(rename = "!~"))]
    NotRegex,
}

impl MatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOp::Equal => "=",
            MatchOp::NotEqual => "!=",
            MatchOp::Regex => "=~",
            MatchOp::NotRegex => "!~",
        }
    }
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
