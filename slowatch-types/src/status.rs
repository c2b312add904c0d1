//! Current status of an objective: achieved availability and remaining budget.

use alloc::collections::BTreeMap;
use alloc::string::String;

/// Status of one objective series over its window.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectiveStatus {
    /// Labels of the series this status was computed for.
    #[cfg_attr(feature = "serde", serde(default))]
    pub labels: BTreeMap<String, String>,
    pub availability: Availability,
    pub budget: Budget,
}

impl ObjectiveStatus {
    pub fn new(availability: Availability, budget: Budget) -> Self {
        Self {
            labels: BTreeMap::new(),
            availability,
            budget,
        }
    }
}

/// Achieved availability over the objective window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Availability {
    /// Number of bad events.
    pub errors: f64,
    /// Number of events.
    pub total: f64,
    /// Ratio of good events, between 0 and 1.
    pub percentage: f64,
}

impl Availability {
    /// Whether the achieved ratio beats the objective target.
    ///
    /// Meeting the target exactly does not count.
    pub fn meets(&self, target: f64) -> bool {
        self.percentage > target
    }
}

/// Error budget left in the objective window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Budget {
    /// Fraction of the budget still available. Negative once the budget is
    /// exhausted.
    pub remaining: f64,
}

impl Budget {
    pub fn has_remaining(&self) -> bool {
        self.remaining > 0.0
    }
}
