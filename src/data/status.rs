//! Status resolution for the objective detail page.
//!
//! The page issues two independent fetches: an objective lookup and a status
//! query. Each outcome is resolved on its own into an [`ObjectiveState`] or a
//! [`StatusState`]; [`DetailView::compose`] then decides what the page shows.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::FetchError;
use slowatch_types::{Availability, Budget, Objective, ObjectiveStatus, METRIC_NAME_LABEL};

/// Resolved outcome of the objective lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ObjectiveState {
    /// Not answered yet, or the lookup did not match exactly one objective.
    ///
    /// Zero or several matches keep the page loading rather than failing, so
    /// an eventually-consistent backend can catch up.
    #[default]
    Loading,
    /// The lookup failed. The page shows this message and nothing else.
    Failed(String),
    /// Exactly one objective matched.
    Ready(Box<Objective>),
}

impl ObjectiveState {
    /// Resolve a completed objective lookup.
    pub fn resolve(outcome: Result<Vec<Objective>, FetchError>) -> Self {
        match outcome {
            Err(err) => ObjectiveState::Failed(err.to_string()),
            Ok(mut objectives) => {
                if objectives.len() == 1 {
                    ObjectiveState::Ready(Box::new(objectives.remove(0)))
                } else {
                    debug!(
                        "Objective lookup matched {} objectives, waiting for exactly one",
                        objectives.len()
                    );
                    ObjectiveState::Loading
                }
            }
        }
    }

    /// The matched objective, if any.
    pub fn objective(&self) -> Option<&Objective> {
        match self {
            ObjectiveState::Ready(objective) => Some(objective.as_ref()),
            _ => None,
        }
    }
}

/// State of the availability and error budget indicators.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusState {
    /// No answer yet for the current subscription.
    #[default]
    Unknown,
    /// The query failed, or matched several series where one was expected.
    Error,
    /// The backend has no data for the selector.
    NoData,
    /// Exactly one series matched.
    Success {
        availability: Availability,
        budget: Budget,
    },
}

impl StatusState {
    /// Resolve a completed status query.
    pub fn resolve(outcome: Result<Vec<ObjectiveStatus>, FetchError>) -> Self {
        match outcome {
            Ok(statuses) => match statuses.as_slice() {
                [] => StatusState::NoData,
                [status] => StatusState::Success {
                    availability: status.availability,
                    budget: status.budget,
                },
                _ => {
                    debug!(
                        "Status query matched {} series, expected exactly one",
                        statuses.len()
                    );
                    StatusState::Error
                }
            },
            Err(FetchError::NotFound(_)) => StatusState::NoData,
            Err(err) => {
                debug!("Status query failed: {}", err);
                StatusState::Error
            }
        }
    }

    /// Whether the query for the current subscription has been answered.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, StatusState::Unknown)
    }

    /// Returns the display label for this state.
    pub fn label(&self) -> &'static str {
        match self {
            StatusState::Unknown => "Loading",
            StatusState::Error => "Error",
            StatusState::NoData => "No data",
            StatusState::Success { .. } => "OK",
        }
    }

    pub fn availability(&self) -> Option<&Availability> {
        match self {
            StatusState::Success { availability, .. } => Some(availability),
            _ => None,
        }
    }

    pub fn budget(&self) -> Option<&Budget> {
        match self {
            StatusState::Success { budget, .. } => Some(budget),
            _ => None,
        }
    }

    /// Availability classification against the objective target.
    pub fn availability_health(&self, target: f64) -> Option<Health> {
        self.availability().map(|a| Health::from_good(a.meets(target)))
    }

    /// Error budget classification.
    pub fn budget_health(&self) -> Option<Health> {
        self.budget().map(|b| Health::from_good(b.has_remaining()))
    }
}

/// Binary classification of a successful status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Good,
    Bad,
}

impl Health {
    fn from_good(good: bool) -> Self {
        if good {
            Health::Good
        } else {
            Health::Bad
        }
    }

    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Health::Good => "good",
            Health::Bad => "bad",
        }
    }
}

/// What the detail page shows, given both resolved fetches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetailView<'a> {
    /// The objective lookup failed; the status indicators are not shown.
    ErrorPage(&'a str),
    /// The objective is not resolved yet.
    Loading,
    /// The objective is known; the indicators show `status`.
    Ready {
        objective: &'a Objective,
        status: &'a StatusState,
    },
}

impl<'a> DetailView<'a> {
    /// Combine the two resolved fetches.
    ///
    /// A failed lookup wins over everything, then a pending lookup; only a
    /// resolved objective lets the status indicators through.
    pub fn compose(objective: &'a ObjectiveState, status: &'a StatusState) -> Self {
        match objective {
            ObjectiveState::Failed(message) => DetailView::ErrorPage(message),
            ObjectiveState::Loading => DetailView::Loading,
            ObjectiveState::Ready(objective) => DetailView::Ready { objective, status },
        }
    }
}

/// Label badges for the detail header.
///
/// Grouping labels override objective labels with the same name. The metric
/// name label is left out since it is already the page title.
pub fn label_badges(
    objective_labels: &BTreeMap<String, String>,
    grouping_labels: &BTreeMap<String, String>,
) -> Vec<String> {
    let mut merged = objective_labels.clone();
    merged.extend(grouping_labels.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
        .iter()
        .filter(|(name, _)| name.as_str() != METRIC_NAME_LABEL)
        .map(|(name, value)| format!("{}={}", name, value))
        .collect()
}
