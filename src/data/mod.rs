//! Data models and processing for the objective detail page.
//!
//! ## Submodules
//!
//! - [`status`]: Resolution of the two fetches into [`ObjectiveState`] and
//!   [`StatusState`], and the combined [`DetailView`]
//! - [`promql`]: PromQL behind the detail graphs ([`Queries`])
//! - [`timerange`]: Time range presets and tick formatting
//!
//! ## Data Flow
//!
//! ```text
//! list_objectives(expr)           objective_status(expr, grouping)
//!        │                                  │
//!        ▼                                  ▼
//! ObjectiveState::resolve()          StatusState::resolve()
//!        │                                  │
//!        └──────────▶ DetailView::compose() ◀┘
//! ```

pub mod promql;
pub mod status;
pub mod timerange;

pub use promql::Queries;
pub use status::{label_badges, DetailView, Health, ObjectiveState, StatusState};
pub use timerange::{date_formatter, format_timestamp, DEFAULT_TIME_RANGE, TIME_RANGE_PRESETS};
