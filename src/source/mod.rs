//! Backend abstraction for objective lookups and status queries.
//!
//! The detail page needs two independent answers from the backend: which
//! objective a selector refers to, and what that objective's current status
//! is. This module provides a trait for asking both questions plus in-process
//! implementations backed by a responses file or a channel.

mod channel;
mod file;

pub use channel::{ChannelApi, Request};
pub use file::{FileApi, Responses, StatusResponse};

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::FetchError;
use slowatch_types::{Objective, ObjectiveStatus};

/// Trait for answering objective lookups and status queries.
///
/// Both methods may be in flight at the same time and may complete in any
/// order; callers must not assume one finishes before the other.
///
/// # Example
///
/// ```no_run
/// use slowatch::{FileApi, ObjectivesApi};
///
/// # tokio_test::block_on(async {
/// let api = FileApi::new("responses.json");
/// let objectives = api.list_objectives(r#"{__name__="http_requests"}"#).await;
/// if let Ok(objectives) = objectives {
///     println!("{} matching objectives", objectives.len());
/// }
/// # });
/// ```
#[async_trait]
pub trait ObjectivesApi: Send + Sync + Debug {
    /// List the objectives matching a selector expression.
    ///
    /// Zero or several matches are not an error at this level.
    async fn list_objectives(&self, expr: &str) -> Result<Vec<Objective>, FetchError>;

    /// Query the status of the objectives matching a selector, optionally
    /// split by a grouping expression (empty for none).
    async fn objective_status(
        &self,
        expr: &str,
        grouping: &str,
    ) -> Result<Vec<ObjectiveStatus>, FetchError>;

    /// Returns a human-readable description of the backend.
    fn description(&self) -> &str;
}
