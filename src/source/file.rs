//! File-backed objectives API.
//!
//! Answers lookups from a JSON responses file, which is re-read on every
//! request so edits show up on the next subscription.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ObjectivesApi;
use crate::error::FetchError;
use slowatch_types::{Objective, ObjectiveStatus};

/// Canned backend responses, keyed by selector expression.
///
/// ```json
/// {
///   "objectives": { "{__name__=\"http_requests\"}": [ { "name": "http_requests", "target": 0.99, "window": "4w" } ] },
///   "objective_errors": { "{__name__=\"broken\"}": "backend unavailable" },
///   "status": [
///     { "expr": "{__name__=\"http_requests\"}", "statuses": [ ... ] },
///     { "expr": "{__name__=\"flaky\"}", "error": "connection reset" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Responses {
    /// Objectives returned for each selector. Unknown selectors match nothing.
    pub objectives: BTreeMap<String, Vec<Objective>>,

    /// Selectors whose lookup fails with the given message.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub objective_errors: BTreeMap<String, String>,

    /// Status responses. Unknown selector/grouping pairs are reported as not found.
    pub status: Vec<StatusResponse>,
}

/// Status response for one selector and grouping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    pub expr: String,
    #[serde(default)]
    pub grouping: String,
    #[serde(default)]
    pub statuses: Vec<ObjectiveStatus>,
    /// When set, the query fails with this message instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Responses {
    /// Answer an objective lookup.
    pub fn objectives_for(&self, expr: &str) -> Result<Vec<Objective>, FetchError> {
        if let Some(message) = self.objective_errors.get(expr) {
            return Err(FetchError::Transport(message.clone()));
        }
        Ok(self.objectives.get(expr).cloned().unwrap_or_default())
    }

    /// Answer a status query.
    pub fn status_for(&self, expr: &str, grouping: &str) -> Result<Vec<ObjectiveStatus>, FetchError> {
        let response = self
            .status
            .iter()
            .find(|s| s.expr == expr && s.grouping == grouping)
            .ok_or_else(|| FetchError::NotFound(format!("no status for {}", expr)))?;

        match &response.error {
            Some(message) => Err(FetchError::Transport(message.clone())),
            None => Ok(response.statuses.clone()),
        }
    }
}

/// An [`ObjectivesApi`] that answers from a JSON responses file.
#[derive(Debug)]
pub struct FileApi {
    path: PathBuf,
    description: String,
}

impl FileApi {
    /// Create a new file-backed API for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being served.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file.
    async fn load(&self) -> Result<Responses, FetchError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            warn!("Failed to read {}: {}", self.path.display(), e);
            FetchError::from(e)
        })?;
        serde_json::from_str(&content).map_err(|e| {
            warn!("Failed to parse {}: {}", self.path.display(), e);
            FetchError::from(e)
        })
    }
}

#[async_trait]
impl ObjectivesApi for FileApi {
    async fn list_objectives(&self, expr: &str) -> Result<Vec<Objective>, FetchError> {
        let objectives = self.load().await?.objectives_for(expr)?;
        debug!("Lookup of {} matched {} objectives", expr, objectives.len());
        Ok(objectives)
    }

    async fn objective_status(
        &self,
        expr: &str,
        grouping: &str,
    ) -> Result<Vec<ObjectiveStatus>, FetchError> {
        self.load().await?.status_for(expr, grouping)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
