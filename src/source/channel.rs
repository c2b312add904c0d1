//! Channel-backed objectives API.
//!
//! Each request is forwarded over a tokio channel together with a reply
//! handle. Whoever owns the receiving end decides what to answer and when,
//! which makes this the integration point for backends that push answers
//! (and for tests that need to control completion order).

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::ObjectivesApi;
use crate::error::FetchError;
use slowatch_types::{Objective, ObjectiveStatus};

/// A request waiting for an answer.
#[derive(Debug)]
pub enum Request {
    /// An objective lookup.
    Objectives {
        expr: String,
        reply: oneshot::Sender<Result<Vec<Objective>, FetchError>>,
    },
    /// A status query.
    Status {
        expr: String,
        grouping: String,
        reply: oneshot::Sender<Result<Vec<ObjectiveStatus>, FetchError>>,
    },
}

impl Request {
    /// The selector expression of the request.
    pub fn expr(&self) -> &str {
        match self {
            Request::Objectives { expr, .. } | Request::Status { expr, .. } => expr,
        }
    }
}

/// An [`ObjectivesApi`] whose answers come from the other end of a channel.
///
/// # Example
///
/// ```
/// use slowatch::{ChannelApi, ObjectivesApi, Request};
///
/// # tokio_test::block_on(async {
/// let (mut requests, api) = ChannelApi::create("test backend");
///
/// let backend = tokio::spawn(async move {
///     if let Some(Request::Objectives { reply, .. }) = requests.recv().await {
///         let _ = reply.send(Ok(Vec::new()));
///     }
/// });
///
/// let objectives = api.list_objectives("{}").await.unwrap();
/// assert!(objectives.is_empty());
/// backend.await.unwrap();
/// # });
/// ```
#[derive(Debug)]
pub struct ChannelApi {
    sender: mpsc::UnboundedSender<Request>,
    description: String,
}

impl ChannelApi {
    /// Create a new channel API.
    ///
    /// # Arguments
    ///
    /// * `sender` - Where requests are forwarded to
    /// * `backend_description` - A description of who answers the requests
    pub fn new(sender: mpsc::UnboundedSender<Request>, backend_description: &str) -> Self {
        let description = format!("channel: {}", backend_description);
        Self {
            sender,
            description,
        }
    }

    /// Create a channel pair.
    ///
    /// Returns (receiver, api) where the receiver yields every request made
    /// through the api.
    pub fn create(backend_description: &str) -> (mpsc::UnboundedReceiver<Request>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (rx, Self::new(tx, backend_description))
    }

    async fn ask<T>(
        &self,
        request: Request,
        reply: oneshot::Receiver<Result<T, FetchError>>,
    ) -> Result<T, FetchError> {
        self.sender
            .send(request)
            .map_err(|_| FetchError::Transport("Backend disconnected".to_string()))?;
        reply
            .await
            .map_err(|_| FetchError::Transport("Request dropped without a reply".to_string()))?
    }
}

#[async_trait]
impl ObjectivesApi for ChannelApi {
    async fn list_objectives(&self, expr: &str) -> Result<Vec<Objective>, FetchError> {
        let (reply, rx) = oneshot::channel();
        let request = Request::Objectives {
            expr: expr.to_string(),
            reply,
        };
        self.ask(request, rx).await
    }

    async fn objective_status(
        &self,
        expr: &str,
        grouping: &str,
    ) -> Result<Vec<ObjectiveStatus>, FetchError> {
        let (reply, rx) = oneshot::channel();
        let request = Request::Status {
            expr: expr.to_string(),
            grouping: grouping.to_string(),
            reply,
        };
        self.ask(request, rx).await
    }

    fn description(&self) -> &str {
        &self.description
    }
}
