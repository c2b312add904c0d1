//! Detail page state and subscription handling.
//!
//! An [`App`] tracks one [`Subscription`] at a time. Subscribing starts the
//! objective lookup and the status query concurrently; their completions come
//! back as [`FetchEvent`]s tagged with the generation of the subscription that
//! started them. Completions from an earlier generation are dropped, so a slow
//! answer for a previous selector never overwrites the current page.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::data::{DetailView, ObjectiveState, StatusState};
use crate::error::FetchError;
use crate::source::ObjectivesApi;
use slowatch_types::{parse_duration, Milliseconds, Objective, ObjectiveStatus};

/// The inputs identifying what the detail page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Selector expression of the objective.
    pub expr: String,
    /// Grouping expression, empty for none.
    pub grouping: String,
    /// Time range of the graphs.
    pub time_range: Milliseconds,
}

impl Subscription {
    pub fn new(expr: impl Into<String>, grouping: impl Into<String>, time_range: Milliseconds) -> Self {
        Self {
            expr: expr.into(),
            grouping: grouping.into(),
            time_range,
        }
    }

    /// Build a subscription from query parameters.
    ///
    /// Missing `expr` and `grouping` are empty. A missing, empty or invalid
    /// `timerange` falls back to `default`.
    ///
    /// ```
    /// use slowatch::Subscription;
    /// use slowatch_types::Milliseconds;
    ///
    /// let hour = Milliseconds::from_hours(1);
    /// let sub = Subscription::from_query(Some("{job=\"api\"}"), None, Some("1d12h"), hour);
    /// assert_eq!(sub.time_range, Milliseconds::from_hours(36));
    ///
    /// let sub = Subscription::from_query(None, None, Some("12x"), hour);
    /// assert_eq!(sub.time_range, hour);
    /// ```
    pub fn from_query(
        expr: Option<&str>,
        grouping: Option<&str>,
        timerange: Option<&str>,
        default: Milliseconds,
    ) -> Self {
        let time_range = match timerange.map(parse_duration) {
            Some(Ok(time_range)) => time_range,
            Some(Err(err)) => {
                warn!("Ignoring timerange: {}, using {}", err, default);
                default
            }
            None => default,
        };
        Self::new(expr.unwrap_or_default(), grouping.unwrap_or_default(), time_range)
    }

    /// The same selector and grouping over a different time range.
    pub fn with_time_range(&self, time_range: Milliseconds) -> Self {
        Self {
            time_range,
            ..self.clone()
        }
    }

    /// The time range encoded for a query string.
    pub fn timerange_param(&self) -> String {
        self.time_range.to_string()
    }
}

/// Outcome of one of the two fetches.
#[derive(Debug)]
pub enum FetchResult {
    Objectives(Result<Vec<Objective>, FetchError>),
    Status(Result<Vec<ObjectiveStatus>, FetchError>),
}

/// A fetch completion, tagged with the subscription generation that issued it.
#[derive(Debug)]
pub struct FetchEvent {
    pub generation: u64,
    pub result: FetchResult,
}

/// Run one fetch and report its outcome as a [`FetchEvent`].
///
/// The fetch runs in its own task so that a panicking backend still produces
/// a completion, as a transport failure.
fn spawn_fetch<T, F>(
    tx: mpsc::UnboundedSender<FetchEvent>,
    generation: u64,
    fetch: F,
    wrap: fn(Result<T, FetchError>) -> FetchResult,
) where
    T: Send + 'static,
    F: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    tokio::spawn(async move {
        let outcome = match tokio::spawn(fetch).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Fetch for generation {} failed: {}", generation, err);
                Err(FetchError::Transport(format!("Fetch failed: {}", err)))
            }
        };
        // The receiver lives in the App; if it is gone nobody is waiting.
        let _ = tx.send(FetchEvent {
            generation,
            result: wrap(outcome),
        });
    });
}

/// Main application state.
pub struct App {
    api: Arc<dyn ObjectivesApi>,
    subscription: Option<Subscription>,
    generation: u64,

    events_tx: mpsc::UnboundedSender<FetchEvent>,
    events_rx: mpsc::UnboundedReceiver<FetchEvent>,

    objective: ObjectiveState,
    status: StatusState,
    objective_applied: bool,
    status_applied: bool,
}

impl App {
    /// Create a new App asking the given backend.
    pub fn new(api: Arc<dyn ObjectivesApi>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            api,
            subscription: None,
            generation: 0,
            events_tx,
            events_rx,
            objective: ObjectiveState::default(),
            status: StatusState::default(),
            objective_applied: false,
            status_applied: false,
        }
    }

    /// Returns a description of the backend.
    pub fn source_description(&self) -> &str {
        self.api.description()
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// Number of subscriptions started so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn objective(&self) -> &ObjectiveState {
        &self.objective
    }

    pub fn status(&self) -> &StatusState {
        &self.status
    }

    /// Switch to a new subscription.
    ///
    /// Resets both states and issues the objective lookup and status query.
    /// Returns false without doing anything if `subscription` is the current
    /// one. Must be called from within a tokio runtime.
    pub fn subscribe(&mut self, subscription: Subscription) -> bool {
        if self.subscription.as_ref() == Some(&subscription) {
            return false;
        }

        self.generation += 1;
        let generation = self.generation;
        info!(
            "Subscribing to {} (grouping {:?}, range {}), generation {}",
            subscription.expr, subscription.grouping, subscription.time_range, generation
        );

        self.objective = ObjectiveState::Loading;
        self.status = StatusState::Unknown;
        self.objective_applied = false;
        self.status_applied = false;

        let api = Arc::clone(&self.api);
        let expr = subscription.expr.clone();
        spawn_fetch(
            self.events_tx.clone(),
            generation,
            async move { api.list_objectives(&expr).await },
            FetchResult::Objectives,
        );

        let api = Arc::clone(&self.api);
        let expr = subscription.expr.clone();
        let grouping = subscription.grouping.clone();
        spawn_fetch(
            self.events_tx.clone(),
            generation,
            async move { api.objective_status(&expr, &grouping).await },
            FetchResult::Status,
        );

        self.subscription = Some(subscription);
        true
    }

    /// Apply a fetch completion.
    ///
    /// Returns false if the completion belongs to a superseded subscription
    /// and was discarded.
    pub fn apply(&mut self, event: FetchEvent) -> bool {
        if event.generation != self.generation {
            debug!(
                "Discarding stale completion from generation {} (current {})",
                event.generation, self.generation
            );
            return false;
        }

        match event.result {
            FetchResult::Objectives(outcome) => {
                self.objective = ObjectiveState::resolve(outcome);
                self.objective_applied = true;
                debug!("Objective lookup resolved: {:?}", self.objective);
            }
            FetchResult::Status(outcome) => {
                self.status = StatusState::resolve(outcome);
                self.status_applied = true;
                debug!("Status resolved: {}", self.status.label());
            }
        }
        true
    }

    /// Apply every completion that has already arrived, without waiting.
    ///
    /// Returns true if the state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            changed |= self.apply(event);
        }
        changed
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns false if it was stale.
    pub async fn next_update(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => self.apply(event),
            None => false,
        }
    }

    /// Wait until both fetches of the current subscription have been applied.
    pub async fn settle(&mut self) {
        if self.subscription.is_none() {
            return;
        }
        while !self.is_settled() {
            self.next_update().await;
        }
    }

    /// Whether both fetches of the current subscription have been applied.
    pub fn is_settled(&self) -> bool {
        self.objective_applied && self.status_applied
    }

    /// What the page shows right now.
    pub fn view(&self) -> DetailView<'_> {
        DetailView::compose(&self.objective, &self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChannelApi, Request};
    use slowatch_types::{Availability, Budget};
    use tokio::sync::oneshot;

    type ObjectivesReply = oneshot::Sender<Result<Vec<Objective>, FetchError>>;
    type StatusReply = oneshot::Sender<Result<Vec<ObjectiveStatus>, FetchError>>;

    struct Pending {
        expr: String,
        objectives: ObjectivesReply,
        status: StatusReply,
    }

    /// Collect the two requests issued by one subscription.
    async fn take_pending(requests: &mut mpsc::UnboundedReceiver<Request>) -> Pending {
        let mut expr = String::new();
        let mut objectives = None;
        let mut status = None;
        for _ in 0..2 {
            match requests.recv().await.unwrap() {
                Request::Objectives { expr: e, reply } => {
                    expr = e;
                    objectives = Some(reply);
                }
                Request::Status { reply, .. } => status = Some(reply),
            }
        }
        Pending {
            expr,
            objectives: objectives.unwrap(),
            status: status.unwrap(),
        }
    }

    fn objective(name: &str) -> Objective {
        Objective::new(name, 0.99, Milliseconds::from_weeks(4))
    }

    fn status(percentage: f64) -> ObjectiveStatus {
        ObjectiveStatus::new(
            Availability {
                errors: 1.0,
                total: 100.0,
                percentage,
            },
            Budget { remaining: 0.25 },
        )
    }

    fn sub(expr: &str) -> Subscription {
        Subscription::new(expr, "", Milliseconds::from_hours(1))
    }

    fn app() -> (mpsc::UnboundedReceiver<Request>, App) {
        let (requests, api) = ChannelApi::create("test");
        (requests, App::new(Arc::new(api)))
    }

    #[test]
    fn test_subscription_from_query_defaults() {
        let default = Milliseconds::from_hours(1);
        let sub = Subscription::from_query(None, None, None, default);
        assert_eq!(sub, Subscription::new("", "", default));

        let sub = Subscription::from_query(Some("{a=\"b\"}"), Some("{c=\"d\"}"), Some(""), default);
        assert_eq!(sub.expr, "{a=\"b\"}");
        assert_eq!(sub.grouping, "{c=\"d\"}");
        assert_eq!(sub.time_range, default);

        let sub = Subscription::from_query(None, None, Some("0"), default);
        assert_eq!(sub.time_range, Milliseconds::ZERO);
    }

    #[test]
    fn test_subscription_time_range_param() {
        let sub = sub("{}").with_time_range(Milliseconds::from_weeks(4));
        assert_eq!(sub.timerange_param(), "4w");
        assert_eq!(sub.expr, "{}");
        assert_eq!(sub.with_time_range(Milliseconds::from_hours(36)).timerange_param(), "1d12h");
    }

    #[tokio::test]
    async fn test_initial_state_is_loading() {
        let (_requests, mut app) = app();
        assert_eq!(app.view(), DetailView::Loading);
        assert_eq!(*app.status(), StatusState::Unknown);
        assert!(!app.is_settled());

        // Nothing subscribed, nothing to wait for.
        app.settle().await;
        assert!(!app.poll());
    }

    #[tokio::test]
    async fn test_resolves_objective_and_status() {
        let (mut requests, mut app) = app();
        assert!(app.subscribe(sub("{job=\"api\"}")));

        let pending = take_pending(&mut requests).await;
        assert_eq!(pending.expr, "{job=\"api\"}");
        pending.objectives.send(Ok(vec![objective("api")])).unwrap();
        pending.status.send(Ok(vec![status(0.995)])).unwrap();

        app.settle().await;
        match app.view() {
            DetailView::Ready { objective, status } => {
                assert_eq!(objective.name, "api");
                assert_eq!(status.availability().map(|a| a.percentage), Some(0.995));
            }
            other => panic!("expected ready view, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_late_answer_for_previous_subscription_is_discarded() {
        let (mut requests, mut app) = app();

        app.subscribe(sub("a"));
        let first = take_pending(&mut requests).await;
        app.subscribe(sub("b"));
        let second = take_pending(&mut requests).await;
        assert_eq!(first.expr, "a");
        assert_eq!(second.expr, "b");

        second.objectives.send(Ok(vec![objective("b")])).unwrap();
        second.status.send(Ok(vec![])).unwrap();
        app.settle().await;

        first.objectives.send(Ok(vec![objective("a")])).unwrap();
        first.status.send(Ok(vec![status(0.5)])).unwrap();
        assert!(!app.next_update().await);
        assert!(!app.next_update().await);

        assert_eq!(app.objective().objective().map(|o| o.name.as_str()), Some("b"));
        assert_eq!(*app.status(), StatusState::NoData);
    }

    #[tokio::test]
    async fn test_early_answer_for_previous_subscription_is_discarded() {
        let (mut requests, mut app) = app();

        app.subscribe(sub("a"));
        let first = take_pending(&mut requests).await;
        app.subscribe(sub("b"));
        let second = take_pending(&mut requests).await;

        first
            .objectives
            .send(Err(FetchError::Transport("boom".to_string())))
            .unwrap();
        first.status.send(Ok(vec![status(0.5)])).unwrap();
        assert!(!app.next_update().await);
        assert!(!app.next_update().await);
        assert_eq!(app.view(), DetailView::Loading);
        assert_eq!(*app.status(), StatusState::Unknown);

        second.objectives.send(Ok(vec![objective("b")])).unwrap();
        second.status.send(Ok(vec![status(0.9), status(0.8)])).unwrap();
        app.settle().await;

        assert_eq!(app.objective().objective().map(|o| o.name.as_str()), Some("b"));
        assert_eq!(*app.status(), StatusState::Error);
    }

    #[tokio::test]
    async fn test_ambiguous_lookup_keeps_loading() {
        let (mut requests, mut app) = app();
        app.subscribe(sub("{}"));

        let pending = take_pending(&mut requests).await;
        pending
            .objectives
            .send(Ok(vec![objective("a"), objective("b")]))
            .unwrap();
        pending.status.send(Ok(vec![status(0.999)])).unwrap();
        app.settle().await;

        assert!(app.is_settled());
        assert_eq!(app.view(), DetailView::Loading);
    }

    #[tokio::test]
    async fn test_failed_lookup_shows_error_page() {
        let (mut requests, mut app) = app();
        app.subscribe(sub("{}"));

        let pending = take_pending(&mut requests).await;
        pending
            .objectives
            .send(Err(FetchError::Transport("connection refused".to_string())))
            .unwrap();
        pending.status.send(Ok(vec![status(0.999)])).unwrap();
        app.settle().await;

        assert_eq!(app.view(), DetailView::ErrorPage("connection refused"));
    }

    #[tokio::test]
    async fn test_same_subscription_is_noop() {
        let (mut requests, mut app) = app();
        assert!(app.subscribe(sub("a")));
        let pending = take_pending(&mut requests).await;
        pending.objectives.send(Ok(vec![objective("a")])).unwrap();
        pending.status.send(Ok(vec![])).unwrap();
        app.settle().await;

        assert!(!app.subscribe(sub("a")));
        assert_eq!(app.generation(), 1);
        assert!(app.is_settled());
        assert!(requests.try_recv().is_err());

        // A different time range is a new subscription.
        assert!(app.subscribe(sub("a").with_time_range(Milliseconds::from_days(1))));
        assert_eq!(app.generation(), 2);
        assert!(!app.is_settled());
        assert_eq!(*app.status(), StatusState::Unknown);
    }

    #[derive(Debug)]
    struct PanickingApi;

    #[async_trait::async_trait]
    impl ObjectivesApi for PanickingApi {
        async fn list_objectives(&self, _expr: &str) -> Result<Vec<Objective>, FetchError> {
            panic!("backend bug");
        }

        async fn objective_status(
            &self,
            _expr: &str,
            _grouping: &str,
        ) -> Result<Vec<ObjectiveStatus>, FetchError> {
            panic!("backend bug");
        }

        fn description(&self) -> &str {
            "panicking"
        }
    }

    #[tokio::test]
    async fn test_panicking_backend_settles_as_failure() {
        let mut app = App::new(Arc::new(PanickingApi));
        app.subscribe(sub("{}"));

        let settled = tokio::time::timeout(std::time::Duration::from_secs(5), app.settle()).await;
        assert!(settled.is_ok());
        assert!(app.is_settled());

        match app.view() {
            DetailView::ErrorPage(message) => assert!(message.starts_with("Fetch failed")),
            other => panic!("expected error page, got {:?}", other),
        }
        assert_eq!(*app.status(), StatusState::Error);
    }

    #[tokio::test]
    async fn test_apply_ignores_other_generations() {
        let (_requests, mut app) = app();
        app.subscribe(sub("a"));

        let stale = FetchEvent {
            generation: 0,
            result: FetchResult::Status(Ok(vec![])),
        };
        assert!(!app.apply(stale));
        assert_eq!(*app.status(), StatusState::Unknown);

        let current = FetchEvent {
            generation: app.generation(),
            result: FetchResult::Status(Err(FetchError::NotFound("gone".to_string()))),
        };
        assert!(app.apply(current));
        assert_eq!(*app.status(), StatusState::NoData);
    }
}
