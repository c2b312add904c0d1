//! # slowatch
//!
//! Status resolution for service level objective detail pages.
//!
//! A detail page is identified by a selector expression, an optional grouping
//! and a time range. Opening it asks a backend two questions at once: which
//! objective the selector refers to, and what that objective's status is. The
//! answers can arrive in any order, and the page may have moved on to another
//! selector by the time they do. This crate resolves the answers into what the
//! page should show and drops answers that arrive too late.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐   FetchEvent   ┌──────────┐                  │
//! │  │   app    │◀───────────────│  source  │◀── FileApi       │
//! │  │ (state)  │───subscribe───▶│ (backend)│◀── ChannelApi    │
//! │  └────┬─────┘                └──────────┘                  │
//! │       ▼                                                    │
//! │  ┌──────────┐                                              │
//! │  │   data   │  ObjectiveState, StatusState, DetailView,    │
//! │  │          │  Queries, time ranges                        │
//! │  └──────────┘                                              │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: The [`App`] controller and [`Subscription`]s
//! - **[`source`]**: Backend abstraction ([`ObjectivesApi`] trait) with file and
//!   channel implementations
//! - **[`data`]**: Status resolution, PromQL queries and time range helpers
//! - **[`config`]**: Runtime [`Settings`](crate::config::Settings)
//!
//! Durations use the codec from `slowatch-types`: `1d12h` is 36 hours, and
//! formatting gives the canonical string back.
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! slowatch parse 1d12h
//! slowatch detail --responses responses.json --expr '{__name__="http_requests"}'
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::sync::Arc;
//! use slowatch::{App, ChannelApi, DetailView, Request, Subscription};
//! use slowatch_types::{Milliseconds, Objective};
//!
//! # tokio_test::block_on(async {
//! let (mut requests, api) = ChannelApi::create("example");
//! let mut app = App::new(Arc::new(api));
//!
//! // Answer requests as they come in
//! tokio::spawn(async move {
//!     while let Some(request) = requests.recv().await {
//!         match request {
//!             Request::Objectives { reply, .. } => {
//!                 let objective = Objective::new("http_requests", 0.99, Milliseconds::from_weeks(4));
//!                 let _ = reply.send(Ok(vec![objective]));
//!             }
//!             Request::Status { reply, .. } => {
//!                 let _ = reply.send(Ok(vec![]));
//!             }
//!         }
//!     }
//! });
//!
//! let sub = Subscription::from_query(Some("{job=\"api\"}"), None, Some("1d"), Milliseconds::from_hours(1));
//! app.subscribe(sub);
//! app.settle().await;
//!
//! match app.view() {
//!     DetailView::Ready { objective, status } => {
//!         assert_eq!(objective.name, "http_requests");
//!         assert_eq!(status.label(), "No data");
//!     }
//!     other => panic!("unexpected view: {:?}", other),
//! }
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod source;

// Re-export main types for convenience
pub use app::{App, FetchEvent, FetchResult, Subscription};
pub use data::{label_badges, DetailView, Health, ObjectiveState, Queries, StatusState};
pub use error::FetchError;
pub use source::{ChannelApi, FileApi, ObjectivesApi, Request, Responses, StatusResponse};
