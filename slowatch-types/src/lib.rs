//! # slowatch-types
//!
//! Core types for SLO dashboards. This crate defines the records exchanged
//! with an objectives backend and the duration codec used for windows and
//! time ranges.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for JSON and friends
//! - **Exact durations**: Durations are integer milliseconds, formatted the way
//!   Prometheus formats them (`1d12h`, `4w`, `90d`)
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: Serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use slowatch_types::{parse_duration, Milliseconds};
//!
//! let window: Milliseconds = "4w".parse().unwrap();
//! assert_eq!(window, Milliseconds::from_days(28));
//! assert_eq!(window.to_string(), "4w");
//!
//! // Non-canonical input is accepted but formats canonically.
//! let minute = parse_duration("60s").unwrap();
//! assert_eq!(minute.to_string(), "1m");
//!
//! assert!(parse_duration("1h1d").is_err());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod duration;
mod objective;
mod status;

pub use duration::*;
pub use objective::*;
pub use status::*;
