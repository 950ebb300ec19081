#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation engine for the performance dashboard.
//!
//! [`engine`] reduces a record set and a filter into KPI metrics, district
//! comparisons, monthly trends, and the leaderboard. It is pure and does no
//! I/O. [`state`] wraps it in an observable store, and [`sequence`]
//! provides last-request-wins ordering for async reloads and AI calls.

pub mod engine;
pub mod sequence;
pub mod state;

pub use engine::project;
pub use sequence::{RequestSequencer, Ticket};
pub use state::DashboardStore;
