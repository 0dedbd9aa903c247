#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Selection-driven view state machines for the survey dashboard.
//!
//! No rendering happens here. Each view is modeled as the state a
//! renderer would read: the held statistics snapshot or table page,
//! a lifecycle phase, and the merge rule applied when fresh data
//! arrives. The [`dashboard::Dashboard`] wires the concrete view set
//! to a shared neighborhood selection and drives refetches through
//! the [`StatisticsSource`](civic_panel_survey::StatisticsSource)
//! seam.
//!
//! Overlapping fetches are resolved by generation token, not by
//! cancellation: every outgoing fetch is stamped, and only the result
//! of the latest stamp per view is merged. Fetch failures surface as
//! one transient notification each, through [`notify::Notifier`].

pub mod dashboard;
pub mod generation;
pub mod notify;
pub mod snapshot_view;
pub mod table;
