//! Core application logic for Library Desk
//!
//! This crate contains the business logic behind each view: the dashboard
//! aggregation engine, catalog browsing and editing, the user directory,
//! and the student circulation desk.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod circulation;
pub mod dashboard;
pub mod users;

pub use dashboard::{DashboardConfig, DashboardService, DashboardSource, DashboardView};
