//! Application state for Library Desk
//!
//! This crate holds the state shared between the services and the
//! presentation layer: the explicit session context, the load generation
//! guard, and the dashboard state cell.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dashboard;
pub mod generation;
pub mod session;

pub use dashboard::{DashboardState, LoadStatus};
pub use generation::{LoadGeneration, LoadTicket};
pub use session::{AccessError, LandingView, SessionContext};
