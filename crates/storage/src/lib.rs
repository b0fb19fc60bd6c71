//! Storage layer for Library Desk
//!
//! This crate provides the client-side persisted key-value store that holds
//! the authentication token and the cached user profile between runs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod kv;

pub use kv::{KvConfig, KvError, KvStore, ScopedStore};
