//! Shared types for the repair shop workflow engine
//!
//! Common types used by the server and its clients: order states, workflow
//! rules, commands, events, snapshots, and error/response structures.

pub mod error;
pub mod order;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};
