//! Application layer: command handlers, queries, and background workers.

pub mod handlers;
pub mod workers;
