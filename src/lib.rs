//! Taskflow: a project tracker with sections, ordered tasks and links,
//! served as a JSON HTTP API over SQLite.
//!
//! This module exports the core components for testing and integration.

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
pub mod validate;
