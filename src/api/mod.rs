//! JSON HTTP API.
//!
//! Resource handlers live in one module per resource; `server` assembles the
//! router and owns the listener lifecycle.

mod links;
mod projects;
mod sections;
mod server;
mod tasks;

pub use server::{ApiState, ServerHandle, build_router, start_server};
