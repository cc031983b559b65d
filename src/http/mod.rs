//! HTTP surface for the configuration service.

pub mod server;

pub use server::{AppState, build_router, start_server};
