//! HTTP surface of the relay

mod handler;
pub mod server;

pub use server::{build_http_client, build_router, run_server, AppState};
