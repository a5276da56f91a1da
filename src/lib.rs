//! chat-relay: HTTP relay in front of a hosted chat completion API
//!
//! Features:
//! - Stateless chat turns; the caller carries the history
//! - Optional web search snippets folded into the system prompt
//! - Incremental text relay of streaming completions
//! - Image generation pass-through

pub mod api;
pub mod config;
pub mod error;
pub mod image;
pub mod prompt;
pub mod proxy;
pub mod request_log;
pub mod search;
pub mod upstream;

pub use config::{AppConfig, Secrets};
pub use error::ServiceError;
pub use proxy::{build_router, run_server, AppState};
