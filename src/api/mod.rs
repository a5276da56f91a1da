//! Wire types: the relay's own HTTP surface and the OpenAI-compatible upstream

mod chat;
mod openai;

pub use chat::*;
pub use openai::*;
