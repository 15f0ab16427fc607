//! Model provider adapters.
//!
//! One concrete adapter speaks the Anthropic-compatible Messages wire format
//! against the MiniMax endpoint. The [`ModelProvider`] trait exists so the
//! engine (and its tests) never depend on the concrete transport.

pub mod minimax;
mod sse;
pub mod traits;
pub mod util;

pub use minimax::MiniMaxProvider;
pub use traits::{ChatRequest, ChatResponse, ModelProvider};
pub use util::resolve_api_key;
