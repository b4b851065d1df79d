//! ontorepair LLM backend
//!
//! OpenAI-compatible chat-completions client (OpenRouter, OpenAI or a local
//! server) behind the core `GenerativeBackend` trait.

pub mod client;
pub mod config;

pub use client::{build_request_body, parse_completion, ChatCompletionsBackend};
pub use config::{BackendConfig, BackendConfigError, Provider};
