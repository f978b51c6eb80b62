//! # docmill-llm
//!
//! Language-model backends used for unit summaries and image captions.
//!
//! ## Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ChatCompletionsBackend`] | OpenAI-compatible `/chat/completions` client (Groq by default) |
//! | [`BackendPool`] | Bounds in-flight calls and chunks long text before summarizing |
//! | [`NoopBackend`] | Deterministic offline backend for tests and dry runs |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docmill_llm::{BackendPool, ChatCompletionsBackend, ChatCompletionsConfig};
//! use std::sync::Arc;
//!
//! let backend = ChatCompletionsBackend::new(ChatCompletionsConfig::groq(api_key, "llama3-8b-8192"))?;
//! let pool = BackendPool::new(Arc::new(backend), 4, 500);
//! let summary = pool.summarize("A long page of text ...").await?;
//! ```

pub mod client;
pub mod noop;
pub mod pool;

pub use client::{data_url, ChatCompletionsBackend, ChatCompletionsConfig, DEFAULT_BASE_URL};
pub use noop::NoopBackend;
pub use pool::BackendPool;
