//! Embedding providers.
//!
//! One provider is built at startup and shared by ingestion and retrieval,
//! so both sides always embed with the same function.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
