//! Completion service adapters
//!
//! HTTP clients implementing `CompletionService`. Only used for friendly
//! confirmation copy; callers always hold a static fallback.

pub mod ollama;

pub use ollama::{OllamaCompletionService, OllamaConfig};
