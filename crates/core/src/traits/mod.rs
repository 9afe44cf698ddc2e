//! Core traits for external collaborators
//!
//! - `CompletionService`: natural-language completion used for confirmation copy

mod completion;

pub use completion::{CompletionError, CompletionRequest, CompletionService};
