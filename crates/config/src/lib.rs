//! Configuration for the expense agent
//!
//! Locale data (lexicon, category taxonomy, prompt templates) and runtime
//! tuning. Everything locale-specific is data and can be swapped from a
//! settings file.

pub mod constants;
pub mod lexicon;
pub mod prompts;
pub mod settings;
pub mod taxonomy;

pub use lexicon::{LexiconConfig, PaymentKeywords};
pub use prompts::{format_options, render, PromptTemplates, SlotQuestions};
pub use settings::{AgentSettings, CompletionSettings, ConfigError, DialogueSettings, ENV_PREFIX};
pub use taxonomy::{CategoryCorrection, CategoryRule, CategoryTaxonomy};
