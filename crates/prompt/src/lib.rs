//! Prompt system for reviewqa.
//!
//! This crate provides:
//! - Built-in system instructions for the rewrite and answer stages
//! - YAML overrides from the workspace
//! - Handlebars template rendering

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
