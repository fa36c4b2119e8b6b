//! Prompt template library: one template per report facet and chat intent.

pub mod context;
pub mod error;
pub mod render;
pub mod template;

pub use context::{fields, format_history, summarize_prior_analysis, ContextFields};
pub use error::TemplateError;
pub use render::{render, render_named, INTENT_LABELS};
pub use template::{GenerationDefaults, TemplateId};
