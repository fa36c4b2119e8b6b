//! Brand resolution and the report analysis pipeline.

pub mod cache;
pub mod error;
mod parse;
pub mod pipeline;
pub mod resolver;
pub mod service;

pub use cache::ReportCache;
pub use error::{FetchError, PipelineError};
pub use pipeline::{AnalysisPipeline, PipelineSettings};
pub use resolver::{extract_snapshot, fetch_snapshot, BrandResolver};
pub use service::GenomeAnalyzer;
