//! Shared domain model and configuration for Market Genome.
//!
//! Holds the brand, report and conversation types that every other crate
//! passes around, the validation rules applied before any provider call,
//! and environment-driven application configuration.

pub mod app_config;
pub mod brand;
pub mod config;
pub mod conversation;
pub mod error;
pub mod report;

pub use app_config::{AppConfig, Environment, IntentStrategy};
pub use brand::{
    brand_key, validate_identifier, BrandContext, BrandInputKind, BrandMetadata, SocialPlatform,
    WebsiteSnapshot,
};
pub use config::{load_app_config, load_app_config_from_env, MAX_PIPELINE_CONCURRENCY};
pub use conversation::{validate_email, validate_message_text, ImageRef, Message, Role};
pub use error::{ConfigError, ValidationError};
pub use report::{AnalysisFacet, FacetFailure, FacetKind, FacetOutcome, FailureKind, Report};
