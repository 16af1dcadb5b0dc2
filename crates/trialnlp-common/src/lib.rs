//! trialnlp-common: Shared records, errors, configuration and export used across all TrialNLP crates.

pub mod error;
pub mod entities;
pub mod config;
pub mod sandbox;
pub mod export;

// Re-export commonly used types
pub use entities::{EntityMention, LabelGroup, RawStudy, Trial};
pub use error::{Result, TrialNlpError};
