//! trialnlp-web: dashboard for exploring clinical trials through NER.
//! Tabs:
//!   - Studies: trial table and highlighted trial text
//!   - Heatmaps: disease × drug and disease × gene/protein co-occurrence
//!   - Trial NLP: per-trial entity types and entity table
//!   - Entities: mention counts and the full mention table
//!   - Export: CSV downloads

pub mod handlers;
pub mod render;
pub mod router;
pub mod sse;
pub mod state;
