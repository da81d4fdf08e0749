//! Optional AI enrichment for collected ad creatives.
//!
//! A [`Describer`] turns an ad image into a short description; the
//! orchestrator calls it once per creative and attaches the result as a
//! `summary` insight. [`OpenAiDescriber`] talks to any OpenAI-compatible
//! chat-completions endpoint that accepts `image_url` content parts.

pub mod describer;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod types;

pub use describer::Describer;
pub use error::EnrichError;
pub use openai::OpenAiDescriber;
pub use orchestrator::{enrich_creatives, EnrichOptions};
pub use types::{Description, EnrichConfig, EnrichedCreative, GeneratedInsight};
