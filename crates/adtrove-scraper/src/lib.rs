pub mod browserless;
pub mod collector;
pub mod error;
pub mod identifier;
pub(crate) mod rate_limit;
pub mod snippets;
pub mod types;

pub use browserless::{BrowserlessConfig, BrowserlessSession};
pub use collector::{
    CollectionSummary, CollectorConfig, CreativeCollector, PageSession, StopReason,
};
pub use error::ScraperError;
pub use identifier::derive_ad_identifier;
pub use snippets::{merge_snippets, merge_snippets_into, normalize_snippet, MAX_TEXT_SNIPPETS};
pub use types::{CollectedCreative, CreativeObservation};
