use serde::{Deserialize, Serialize};

/// One creative as seen during a single extraction pass.
///
/// The same creative usually shows up on many passes; `image_ref` is the key
/// used to fold those observations together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreativeObservation {
    #[serde(default)]
    pub image_ref: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub text_snippets: Vec<String>,
}

/// A unique creative accumulated across every pass of a collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedCreative {
    pub image_ref: String,
    /// First non-blank alt text observed. Never overwritten once set.
    pub alt_text: Option<String>,
    /// Deduplicated snippets in first-seen order, capped at
    /// [`crate::MAX_TEXT_SNIPPETS`].
    pub text_snippets: Vec<String>,
}

/// Response body of one extraction pass returned by the browser function.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub creatives: Vec<CreativeObservation>,
}
