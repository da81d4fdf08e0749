//! Incremental collection of creatives from a lazily-loaded page.
//!
//! A [`CreativeCollector`] repeatedly asks a [`PageSession`] for the
//! creatives currently rendered, folds each pass into an arena keyed by image
//! reference, and stops once passes stop turning up new creatives.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;
use crate::snippets::{merge_snippets_into, normalize_snippet, MAX_TEXT_SNIPPETS};
use crate::types::{CollectedCreative, CreativeObservation};

pub const DEFAULT_MAX_PASSES: usize = 25;
pub const DEFAULT_STAGNANT_THRESHOLD: usize = 3;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1_500;
pub const DEFAULT_PASS_TIMEOUT_SECS: u64 = 60;

/// A page that can be scraped repeatedly while more content is loaded.
#[async_trait]
pub trait PageSession: Send {
    /// Returns every creative currently visible on the page.
    async fn extract(&mut self) -> Result<Vec<CreativeObservation>, ScraperError>;

    /// Asks the page to load further content (scroll, click "see more").
    async fn load_more(&mut self) -> Result<(), ScraperError>;
}

#[derive(Debug, Clone, Copy)]
pub struct CollectorConfig {
    pub max_passes: usize,
    /// Consecutive passes without a new creative before stopping.
    pub stagnant_threshold: usize,
    pub settle_delay: Duration,
    /// Upper bound on a single `extract` or `load_more` call.
    pub pass_timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            stagnant_threshold: DEFAULT_STAGNANT_THRESHOLD,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            pass_timeout: Duration::from_secs(DEFAULT_PASS_TIMEOUT_SECS),
        }
    }
}

impl CollectorConfig {
    /// Builds the collector policy from application config.
    ///
    /// `pass_timeout` covers every retry attempt of one extraction, each of
    /// which may take up to the page timeout plus request overhead.
    #[must_use]
    pub fn from_app_config(config: &adtrove_core::AppConfig) -> Self {
        let attempts = u64::from(config.scraper_max_retries).saturating_add(1);
        let per_attempt = config.page_timeout_secs.saturating_add(30);
        Self {
            max_passes: config.collect_max_passes,
            stagnant_threshold: config.collect_stagnant_rounds,
            settle_delay: Duration::from_millis(config.collect_settle_delay_ms),
            pass_timeout: Duration::from_secs(per_attempt.saturating_mul(attempts)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `stagnant_threshold` consecutive passes added nothing new.
    Converged,
    MaxPasses,
    /// A pass after the first failed or timed out.
    PassFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSummary {
    pub passes: usize,
    pub stagnant_rounds: usize,
    pub unique_creatives: usize,
    pub stop_reason: StopReason,
}

/// Arena of unique creatives for one collection run.
#[derive(Debug, Default)]
pub struct CreativeCollector {
    config: CollectorConfig,
    creatives: Vec<CollectedCreative>,
    index: HashMap<String, usize>,
}

impl CreativeCollector {
    #[must_use]
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            creatives: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creatives collected so far, in first-seen order.
    #[must_use]
    pub fn creatives(&self) -> &[CollectedCreative] {
        &self.creatives
    }

    #[must_use]
    pub fn into_creatives(self) -> Vec<CollectedCreative> {
        self.creatives
    }

    /// Folds one pass of observations into the arena and returns how many
    /// previously unseen creatives it contained.
    pub fn merge_pass(&mut self, observations: Vec<CreativeObservation>) -> usize {
        let mut added = 0;
        for observation in observations {
            let image_ref = observation.image_ref.trim();
            if image_ref.is_empty() {
                tracing::debug!("skipping observation without image reference");
                continue;
            }
            let alt_text = observation.alt_text.as_deref().and_then(normalize_snippet);

            if let Some(&slot) = self.index.get(image_ref) {
                let existing = &mut self.creatives[slot];
                if existing.alt_text.is_none() {
                    existing.alt_text = alt_text;
                }
                merge_snippets_into(
                    &mut existing.text_snippets,
                    &observation.text_snippets,
                    MAX_TEXT_SNIPPETS,
                );
            } else {
                let mut text_snippets = Vec::new();
                merge_snippets_into(
                    &mut text_snippets,
                    &observation.text_snippets,
                    MAX_TEXT_SNIPPETS,
                );
                self.index
                    .insert(image_ref.to_string(), self.creatives.len());
                self.creatives.push(CollectedCreative {
                    image_ref: image_ref.to_string(),
                    alt_text,
                    text_snippets,
                });
                added += 1;
            }
        }
        added
    }

    /// Drives `session` until the page stops yielding new creatives.
    ///
    /// The arena is only mutated between suspension points, so dropping this
    /// future mid-run leaves [`Self::creatives`] holding every fully merged
    /// pass.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::CollectionTimeout`] if the first pass fails or
    /// exceeds `pass_timeout`, or if the run ends without a single creative
    /// having rendered. Failures on later passes end the run with the partial
    /// result instead.
    pub async fn run<S>(&mut self, session: &mut S) -> Result<CollectionSummary, ScraperError>
    where
        S: PageSession + ?Sized,
    {
        let max_passes = self.config.max_passes.max(1);
        let mut passes = 0usize;
        let mut stagnant_rounds = 0usize;

        let stop_reason = loop {
            let observations =
                match tokio::time::timeout(self.config.pass_timeout, session.extract()).await {
                    Ok(Ok(observations)) => observations,
                    Ok(Err(e)) if passes == 0 => {
                        return Err(ScraperError::CollectionTimeout {
                            passes,
                            reason: e.to_string(),
                        });
                    }
                    Err(_) if passes == 0 => {
                        return Err(ScraperError::CollectionTimeout {
                            passes,
                            reason: format!(
                                "first pass exceeded {}s",
                                self.config.pass_timeout.as_secs_f64()
                            ),
                        });
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(passes, error = %e, "extraction pass failed; keeping partial result");
                        break StopReason::PassFailed;
                    }
                    Err(_) => {
                        tracing::warn!(passes, "extraction pass timed out; keeping partial result");
                        break StopReason::PassFailed;
                    }
                };

            passes += 1;
            let observed = observations.len();
            let added = self.merge_pass(observations);
            if added == 0 {
                stagnant_rounds += 1;
            } else {
                stagnant_rounds = 0;
            }
            tracing::debug!(
                pass = passes,
                observed,
                added,
                unique = self.creatives.len(),
                stagnant_rounds,
                "extraction pass merged"
            );

            if stagnant_rounds >= self.config.stagnant_threshold {
                break StopReason::Converged;
            }
            if passes >= max_passes {
                break StopReason::MaxPasses;
            }

            match tokio::time::timeout(self.config.pass_timeout, session.load_more()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(passes, error = %e, "load_more failed; keeping partial result");
                    break StopReason::PassFailed;
                }
                Err(_) => {
                    tracing::warn!(passes, "load_more timed out; keeping partial result");
                    break StopReason::PassFailed;
                }
            }
            tokio::time::sleep(self.config.settle_delay).await;
        };

        if self.creatives.is_empty() {
            return Err(ScraperError::CollectionTimeout {
                passes,
                reason: format!("page rendered no creatives in {passes} passes"),
            });
        }

        let summary = CollectionSummary {
            passes,
            stagnant_rounds,
            unique_creatives: self.creatives.len(),
            stop_reason,
        };
        tracing::info!(
            passes,
            stagnant_rounds,
            unique_creatives = summary.unique_creatives,
            stop_reason = ?stop_reason,
            "collection finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod tests;
