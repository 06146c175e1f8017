//! crates/study_tracker_core/src/quotes.rs
//!
//! Motivational text with guaranteed fallbacks. A failing `QuoteService` is never
//! surfaced to the user; the static text is returned instead.

use async_trait::async_trait;
use tracing::warn;

use crate::ports::{PortResult, QuoteService};

pub const FALLBACK_QUOTE: &str =
    "The distance between a dream and reality is called discipline. Your seat in the academy is waiting.";

pub const FALLBACK_EXPLANATION: &str = "Topic explanation currently unavailable.";

pub async fn quote_or_fallback(
    service: &dyn QuoteService,
    day: u32,
    task_titles: &[String],
) -> String {
    match service.motivational_quote(day, task_titles).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            warn!("Quote service returned empty text for day {}", day);
            FALLBACK_QUOTE.to_string()
        }
        Err(e) => {
            warn!("Quote service failed for day {}: {}", day, e);
            FALLBACK_QUOTE.to_string()
        }
    }
}

pub async fn explanation_or_fallback(service: &dyn QuoteService, topic: &str) -> String {
    match service.explain_topic(topic).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => FALLBACK_EXPLANATION.to_string(),
        Err(e) => {
            warn!("Topic explanation failed for '{}': {}", topic, e);
            FALLBACK_EXPLANATION.to_string()
        }
    }
}

/// A quote service that always answers with the fallback texts. Used when no
/// text-generation backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticQuotes;

#[async_trait]
impl QuoteService for StaticQuotes {
    async fn motivational_quote(&self, _day: u32, _task_titles: &[String]) -> PortResult<String> {
        Ok(FALLBACK_QUOTE.to_string())
    }

    async fn explain_topic(&self, _topic: &str) -> PortResult<String> {
        Ok(FALLBACK_EXPLANATION.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortError;

    struct Broken;

    #[async_trait]
    impl QuoteService for Broken {
        async fn motivational_quote(&self, _day: u32, _titles: &[String]) -> PortResult<String> {
            Err(PortError::Unavailable("timeout".to_string()))
        }

        async fn explain_topic(&self, _topic: &str) -> PortResult<String> {
            Ok("   ".to_string())
        }
    }

    #[tokio::test]
    async fn failures_degrade_to_static_text() {
        assert_eq!(quote_or_fallback(&Broken, 4, &[]).await, FALLBACK_QUOTE);
        assert_eq!(explanation_or_fallback(&Broken, "GST").await, FALLBACK_EXPLANATION);
    }
}
