//! Retry-then-failover chain over the configured providers.
//!
//! Each provider gets up to `max_attempts` tries with a fixed delay
//! between them; when a provider is exhausted, control passes to the
//! next one. Only when every provider is exhausted does the caller see
//! a single aggregated failure.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::{ReadingProvider, TarotReading};
use crate::error::ProviderError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Per-provider attempt counts for one draw, in failover order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawAccounting {
    pub attempts: Vec<(String, u32)>,
}

impl DrawAccounting {
    fn record(&mut self, provider: &str, attempts: u32) {
        self.attempts.push((provider.to_string(), attempts));
    }

    /// Total attempts across all providers.
    pub fn total(&self) -> u32 {
        self.attempts.iter().map(|(_, n)| n).sum()
    }
}

/// Ordered provider chain with per-provider retry.
pub struct FailoverReader {
    providers: Vec<Arc<dyn ReadingProvider>>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl FailoverReader {
    pub fn new(providers: Vec<Arc<dyn ReadingProvider>>) -> Self {
        Self {
            providers,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Draw one card, retrying and failing over as needed.
    ///
    /// Success returns the reading plus the attempt accounting; failure
    /// is a single `AllProvidersFailed` naming each provider's attempt
    /// count and last error.
    pub async fn draw(
        &self,
        question: &str,
    ) -> Result<(TarotReading, DrawAccounting), ProviderError> {
        let mut accounting = DrawAccounting::default();
        let mut failures = Vec::new();

        for provider in &self.providers {
            let mut last_error = None;

            for attempt in 1..=self.max_attempts {
                match provider.draw(question).await {
                    Ok(reading) => {
                        accounting.record(provider.name(), attempt);
                        return Ok((reading, accounting));
                    }
                    Err(e) => {
                        warn!(
                            provider = provider.name(),
                            attempt,
                            error = %e,
                            "provider attempt failed"
                        );
                        last_error = Some(e);
                        if attempt < self.max_attempts {
                            tokio::time::sleep(self.retry_delay).await;
                        }
                    }
                }
            }

            accounting.record(provider.name(), self.max_attempts);
            failures.push(format!(
                "{} ({} attempts): {}",
                provider.name(),
                self.max_attempts,
                last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Err(ProviderError::AllProvidersFailed {
            summary: failures.join("; "),
        })
    }
}
