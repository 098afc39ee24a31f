// Dictionary pass for sqlprobe
// Drives mutate → execute → record over one dictionary, pacing requests with a
// fixed delay. Requests are strictly sequential so latency samples stay clean.

use crate::audit::AuditLog;
use crate::dictionary::Dictionary;
use crate::engine::RequestExecutor;
use crate::error::ProbeError;
use crate::events::{EventChannel, ScanEvent};
use crate::models::{Hit, RequestTemplate};
use crate::mutator::mutate;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every payload was sent
    Drained,
    /// Stopped early by cancellation
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub dictionary: String,
    pub total: usize,
    pub attempted: usize,
    pub failures: usize,
    pub hits: usize,
    pub outcome: PassOutcome,
}

/// Everything one pass reads from or writes to. Owned by the session.
pub struct ScanLoop<'a> {
    pub template: &'a RequestTemplate,
    pub executor: &'a RequestExecutor,
    pub audit: &'a mut AuditLog,
    pub events: &'a EventChannel,
    pub hits: &'a mut Vec<Hit>,
    pub request_delay: Duration,
    pub cancel: &'a CancellationToken,
}

impl<'a> ScanLoop<'a> {
    /// Run one dictionary pass. A missing dictionary fails the pass before any request
    /// is sent; transport failures are recorded and the pass moves on.
    pub async fn run(&mut self, dictionary: &Dictionary) -> Result<PassSummary, ProbeError> {
        let payloads = dictionary.load().await?;
        let total = payloads.len();
        info!(dictionary = %dictionary.name, total, "starting dictionary pass");

        let mut summary = PassSummary {
            dictionary: dictionary.name.clone(),
            total,
            attempted: 0,
            failures: 0,
            hits: 0,
            outcome: PassOutcome::Drained,
        };

        for (i, payload) in payloads.iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.outcome = PassOutcome::Cancelled;
                break;
            }
            let index = i + 1;

            let query = mutate(self.template, payload, index)?;
            let result = self.executor.execute(&query).await;
            self.audit.record(&query, &result)?;
            summary.attempted += 1;
            if !result.success {
                summary.failures += 1;
            }

            self.events.publish(ScanEvent::SqlInjectionProgress {
                process: dictionary.name.clone(),
                index,
                total,
                percent: progress_percent(index, total),
                elapsed_ms: result.elapsed_ms,
                payload: payload.to_string(),
                query: query.clone(),
                result: result.clone(),
            });

            if result.has_body() {
                self.hits.push(Hit {
                    elapsed_ms: result.elapsed_ms,
                    query,
                    result,
                });
                summary.hits += 1;
            }

            if index < total {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        summary.outcome = PassOutcome::Cancelled;
                        break;
                    }
                    _ = tokio::time::sleep(self.request_delay) => {}
                }
            }
        }

        debug!(?summary, "dictionary pass finished");
        Ok(summary)
    }
}

/// `index / total * 100`, rounded to two decimals.
pub fn progress_percent(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    ((index as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_reaches_one_hundred_on_last_payload() {
        assert_eq!(progress_percent(3, 3), 100.0);
        assert_eq!(progress_percent(1, 3), 33.33);
        assert_eq!(progress_percent(2, 3), 66.67);
    }

    #[test]
    fn percent_is_monotonic() {
        let total = 17;
        let values: Vec<f64> = (1..=total).map(|i| progress_percent(i, total)).collect();
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }
}
