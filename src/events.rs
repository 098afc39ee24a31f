// Scan lifecycle events for sqlprobe
// Publishers hand events to an EventChannel; each subscriber gets its own queue.
// Events published before a subscriber attaches are not replayed to it.

use crate::models::{ExecutionResult, MutatedQuery, RiskVerdict};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Messages sent from a scan session to whatever transport is listening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ScanEvent {
    /// Header priming is about to start
    PreFetchHeaders { message: String },
    /// Header priming finished (possibly with the default fallback)
    FetchedHeaders {
        message: String,
        headers: BTreeMap<String, String>,
    },
    /// One mutated query was executed
    SqlInjectionProgress {
        /// Name of the active dictionary
        process: String,
        index: usize,
        total: usize,
        percent: f64,
        elapsed_ms: f64,
        payload: String,
        query: MutatedQuery,
        result: ExecutionResult,
    },
    /// Classification is about to start
    CalculateVulnerability { message: String },
    /// Final verdict for the session
    CalculatedVulnerability { verdict: RiskVerdict },
}

impl ScanEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ScanEvent::PreFetchHeaders { .. } => "pre-fetch-headers",
            ScanEvent::FetchedHeaders { .. } => "fetched-headers",
            ScanEvent::SqlInjectionProgress { .. } => "sql-injection-progress",
            ScanEvent::CalculateVulnerability { .. } => "calculate-vulnerability",
            ScanEvent::CalculatedVulnerability { .. } => "calculated-vulnerability",
        }
    }

    /// Human-readable request and response lines, as shown by a live observer.
    pub fn trace_lines(&self) -> (String, String) {
        match self {
            ScanEvent::PreFetchHeaders { message } | ScanEvent::CalculateVulnerability { message } => {
                (message.clone(), String::new())
            }
            ScanEvent::FetchedHeaders { message, headers } => {
                let detail = headers
                    .iter()
                    .map(|(k, v)| format!("\t{}: {}", k, v))
                    .collect::<Vec<_>>()
                    .join("\n");
                (message.clone(), detail)
            }
            ScanEvent::SqlInjectionProgress {
                elapsed_ms,
                query,
                result,
                ..
            } => {
                let request = format!(
                    "[Request:{}]: -time:{:.2} -{} -{} -{} -{}",
                    clock(&result.request_time),
                    elapsed_ms,
                    query.url,
                    query.method,
                    to_json(&query.params),
                    to_json(&query.body)
                );
                let response = format!(
                    "[Response:{}]: -{} -{}",
                    clock(&result.response_time),
                    result.status_message,
                    query.payload
                );
                (request, response)
            }
            ScanEvent::CalculatedVulnerability { verdict } => {
                let percentage = verdict
                    .percentage
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| "n/a".to_string());
                (
                    verdict.message.clone(),
                    format!(
                        "Percentage: {}%, Point marked: {}, Time: {:.3}",
                        percentage, verdict.grade, verdict.elapsed_ms
                    ),
                )
            }
        }
    }
}

fn clock(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%-I:%M:%S").to_string()
}

pub(crate) fn to_json(map: &BTreeMap<String, String>) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}

pub type Subscription = mpsc::UnboundedReceiver<ScanEvent>;

/// In-process publish/subscribe channel. Cloning shares the subscriber list.
#[derive(Clone, Default)]
pub struct EventChannel {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<ScanEvent>>>>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Deliver to every live subscriber. Dropped subscribers are pruned.
    pub fn publish(&self, event: ScanEvent) {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<ScanEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, VerdictKind};

    fn note(message: &str) -> ScanEvent {
        ScanEvent::CalculateVulnerability {
            message: message.to_string(),
        }
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let channel = EventChannel::new();
        let mut early = channel.subscribe();
        channel.publish(note("first"));
        let mut late = channel.subscribe();
        channel.publish(note("second"));

        assert_eq!(early.try_recv().unwrap(), note("first"));
        assert_eq!(early.try_recv().unwrap(), note("second"));
        assert_eq!(late.try_recv().unwrap(), note("second"));
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let channel = EventChannel::new();
        let kept = channel.subscribe();
        drop(channel.subscribe());
        channel.publish(note("x"));
        assert_eq!(channel.subscriber_count(), 1);
        drop(kept);
    }

    #[test]
    fn events_serialize_with_their_names() {
        let event = note("working");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(json["message"], "working");
    }

    #[test]
    fn verdict_trace_without_percentage() {
        let event = ScanEvent::CalculatedVulnerability {
            verdict: RiskVerdict {
                grade: Grade::F,
                kind: VerdictKind::NoResponses,
                percentage: None,
                message: "nothing".to_string(),
                elapsed_ms: 0.5,
            },
        };
        let (request, response) = event.trace_lines();
        assert_eq!(request, "nothing");
        assert!(response.starts_with("Percentage: n/a%, Point marked: F"));
    }
}
