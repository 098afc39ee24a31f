// Scan session orchestration for sqlprobe
// One session = one template run through the configured dictionary schedule,
// followed by a single timing verdict. Nothing here is shared between sessions.

use crate::audit::AuditLog;
use crate::config::ScanConfig;
use crate::dictionary::Dictionary;
use crate::engine::RequestExecutor;
use crate::error::ProbeError;
use crate::events::{EventChannel, ScanEvent, Subscription};
use crate::models::{Hit, RequestTemplate, RiskVerdict};
use crate::priming::{DefaultHeaders, HeaderPrimer, PrimedHeaders};
use crate::reporting::write_latency_samples;
use crate::scan::{PassOutcome, PassSummary, ScanLoop};
use crate::verdict::classify;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A dictionary pass that could not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPass {
    pub dictionary: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: String,
    pub verdict: RiskVerdict,
    pub passes: Vec<PassSummary>,
    pub failed_passes: Vec<FailedPass>,
    pub hits: Vec<Hit>,
    pub audit_log: PathBuf,
    pub samples_path: PathBuf,
    pub cancelled: bool,
}

pub struct ScanSession {
    session_id: String,
    template: RequestTemplate,
    config: ScanConfig,
    primer: Box<dyn HeaderPrimer>,
    events: EventChannel,
    cancel_token: CancellationToken,
}

impl ScanSession {
    pub fn new(session_id: impl Into<String>, template: RequestTemplate, config: ScanConfig) -> Self {
        let primer = Box::new(DefaultHeaders {
            user_agent: config.user_agent.clone(),
        });
        Self {
            session_id: session_id.into(),
            template,
            config,
            primer,
            events: EventChannel::new(),
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_primer(mut self, primer: Box<dyn HeaderPrimer>) -> Self {
        self.primer = primer;
        self
    }

    /// Replace the session's cancel token with an external one (e.g. tied to a client connection).
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn with_event_channel(mut self, events: EventChannel) -> Self {
        self.events = events;
        self
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Run the whole schedule and classify what it collected. The verdict event is
    /// published even when an audit or samples write ends the session with an error.
    pub async fn run(self) -> Result<SessionReport, ProbeError> {
        self.config.validate()?;
        self.template.validate()?;
        let audit_path = self.config.audit_log_path(&self.session_id)?;
        let samples_path = self.config.samples_path(&self.session_id)?;
        info!(session = %self.session_id, url = %self.template.url, "scan session started");

        let mut hits: Vec<Hit> = Vec::new();
        let mut passes = Vec::new();
        let mut failed_passes = Vec::new();
        let schedule_result = self
            .run_schedule(&audit_path, &mut hits, &mut passes, &mut failed_passes)
            .await;

        let cancelled = self.cancel_token.is_cancelled();
        if cancelled {
            info!(session = %self.session_id, "scan cancelled, classifying partial results");
        }
        if let Err(e) = &schedule_result {
            warn!(session = %self.session_id, "scan ended early, classifying partial results: {}", e);
        }

        self.events.publish(ScanEvent::CalculateVulnerability {
            message: "Calculating the SQL injection risk from server response times.".to_string(),
        });
        let verdict = classify(&hits);
        self.events.publish(ScanEvent::CalculatedVulnerability {
            verdict: verdict.clone(),
        });
        info!(
            session = %self.session_id,
            grade = %verdict.grade,
            percentage = ?verdict.percentage,
            samples = hits.len(),
            "scan session finished"
        );

        let samples_result = write_latency_samples(&samples_path, &hits);
        let audit_log = schedule_result?;
        samples_result?;
        Ok(SessionReport {
            session_id: self.session_id,
            verdict,
            passes,
            failed_passes,
            hits,
            audit_log,
            samples_path,
            cancelled,
        })
    }

    /// Prime, then run every scheduled pass into `hits`. Returns the closed audit log path.
    async fn run_schedule(
        &self,
        audit_path: &Path,
        hits: &mut Vec<Hit>,
        passes: &mut Vec<PassSummary>,
        failed_passes: &mut Vec<FailedPass>,
    ) -> Result<PathBuf, ProbeError> {
        let mut audit = AuditLog::open(audit_path)?;
        let primed = self.prime_headers().await;
        let executor = RequestExecutor::new(
            primed,
            self.config.request_timeout(),
            &self.template.url,
            self.config.proxy.as_deref(),
        )?;

        for entry in &self.config.schedule {
            if self.cancel_token.is_cancelled() {
                break;
            }
            // pauses separate passes; nothing to wait for before the first one that runs
            let pause = self.config.pause_before(entry);
            if !passes.is_empty() && !pause.is_zero() {
                tokio::select! {
                    _ = self.cancel_token.cancelled() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }

            let dictionary = Dictionary::resolve(&entry.dictionary, &self.config.dictionary_dir);
            let mut pass = ScanLoop {
                template: &self.template,
                executor: &executor,
                audit: &mut audit,
                events: &self.events,
                hits: &mut *hits,
                request_delay: self.config.request_delay(),
                cancel: &self.cancel_token,
            };
            match pass.run(&dictionary).await {
                Ok(summary) => {
                    let stop = summary.outcome == PassOutcome::Cancelled;
                    passes.push(summary);
                    if stop {
                        break;
                    }
                }
                Err(e) if !e.is_fatal_to_session() => {
                    warn!(dictionary = %dictionary.name, "dictionary pass skipped: {}", e);
                    failed_passes.push(FailedPass {
                        dictionary: dictionary.name.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        audit.close()
    }

    /// Ask the primer for headers; fall back to the default user agent on failure.
    async fn prime_headers(&self) -> PrimedHeaders {
        self.events.publish(ScanEvent::PreFetchHeaders {
            message: "Fetching headers and cookies for the target.".to_string(),
        });
        let primed = match self.primer.pre_fetch_headers(&self.template.url).await {
            Ok(primed) => primed,
            Err(e) => {
                warn!(url = %self.template.url, "header priming failed, using defaults: {}", e);
                PrimedHeaders::defaults(&self.config.user_agent)
            }
        };
        self.events.publish(ScanEvent::FetchedHeaders {
            message: "Fetched headers and cookies for the target.".to_string(),
            headers: primed.headers.clone(),
        });
        primed
    }
}
