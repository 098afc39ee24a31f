// Scan configuration for sqlprobe
// Delays, timeouts, artifact locations and the ordered dictionary schedule

use crate::dictionary::{DictionaryCategory, DictionaryRef};
use crate::error::ProbeError;
use crate::priming::DEFAULT_USER_AGENT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const AUDIT_LOG_FILE: &str = "sql_injection.log";
pub const SAMPLES_FILE: &str = "sql_injection.json";

/// One dictionary pass in the session schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub dictionary: DictionaryRef,
    /// Pause before this pass; `None` uses the config-wide dictionary pause
    #[serde(default)]
    pub pause_before_ms: Option<u64>,
}

impl ScheduleEntry {
    pub fn new(dictionary: impl Into<DictionaryRef>) -> Self {
        Self {
            dictionary: dictionary.into(),
            pause_before_ms: None,
        }
    }

    pub fn immediate(dictionary: impl Into<DictionaryRef>) -> Self {
        Self {
            dictionary: dictionary.into(),
            pause_before_ms: Some(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Pause between two requests of a pass
    pub request_delay_ms: u64,
    /// Default pause between two passes
    pub dictionary_pause_ms: u64,
    pub request_timeout_ms: u64,
    pub user_agent: String,
    /// Proxy URL for all probe traffic; direct connections when unset
    pub proxy: Option<String>,
    pub dictionary_dir: PathBuf,
    pub output_dir: PathBuf,
    pub schedule: Vec<ScheduleEntry>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 500,
            dictionary_pause_ms: 5000,
            request_timeout_ms: 15_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            dictionary_dir: PathBuf::from("dictionaries/sql"),
            output_dir: PathBuf::from("storages/logs"),
            schedule: default_schedule(),
        }
    }
}

/// Error-based and generic passes back to back, then time-based, union and the
/// blind families, each after the dictionary pause.
pub fn default_schedule() -> Vec<ScheduleEntry> {
    vec![
        ScheduleEntry::immediate(DictionaryCategory::ErrorBased),
        ScheduleEntry::immediate(DictionaryCategory::GenericSqli),
        ScheduleEntry::new(DictionaryCategory::TimeBased),
        ScheduleEntry::new(DictionaryCategory::UnionSelect),
        ScheduleEntry::new(DictionaryCategory::GenericBlind),
        ScheduleEntry::new(DictionaryCategory::MysqlBlindInsert),
        ScheduleEntry::new(DictionaryCategory::MysqlBlindOrderBy),
        ScheduleEntry::new(DictionaryCategory::MysqlBlindWhere),
    ]
}

impl ScanConfig {
    pub fn load(path: &Path) -> Result<Self, ProbeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProbeError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: ScanConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.schedule.is_empty() {
            return Err(ProbeError::Config("schedule has no dictionaries".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ProbeError::Config("request_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn pause_before(&self, entry: &ScheduleEntry) -> Duration {
        Duration::from_millis(entry.pause_before_ms.unwrap_or(self.dictionary_pause_ms))
    }

    /// Directory holding one session's artifacts.
    pub fn session_dir(&self, session_id: &str) -> Result<PathBuf, ProbeError> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && session_id != "."
            && session_id != "..";
        if !valid {
            return Err(ProbeError::Config(format!("invalid session id: {:?}", session_id)));
        }
        Ok(self.output_dir.join(session_id))
    }

    pub fn audit_log_path(&self, session_id: &str) -> Result<PathBuf, ProbeError> {
        Ok(self.session_dir(session_id)?.join(AUDIT_LOG_FILE))
    }

    pub fn samples_path(&self, session_id: &str) -> Result<PathBuf, ProbeError> {
        Ok(self.session_dir(session_id)?.join(SAMPLES_FILE))
    }
}
