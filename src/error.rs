// Error taxonomy for sqlprobe
// Per-request transport failures never leave the executor; they become data.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Dictionary not found: {path}: {source}")]
    DictionaryNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid request template: {0}")]
    InvalidTemplate(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbeError {
    /// Whether this error ends the whole session rather than one dictionary pass.
    pub fn is_fatal_to_session(&self) -> bool {
        match self {
            ProbeError::DictionaryNotFound { .. } => false,
            ProbeError::Transport(_) => false,
            ProbeError::InvalidTemplate(_)
            | ProbeError::Config(_)
            | ProbeError::Io(_)
            | ProbeError::Json(_) => true,
        }
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        ProbeError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_errors_only_end_the_pass() {
        let err = ProbeError::DictionaryNotFound {
            path: PathBuf::from("missing.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(!err.is_fatal_to_session());
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn template_errors_end_the_session() {
        assert!(ProbeError::InvalidTemplate("no url".into()).is_fatal_to_session());
        assert!(!ProbeError::Transport("timeout".into()).is_fatal_to_session());
    }
}
