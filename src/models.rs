// Core data models for sqlprobe

use crate::error::ProbeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Supported HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    OPTIONS,
    HEAD,
}

impl Method {
    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::DELETE => reqwest::Method::DELETE,
            Method::PATCH => reqwest::Method::PATCH,
            Method::OPTIONS => reqwest::Method::OPTIONS,
            Method::HEAD => reqwest::Method::HEAD,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
            Method::PUT => write!(f, "PUT"),
            Method::DELETE => write!(f, "DELETE"),
            Method::PATCH => write!(f, "PATCH"),
            Method::OPTIONS => write!(f, "OPTIONS"),
            Method::HEAD => write!(f, "HEAD"),
        }
    }
}

impl FromStr for Method {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "PATCH" => Ok(Method::PATCH),
            "OPTIONS" => Ok(Method::OPTIONS),
            "HEAD" => Ok(Method::HEAD),
            other => Err(ProbeError::InvalidTemplate(format!("unsupported method: {}", other))),
        }
    }
}

/// The request a scan is built around. Not modified once a scan starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTemplate {
    pub url: String,
    pub method: Method,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub body: BTreeMap<String, String>,
}

impl RequestTemplate {
    pub fn new(url: impl Into<String>, method: Method) -> Self {
        Self {
            url: url.into(),
            method,
            params: BTreeMap::new(),
            body: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_body_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// Check that the template can be mutated and sent.
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.url.trim().is_empty() {
            return Err(ProbeError::InvalidTemplate("url is required".to_string()));
        }
        let parsed = reqwest::Url::parse(&self.url)
            .map_err(|e| ProbeError::InvalidTemplate(format!("invalid url {}: {}", self.url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ProbeError::InvalidTemplate(format!(
                "unsupported scheme {} in {}",
                scheme, self.url
            ))),
        }
    }
}

/// One template with one payload appended to every param and body value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutatedQuery {
    /// 1-based position of the payload within its dictionary pass
    pub index: usize,
    pub payload: String,
    pub url: String,
    pub method: Method,
    pub params: BTreeMap<String, String>,
    pub body: BTreeMap<String, String>,
}

/// Outcome of a single HTTP call. `success == false` means the transport failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub request_time: DateTime<Utc>,
    pub response_time: DateTime<Utc>,
    pub elapsed_ms: f64,
    pub success: bool,
    pub status_code: Option<u16>,
    pub status_message: String,
    pub response_body: Option<String>,
}

impl ExecutionResult {
    pub fn has_body(&self) -> bool {
        self.response_body.as_deref().map_or(false, |b| !b.is_empty())
    }
}

/// A request whose response carried a body; used as a timing sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub elapsed_ms: f64,
    pub query: MutatedQuery,
    pub result: ExecutionResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
        }
    }

    /// Render as a `Set-Cookie` style string for seeding a cookie jar.
    pub fn to_set_cookie(&self) -> String {
        let mut s = format!("{}={}", self.name, self.value);
        if let Some(domain) = &self.domain {
            s.push_str(&format!("; Domain={}", domain));
        }
        if let Some(path) = &self.path {
            s.push_str(&format!("; Path={}", path));
        }
        s
    }
}

/// Letter grade of a risk verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    /// No hits were recorded
    NoResponses,
    /// Every hit took the same time
    Inconclusive,
    LowRisk,
    HighRisk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub grade: Grade,
    pub kind: VerdictKind,
    /// Absent for degenerate sample sets
    pub percentage: Option<f64>,
    pub message: String,
    /// Time spent classifying
    pub elapsed_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_case_insensitively_and_defaults_to_get() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::POST);
        assert_eq!("".parse::<Method>().unwrap(), Method::GET);
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn template_requires_http_url() {
        assert!(RequestTemplate::new("", Method::GET).validate().is_err());
        assert!(RequestTemplate::new("ftp://example.com", Method::GET).validate().is_err());
        assert!(RequestTemplate::new("not a url", Method::GET).validate().is_err());
        assert!(RequestTemplate::new("https://example.com/api", Method::GET).validate().is_ok());
    }

    #[test]
    fn empty_body_is_not_a_hit() {
        let now = Utc::now();
        let mut result = ExecutionResult {
            request_time: now,
            response_time: now,
            elapsed_ms: 1.0,
            success: true,
            status_code: Some(200),
            status_message: "OK".to_string(),
            response_body: Some(String::new()),
        };
        assert!(!result.has_body());
        result.response_body = Some("rows".to_string());
        assert!(result.has_body());
    }

    #[test]
    fn cookie_renders_attributes() {
        let mut cookie = Cookie::new("sid", "abc");
        cookie.domain = Some("example.com".to_string());
        cookie.path = Some("/".to_string());
        assert_eq!(cookie.to_set_cookie(), "sid=abc; Domain=example.com; Path=/");
    }
}
