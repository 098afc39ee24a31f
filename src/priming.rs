// Header priming for sqlprobe
// A primer supplies the headers and cookies every probe request is sent with.
// Browser-driven priming lives outside this crate and plugs in through `HeaderPrimer`.

use crate::error::ProbeError;
use crate::models::Cookie;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub const DEFAULT_USER_AGENT: &str = "Googlebot/2.1 (+http://www.googlebot.com/bot.html)";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimedHeaders {
    pub headers: BTreeMap<String, String>,
    pub cookies: Vec<Cookie>,
}

impl PrimedHeaders {
    /// Fallback used whenever priming fails: just the user agent.
    pub fn defaults(user_agent: &str) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("user-agent".to_string(), user_agent.to_string());
        Self {
            headers,
            cookies: Vec::new(),
        }
    }

    pub fn apply(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (name, value) in &self.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        req
    }
}

#[async_trait]
pub trait HeaderPrimer: Send + Sync {
    async fn pre_fetch_headers(&self, url: &str) -> Result<PrimedHeaders, ProbeError>;
}

pub struct DefaultHeaders {
    pub user_agent: String,
}

impl Default for DefaultHeaders {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[async_trait]
impl HeaderPrimer for DefaultHeaders {
    async fn pre_fetch_headers(&self, _url: &str) -> Result<PrimedHeaders, ProbeError> {
        Ok(PrimedHeaders::defaults(&self.user_agent))
    }
}

/// Headers supplied up front by the caller, e.g. alongside the scan request.
pub struct StaticHeaders {
    pub headers: BTreeMap<String, String>,
    pub cookies: Vec<Cookie>,
    pub user_agent: String,
}

impl StaticHeaders {
    pub fn new(headers: BTreeMap<String, String>) -> Self {
        Self {
            headers,
            cookies: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[async_trait]
impl HeaderPrimer for StaticHeaders {
    async fn pre_fetch_headers(&self, _url: &str) -> Result<PrimedHeaders, ProbeError> {
        let mut primed = PrimedHeaders::defaults(&self.user_agent);
        for (name, value) in &self.headers {
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                continue;
            }
            primed.headers.insert(name, value.trim().to_string());
        }
        primed.cookies = self.cookies.clone();
        Ok(primed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_primer_sets_user_agent() {
        let primed = DefaultHeaders::default()
            .pre_fetch_headers("http://example.com")
            .await
            .unwrap();
        assert_eq!(primed.headers["user-agent"], DEFAULT_USER_AGENT);
        assert!(primed.cookies.is_empty());
    }

    #[tokio::test]
    async fn static_headers_override_defaults() {
        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), "curl/8.0".to_string());
        headers.insert(" X-Api-Key ".to_string(), " secret ".to_string());
        headers.insert("".to_string(), "ignored".to_string());
        let primed = StaticHeaders::new(headers)
            .pre_fetch_headers("http://example.com")
            .await
            .unwrap();
        assert_eq!(primed.headers["user-agent"], "curl/8.0");
        assert_eq!(primed.headers["x-api-key"], "secret");
        assert_eq!(primed.headers.len(), 2);
    }
}
