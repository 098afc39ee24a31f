// Async HTTP engine for sqlprobe
// Sends one mutated query and times it. Transport errors are returned as data.

use crate::error::ProbeError;
use crate::models::{ExecutionResult, MutatedQuery};
use crate::priming::PrimedHeaders;
use chrono::Utc;
use reqwest::cookie::Jar;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct RequestExecutor {
    client: Client,
    headers: PrimedHeaders,
}

impl RequestExecutor {
    /// Build an executor for one session. Primed cookies are scoped to `target_url`.
    /// Requests go direct unless `proxy` is given; environment proxies are ignored.
    pub fn new(
        headers: PrimedHeaders,
        timeout: Duration,
        target_url: &str,
        proxy: Option<&str>,
    ) -> Result<Self, ProbeError> {
        let jar = Arc::new(Jar::default());
        if let Ok(url) = reqwest::Url::parse(target_url) {
            for cookie in &headers.cookies {
                jar.add_cookie_str(&cookie.to_set_cookie(), &url);
            }
        }

        let mut builder = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(timeout)
            .cookie_provider(jar);
        builder = match proxy {
            Some(proxy) => builder.proxy(
                reqwest::Proxy::all(proxy)
                    .map_err(|e| ProbeError::Config(format!("invalid proxy {}: {}", proxy, e)))?,
            ),
            None => builder.no_proxy(),
        };
        let client = builder
            .build()
            .map_err(|e| ProbeError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { client, headers })
    }

    pub fn headers(&self) -> &PrimedHeaders {
        &self.headers
    }

    /// Issue the request and measure wall-clock time around it, body included.
    pub async fn execute(&self, query: &MutatedQuery) -> ExecutionResult {
        let mut req = self.client.request(query.method.as_reqwest(), &query.url);
        req = self.headers.apply(req);
        if !query.params.is_empty() {
            req = req.query(&query.params);
        }
        if !query.body.is_empty() {
            req = req.json(&query.body);
        }

        let request_time = Utc::now();
        let start = Instant::now();
        let outcome = match req.send().await {
            Ok(resp) => {
                let status = resp.status();
                let message = status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| status.as_str().to_string());
                match resp.text().await {
                    Ok(body) => Ok((status.as_u16(), message, body)),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let response_time = Utc::now();

        match outcome {
            Ok((status_code, status_message, body)) => ExecutionResult {
                request_time,
                response_time,
                elapsed_ms,
                success: true,
                status_code: Some(status_code),
                status_message,
                response_body: if body.is_empty() { None } else { Some(body) },
            },
            Err(e) => {
                let failure = ProbeError::from(e);
                debug!(index = query.index, payload = %query.payload, "{}", failure);
                ExecutionResult {
                    request_time,
                    response_time,
                    elapsed_ms,
                    success: false,
                    status_code: None,
                    status_message: failure.to_string(),
                    response_body: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Method;
    use std::collections::BTreeMap;

    fn query(url: &str) -> MutatedQuery {
        MutatedQuery {
            index: 1,
            payload: "'".to_string(),
            url: url.to_string(),
            method: Method::GET,
            params: BTreeMap::new(),
            body: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_recorded_not_raised() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("http://127.0.0.1:{}/", port);
        let executor = RequestExecutor::new(
            PrimedHeaders::defaults("test-agent"),
            Duration::from_secs(2),
            &url,
            None,
        )
        .unwrap();
        let result = executor.execute(&query(&url)).await;
        assert!(!result.success);
        assert!(result.response_body.is_none());
        assert!(result.status_code.is_none());
        assert!(result.status_message.starts_with("Transport failure"));
        assert!(result.elapsed_ms >= 0.0);
        assert!(result.response_time >= result.request_time);
    }
}
