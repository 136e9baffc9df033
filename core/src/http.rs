//! HTTP transport seam.
//!
//! # Design
//! Requests and responses are described as plain data. The client builds
//! `HttpRequest` values and interprets `HttpResponse` values; an injected
//! `HttpTransport` performs the actual round-trip. Swapping the transport is
//! how tests run the full client without a network.
//!
//! A transport reports only network-level failures as errors. Every HTTP
//! status, 4xx and 5xx included, comes back as an `HttpResponse` so the
//! client can pick the Daraja error message out of the body.

use async_trait::async_trait;

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes HTTP round-trips on behalf of the client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse, TransportError>;

    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: String,
    ) -> Result<HttpResponse, TransportError>;

    /// Route a plain-data request to `get` or `post`.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match request.method {
            HttpMethod::Get => self.get(&request.url, &request.headers).await,
            HttpMethod::Post => {
                self.post(&request.url, &request.headers, request.body.unwrap_or_default())
                    .await
            }
        }
    }
}

/// Default transport backed by a blocking `ureq::Agent`.
///
/// Each call runs on tokio's blocking pool. Outside a tokio runtime a call
/// fails with a `TransportError` instead of panicking. ureq's default
/// timeouts apply.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a preconfigured agent. It must have `http_status_as_error(false)`
    /// or error statuses surface as transport failures.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for UreqTransport {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        let url = url.to_string();
        let headers = headers.to_vec();
        run_blocking(move || {
            let mut request = agent.get(&url);
            for (name, value) in &headers {
                request = request.header(name.as_str(), value.as_str());
            }
            into_http_response(request.call())
        })
        .await
    }

    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: String,
    ) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        let url = url.to_string();
        let headers = headers.to_vec();
        run_blocking(move || {
            let mut request = agent.post(&url);
            for (name, value) in &headers {
                request = request.header(name.as_str(), value.as_str());
            }
            into_http_response(request.send(body.as_bytes()))
        })
        .await
    }
}

async fn run_blocking<F>(f: F) -> Result<HttpResponse, TransportError>
where
    F: FnOnce() -> Result<HttpResponse, TransportError> + Send + 'static,
{
    blocking_pool()?
        .spawn_blocking(f)
        .await
        .map_err(|e| TransportError(format!("transport task failed: {e}")))?
}

fn blocking_pool() -> Result<tokio::runtime::Handle, TransportError> {
    tokio::runtime::Handle::try_current()
        .map_err(|e| TransportError(format!("UreqTransport requires a tokio runtime: {e}")))
}

fn into_http_response(
    result: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> Result<HttpResponse, TransportError> {
    let mut response = result.map_err(|e| TransportError(e.to_string()))?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| TransportError(e.to_string()))?;
    Ok(HttpResponse { status, headers, body })
}
