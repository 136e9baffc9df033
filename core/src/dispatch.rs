//! Authenticated JSON dispatch to Daraja business endpoints.
//!
//! # Design
//! `RequestDispatcher::send` owns the token-then-POST sequence and the
//! transport-level error mapping. It hands every HTTP response it cannot
//! attribute to a Daraja error field back as a `ResponseEnvelope`; each
//! operation then applies `ensure_success` or
//! `ensure_success_without_response_message`, since Daraja's error fields
//! are not uniform across endpoints.

use std::sync::Arc;

use log::debug;
use serde::Serialize;
use serde_json::Value;

use crate::auth::TokenProvider;
use crate::error::MpesaError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

/// Body and status of a business endpoint response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    /// `None` when the body was empty, not JSON, or JSON `null`.
    pub body: Option<Value>,
    pub status: u16,
}

pub struct RequestDispatcher {
    base_url: String,
    tokens: TokenProvider,
    transport: Arc<dyn HttpTransport>,
}

impl RequestDispatcher {
    pub fn new(base_url: &str, tokens: TokenProvider, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            transport,
        }
    }

    pub fn build_request(&self, endpoint: &str, token: &str, body: String) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/{}", self.base_url, endpoint.trim_start_matches('/')),
            headers: vec![
                ("Authorization".to_string(), format!("Bearer {token}")),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        }
    }

    /// Turn an HTTP response into an envelope, failing early when a non-2xx
    /// body names its own error or carries no JSON at all.
    pub fn parse_response(response: HttpResponse) -> Result<ResponseEnvelope, MpesaError> {
        let body = serde_json::from_str::<Value>(&response.body)
            .ok()
            .filter(|v| !v.is_null());

        if !response.is_success() {
            let Some(value) = body.as_ref() else {
                return Err(MpesaError::Request(format!(
                    "Request failed with status code {}",
                    response.status
                )));
            };
            if let Some(message) = first_message(value, &["errorMessage", "ResponseDescription"]) {
                return Err(MpesaError::Request(message));
            }
        }

        Ok(ResponseEnvelope {
            body,
            status: response.status,
        })
    }

    /// Fetch a token and POST `payload` as JSON to `{base_url}/{endpoint}`.
    pub async fn send<P>(&self, endpoint: &str, payload: &P) -> Result<ResponseEnvelope, MpesaError>
    where
        P: Serialize + ?Sized,
    {
        let body = serde_json::to_string(payload)
            .map_err(|e| MpesaError::Request(format!("Failed to serialize request: {e}")))?;
        let token = self.tokens.fetch().await?;
        let request = self.build_request(endpoint, &token, body);

        debug!("POST {}", request.url);
        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| MpesaError::Request(e.0))?;
        debug!("{endpoint} responded with status {}", response.status);

        Self::parse_response(response)
    }
}

/// Require a body and status 200. The error message is the first of
/// `ResponseMessage`, `errorMessage`, or a generic status message.
pub fn ensure_success(envelope: ResponseEnvelope) -> Result<Value, MpesaError> {
    check(envelope, &["ResponseMessage", "errorMessage"])
}

/// Like `ensure_success` but never consults `ResponseMessage`.
pub fn ensure_success_without_response_message(envelope: ResponseEnvelope) -> Result<Value, MpesaError> {
    check(envelope, &["errorMessage"])
}

fn check(envelope: ResponseEnvelope, message_fields: &[&str]) -> Result<Value, MpesaError> {
    let body = envelope
        .body
        .ok_or_else(|| MpesaError::Request("No response received from M-Pesa".to_string()))?;
    if envelope.status != 200 {
        let message = first_message(&body, message_fields)
            .unwrap_or_else(|| format!("Request failed with status code {}", envelope.status));
        return Err(MpesaError::Request(message));
    }
    Ok(body)
}

fn first_message(body: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| body.get(*field).and_then(Value::as_str))
        .find(|message| !message.is_empty())
        .map(str::to_string)
}
