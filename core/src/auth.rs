//! OAuth client-credentials token acquisition.
//!
//! A fresh token is fetched before every business call; nothing is cached.

use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use log::debug;
use serde::Deserialize;

use crate::error::MpesaError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

const TOKEN_PATH: &str = "oauth/v1/generate?grant_type=client_credentials";

#[derive(Deserialize)]
struct TokenBody {
    access_token: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

pub struct TokenProvider {
    url: String,
    authorization: String,
    transport: Arc<dyn HttpTransport>,
}

impl TokenProvider {
    pub fn new(
        base_url: &str,
        consumer_key: &str,
        consumer_secret: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let basic = BASE64_STANDARD.encode(format!("{consumer_key}:{consumer_secret}"));
        Self {
            url: format!("{}/{TOKEN_PATH}", base_url.trim_end_matches('/')),
            authorization: format!("Basic {basic}"),
            transport,
        }
    }

    pub fn build_token_request(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url.clone(),
            headers: vec![("Authorization".to_string(), self.authorization.clone())],
            body: None,
        }
    }

    /// Extract `access_token` from a token endpoint response.
    pub fn parse_token_response(response: &HttpResponse) -> Result<String, MpesaError> {
        let body: Option<TokenBody> = serde_json::from_str(&response.body).ok();

        if !response.is_success() {
            let reason = body
                .and_then(|b| b.error_message)
                .unwrap_or_else(|| format!("Request failed with status code {}", response.status));
            return Err(auth_error(reason));
        }

        body.and_then(|b| b.access_token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| auth_error("response did not include an access_token"))
    }

    pub async fn fetch(&self) -> Result<String, MpesaError> {
        debug!("requesting access token from {}", self.url);
        let response = self
            .transport
            .execute(self.build_token_request())
            .await
            .map_err(auth_error)?;
        Self::parse_token_response(&response)
    }
}

fn auth_error(reason: impl std::fmt::Display) -> MpesaError {
    MpesaError::Auth(format!("Failed to obtain access token: {reason}"))
}
