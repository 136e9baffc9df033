//! Client configuration and its validation.
//!
//! # Design
//! `ClientConfig` is the raw, caller-supplied shape. Every field is optional
//! so that a missing value can be reported by name instead of failing inside
//! serde. `ClientConfig::validate` turns it into a `ValidatedConfig` whose
//! fields are all present; nothing downstream handles `Option`s.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MpesaError;

const PRODUCTION_URL: &str = "https://api.safaricom.co.ke";
const SANDBOX_URL: &str = "https://sandbox.safaricom.co.ke";

/// Directory searched for the Safaricom public certificates when neither
/// `certificate` nor `certificate_path` is configured. Relative paths resolve
/// against the working directory of the running process.
pub const DEFAULT_CERTIFICATE_DIR: &str = "certs";

/// Daraja deployment the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Sandbox,
}

impl Environment {
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Production => PRODUCTION_URL,
            Environment::Sandbox => SANDBOX_URL,
        }
    }

    pub fn certificate_file_name(self) -> &'static str {
        match self {
            Environment::Production => "ProductionCertificate.cer",
            Environment::Sandbox => "SandboxCertificate.cer",
        }
    }
}

impl FromStr for Environment {
    type Err = MpesaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "sandbox" => Ok(Environment::Sandbox),
            _ => Err(MpesaError::Config(format!("Unsupported environment: {s}"))),
        }
    }
}

/// Kind of merchant shortcode the client operates as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortCodeType {
    Till,
    Paybill,
}

impl ShortCodeType {
    /// `IdentifierType` for the organization-info query.
    pub fn org_info_identifier(self) -> &'static str {
        match self {
            ShortCodeType::Till => "2",
            ShortCodeType::Paybill => "4",
        }
    }

    /// `IdentifierType` for transaction-status and balance queries.
    pub fn identifier_type(self) -> &'static str {
        match self {
            ShortCodeType::Paybill => "4",
            ShortCodeType::Till => "2",
        }
    }

    pub fn qr_trx_code(self) -> &'static str {
        match self {
            ShortCodeType::Paybill => "PB",
            ShortCodeType::Till => "BG",
        }
    }

    pub fn standing_order_transaction_type(self) -> &'static str {
        match self {
            ShortCodeType::Paybill => "Standing Order Customer Pay Bill",
            // Daraja's spelling.
            ShortCodeType::Till => "Standing Order Customer Pay Marchant",
        }
    }

    pub fn standing_order_receiver_identifier(self) -> &'static str {
        match self {
            ShortCodeType::Paybill => "4",
            ShortCodeType::Till => "2",
        }
    }
}

impl fmt::Display for ShortCodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortCodeType::Till => write!(f, "till"),
            ShortCodeType::Paybill => write!(f, "paybill"),
        }
    }
}

impl FromStr for ShortCodeType {
    type Err = MpesaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "till" => Ok(ShortCodeType::Till),
            "paybill" => Ok(ShortCodeType::Paybill),
            _ => Err(MpesaError::Validation(format!("Unsupported shortcode type: {s}"))),
        }
    }
}

/// Shortcode passkey and the initiator allowed to run administrative calls.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub pass_key: Option<String>,
    pub initiator_name: Option<String>,
    pub initiator_pass: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("pass_key", &redacted(&self.pass_key))
            .field("initiator_name", &self.initiator_name)
            .field("initiator_pass", &redacted(&self.initiator_pass))
            .finish()
    }
}

/// OAuth client credentials of the Daraja app.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
}

impl fmt::Debug for AppInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppInfo")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &redacted(&self.consumer_secret))
            .finish()
    }
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}

/// Caller-supplied configuration. Deserializes from the camelCase JSON shape
/// (`env`, `shortCodeType`, `credentials.passKey`, `appInfo.consumerKey`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub env: Option<Environment>,
    pub requester: Option<String>,
    pub short_code_type: Option<ShortCodeType>,
    pub business_short_code: Option<String>,
    pub credentials: Option<Credentials>,
    pub app_info: Option<AppInfo>,
    /// Overrides the environment's base URL (proxies, local mocks).
    pub base_url: Option<String>,
    /// PEM text of the Safaricom certificate. Takes precedence over
    /// `certificate_path`.
    pub certificate: Option<String>,
    /// Overrides the certificate location derived from `env`.
    pub certificate_path: Option<PathBuf>,
}

/// Where the RSA public certificate is loaded from.
#[derive(Clone, PartialEq, Eq)]
pub enum CertificateSource {
    /// PEM or DER bytes held in memory.
    Inline(Vec<u8>),
    File(PathBuf),
}

impl fmt::Debug for CertificateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateSource::Inline(bytes) => write!(f, "Inline({} bytes)", bytes.len()),
            CertificateSource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// Configuration with every required field present.
#[derive(Clone)]
pub struct ValidatedConfig {
    pub env: Environment,
    pub requester: String,
    pub short_code_type: ShortCodeType,
    pub business_short_code: String,
    pub pass_key: String,
    pub initiator_name: String,
    pub initiator_pass: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub base_url: String,
    pub certificate: CertificateSource,
}

impl fmt::Debug for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedConfig")
            .field("env", &self.env)
            .field("requester", &self.requester)
            .field("short_code_type", &self.short_code_type)
            .field("business_short_code", &self.business_short_code)
            .field("initiator_name", &self.initiator_name)
            .field("consumer_key", &self.consumer_key)
            .field("base_url", &self.base_url)
            .field("certificate", &self.certificate)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Check that every required field is present and non-empty.
    ///
    /// Top-level fields are checked first, then `credentials`, then
    /// `appInfo`; the first absent one is named in the error.
    pub fn validate(&self) -> Result<ValidatedConfig, MpesaError> {
        let env = self.env.ok_or_else(|| missing_field("env"))?;
        let credentials = self.credentials.as_ref().ok_or_else(|| missing_field("credentials"))?;
        let app_info = self.app_info.as_ref().ok_or_else(|| missing_field("appInfo"))?;
        let business_short_code = required(&self.business_short_code, "businessShortCode")?;
        let short_code_type = self.short_code_type.ok_or_else(|| missing_field("shortCodeType"))?;
        let requester = required(&self.requester, "requester")?;

        let pass_key = required(&credentials.pass_key, "passKey")?;
        let initiator_pass = required(&credentials.initiator_pass, "initiatorPass")?;
        let initiator_name = required(&credentials.initiator_name, "initiatorName")?;

        let consumer_key = required(&app_info.consumer_key, "consumerKey")?;
        let consumer_secret = required(&app_info.consumer_secret, "consumerSecret")?;

        let base_url = self
            .base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(env.base_url())
            .trim_end_matches('/')
            .to_string();
        let inline = self.certificate.as_deref().filter(|pem| !pem.is_empty());
        let certificate = match (inline, &self.certificate_path) {
            (Some(pem), _) => CertificateSource::Inline(pem.as_bytes().to_vec()),
            (None, Some(path)) => CertificateSource::File(path.clone()),
            (None, None) => {
                CertificateSource::File(PathBuf::from(DEFAULT_CERTIFICATE_DIR).join(env.certificate_file_name()))
            }
        };

        Ok(ValidatedConfig {
            env,
            requester,
            short_code_type,
            business_short_code,
            pass_key,
            initiator_name,
            initiator_pass,
            consumer_key,
            consumer_secret,
            base_url,
            certificate,
        })
    }

    /// Read the configuration from `MPESA_*` environment variables.
    ///
    /// Unset variables leave their field empty; `validate` reports them.
    pub fn from_env() -> Result<Self, MpesaError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup using the `MPESA_*` names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MpesaError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env: Option<Environment> = lookup("MPESA_ENV").map(|v| v.parse()).transpose()?;
        let short_code_type: Option<ShortCodeType> = lookup("MPESA_SHORTCODE_TYPE")
            .map(|v| {
                v.parse::<ShortCodeType>()
                    .map_err(|e| MpesaError::Config(e.to_string()))
            })
            .transpose()?;

        Ok(ClientConfig {
            env,
            requester: lookup("MPESA_REQUESTER"),
            short_code_type,
            business_short_code: lookup("MPESA_BUSINESS_SHORTCODE"),
            credentials: Some(Credentials {
                pass_key: lookup("MPESA_PASS_KEY"),
                initiator_name: lookup("MPESA_INITIATOR_NAME"),
                initiator_pass: lookup("MPESA_INITIATOR_PASS"),
            }),
            app_info: Some(AppInfo {
                consumer_key: lookup("MPESA_CONSUMER_KEY"),
                consumer_secret: lookup("MPESA_CONSUMER_SECRET"),
            }),
            base_url: lookup("MPESA_BASE_URL"),
            certificate: lookup("MPESA_CERTIFICATE"),
            certificate_path: lookup("MPESA_CERTIFICATE_PATH").map(PathBuf::from),
        })
    }
}

fn missing_field(name: &str) -> MpesaError {
    MpesaError::Config(format!("Missing required field: {name}"))
}

fn required(value: &Option<String>, name: &str) -> Result<String, MpesaError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| missing_field(name))
}
