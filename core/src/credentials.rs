//! Construction-time secret derivation.
//!
//! # Design
//! The shortcode password and the initiator security credential are derived
//! once, when the client is built, and never change afterwards. The
//! timestamp baked into the password is fixed at the same moment, so a
//! long-lived client keeps sending it; rebuild the client to refresh it.
//!
//! A certificate file is read into memory, used, and dropped inside
//! `DerivedSecrets::derive`; no handle outlives construction.

use std::borrow::Cow;
use std::fmt;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::{DateTime, Duration, Utc};
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use x509_cert::der::{Decode, DecodePem, Encode};
use x509_cert::Certificate;

use crate::config::{CertificateSource, ValidatedConfig};
use crate::error::MpesaError;

/// Daraja validates timestamps against East Africa Time (UTC+3).
const EAT_OFFSET_HOURS: i64 = 3;

/// Current time as the 14-digit `YYYYMMDDHHmmss` Daraja timestamp.
pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    (at + Duration::hours(EAT_OFFSET_HOURS))
        .format("%Y%m%d%H%M%S")
        .to_string()
}

/// base64 of `short_code ∥ pass_key ∥ timestamp`.
pub fn password(short_code: &str, pass_key: &str, timestamp: &str) -> String {
    BASE64_STANDARD.encode(format!("{short_code}{pass_key}{timestamp}"))
}

/// Encrypt the initiator password with the certificate's RSA public key
/// (PKCS#1 v1.5) and base64 the ciphertext.
///
/// `certificate` may be PEM or DER encoded.
pub fn security_credential(initiator_pass: &str, certificate: &[u8]) -> Result<String, MpesaError> {
    let public_key = public_key_from_certificate(certificate)?;
    let ciphertext = public_key
        .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, initiator_pass.as_bytes())
        .map_err(|e| MpesaError::Config(format!("Failed to encrypt initiator password: {e}")))?;
    Ok(BASE64_STANDARD.encode(ciphertext))
}

fn public_key_from_certificate(bytes: &[u8]) -> Result<RsaPublicKey, MpesaError> {
    let is_pem = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .is_some_and(|start| bytes[start..].starts_with(b"-----BEGIN"));

    let certificate = if is_pem {
        Certificate::from_pem(bytes)
    } else {
        Certificate::from_der(bytes)
    }
    .map_err(|e| MpesaError::Config(format!("Invalid certificate: {e}")))?;

    let spki = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| MpesaError::Config(format!("Invalid certificate public key: {e}")))?;
    RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| MpesaError::Config(format!("Certificate does not hold an RSA public key: {e}")))
}

/// Values derived from the configuration when the client is built.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedSecrets {
    pub timestamp: String,
    pub password: String,
    pub security_credential: String,
}

impl fmt::Debug for DerivedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedSecrets")
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

impl DerivedSecrets {
    /// Read the configured certificate and derive all secrets at the
    /// current time.
    pub fn derive(config: &ValidatedConfig) -> Result<Self, MpesaError> {
        let certificate = match &config.certificate {
            CertificateSource::Inline(bytes) => Cow::Borrowed(bytes.as_slice()),
            CertificateSource::File(path) => Cow::Owned(std::fs::read(path).map_err(|e| {
                MpesaError::Config(format!("Failed to read certificate {}: {e}", path.display()))
            })?),
        };
        Self::from_certificate(config, &certificate, timestamp_now())
    }

    pub fn from_certificate(
        config: &ValidatedConfig,
        certificate: &[u8],
        timestamp: String,
    ) -> Result<Self, MpesaError> {
        let password = password(&config.business_short_code, &config.pass_key, &timestamp);
        let security_credential = security_credential(&config.initiator_pass, certificate)?;
        Ok(DerivedSecrets {
            timestamp,
            password,
            security_credential,
        })
    }
}
