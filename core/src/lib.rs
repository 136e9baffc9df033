//! Client for Safaricom's M-Pesa Daraja API.
//!
//! # Overview
//! `MpesaClient` wraps the Daraja business endpoints (STK push, B2C, B2B,
//! reversals, balance and status queries, QR codes, tax remittance, Ratiba
//! standing orders) behind typed request structs. Every call obtains a
//! fresh OAuth token, POSTs a JSON payload, and returns the response body
//! as `serde_json::Value` or a single `MpesaError`.
//!
//! # Design
//! - Configuration is validated and secrets derived once, in
//!   `MpesaClient::new`. The client is immutable afterwards.
//! - Each operation has a pure `build_*` counterpart that validates input and
//!   produces the wire payload; async operations only add I/O.
//! - HTTP goes through the `HttpTransport` trait. `UreqTransport` is the
//!   default; tests inject their own.
//! - Response and error shapes are not uniform across Daraja endpoints, so
//!   bodies stay untyped JSON.

pub mod auth;
pub mod client;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod payload;
pub mod phone;
pub mod types;

pub use client::MpesaClient;
pub use config::{AppInfo, CertificateSource, ClientConfig, Credentials, Environment, ShortCodeType};
pub use error::{ErrorKind, MpesaError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, UreqTransport};
pub use phone::normalize_phone_number;
pub use types::{
    AccountBalanceRequest, B2bExpressCheckoutRequest, B2bPaymentType, B2bRequest, B2cCommand, B2cRequest,
    QrCodeRequest, RegisterUrlRequest, ReversalRequest, StandingOrderFrequency, StandingOrderRequest, StkPushRequest,
    TaxRemittanceRequest, TransactionStatusRequest,
};
