//! Daraja API client.
//!
//! # Design
//! Each operation is split into a pure `build_*` method that validates the
//! input and produces the payload, and an async method that dispatches it
//! and checks the response. The builders touch no network, so a missing
//! argument fails before any token is requested, and request shapes can be
//! tested directly.
//!
//! `MpesaClient` holds no mutable state. The configuration and derived
//! secrets are fixed at construction, so a shared reference can serve
//! concurrent callers.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde_json::Value;

use crate::auth::TokenProvider;
use crate::config::{ClientConfig, ShortCodeType, ValidatedConfig};
use crate::credentials::DerivedSecrets;
use crate::dispatch::{ensure_success, ensure_success_without_response_message, RequestDispatcher};
use crate::error::MpesaError;
use crate::http::{HttpTransport, UreqTransport};
use crate::payload::{
    AccountBalancePayload, B2bExpressCheckoutPayload, B2bPayload, B2cPayload, OrgInfoPayload, QrCodePayload,
    RegisterUrlPayload, ReversalPayload, StandingOrderPayload, StkPushPayload, StkQueryPayload,
    TransactionStatusPayload,
};
use crate::phone::normalize_phone_number;
use crate::types::{
    AccountBalanceRequest, B2bExpressCheckoutRequest, B2bRequest, B2cRequest, QrCodeRequest, RegisterUrlRequest,
    ReversalRequest, StandingOrderRequest, StkPushRequest, TaxRemittanceRequest, TransactionStatusRequest,
};

pub const STK_PUSH: &str = "mpesa/stkpush/v1/processrequest";
pub const ORG_INFO: &str = "sfcverify/v1/query/info";
pub const QR_CODE: &str = "mpesa/qrcode/v1/generate";
pub const STK_PUSH_QUERY: &str = "mpesa/stkpushquery/v1/query";
pub const REGISTER_URL: &str = "mpesa/c2b/v2/registerurl";
pub const B2C_PAYMENT: &str = "mpesa/b2c/v1/paymentrequest";
pub const TRANSACTION_STATUS: &str = "mpesa/transactionstatus/v1/query";
pub const ACCOUNT_BALANCE: &str = "mpesa/accountbalance/v1/query";
pub const REVERSAL: &str = "mpesa/reversal/v1/request";
pub const TAX_REMITTANCE: &str = "mpesa/b2b/v1/remittax";
pub const B2B_PAYMENT: &str = "mpesa/b2b/v1/paymentrequest";
pub const B2B_EXPRESS_CHECKOUT: &str = "v1/ussdpush/get-msisdn";
pub const STANDING_ORDER: &str = "mpesa/standingorders/v1/create";

const KRA_SHORT_CODE: &str = "572572";
const DEFAULT_DESCRIPTION: &str = "Payment";
const DEFAULT_QR_SIZE: &str = "300";
const DEFAULT_RESPONSE_TYPE: &str = "Completed";
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Client for the M-Pesa Daraja API.
pub struct MpesaClient {
    config: ValidatedConfig,
    secrets: DerivedSecrets,
    dispatcher: RequestDispatcher,
}

impl fmt::Debug for MpesaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpesaClient")
            .field("config", &self.config)
            .field("secrets", &self.secrets)
            .finish_non_exhaustive()
    }
}

impl MpesaClient {
    /// Validate `config`, derive the password and security credential, and
    /// talk to Daraja over `UreqTransport`.
    pub fn new(config: ClientConfig) -> Result<Self, MpesaError> {
        Self::with_transport(config, Arc::new(UreqTransport::new()))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self, MpesaError> {
        let config = config.validate()?;
        let secrets = DerivedSecrets::derive(&config)?;
        let tokens = TokenProvider::new(
            &config.base_url,
            &config.consumer_key,
            &config.consumer_secret,
            Arc::clone(&transport),
        );
        let dispatcher = RequestDispatcher::new(&config.base_url, tokens, transport);
        Ok(Self {
            config,
            secrets,
            dispatcher,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Timestamp fixed at construction and sent with every password.
    pub fn timestamp(&self) -> &str {
        &self.secrets.timestamp
    }

    pub fn password(&self) -> &str {
        &self.secrets.password
    }

    pub fn security_credential(&self) -> &str {
        &self.secrets.security_credential
    }

    pub fn short_code_type(&self) -> ShortCodeType {
        self.config.short_code_type
    }

    pub fn business_short_code(&self) -> &str {
        &self.config.business_short_code
    }

    // -----------------------------------------------------------------------
    // Payload builders
    // -----------------------------------------------------------------------

    pub fn build_stk_push(&self, request: &StkPushRequest) -> Result<StkPushPayload, MpesaError> {
        let amount = require_amount(request.amount)?;
        let phone = require_phone(&request.phone_number, "PhoneNumber")?;
        let callback_url = require(&request.callback_url, "CallBackURL")?;
        let account_reference = require(&request.account_reference, "AccountReference")?;

        Ok(StkPushPayload {
            business_short_code: self.config.business_short_code.clone(),
            password: self.secrets.password.clone(),
            timestamp: self.secrets.timestamp.clone(),
            transaction_type: "CustomerPayBillOnline",
            amount,
            party_a: phone.clone(),
            party_b: self.config.business_short_code.clone(),
            phone_number: phone,
            callback_url,
            account_reference,
            transaction_desc: or_default(&request.transaction_desc, DEFAULT_DESCRIPTION),
        })
    }

    pub fn build_org_info(&self, kind: ShortCodeType, short_code: &str) -> Result<OrgInfoPayload, MpesaError> {
        Ok(OrgInfoPayload {
            identifier_type: kind.org_info_identifier(),
            identifier: require(short_code, "Identifier")?,
        })
    }

    pub fn build_qr_code(&self, request: &QrCodeRequest, merchant_name: &str) -> Result<QrCodePayload, MpesaError> {
        let (amount, ref_no) = validate_qr_code(request)?;
        Ok(QrCodePayload {
            merchant_name: require(merchant_name, "MerchantName")?,
            ref_no,
            amount,
            trx_code: self.config.short_code_type.qr_trx_code(),
            cpi: or_default(&request.cpi, &self.config.business_short_code),
            size: or_default(&request.size, DEFAULT_QR_SIZE),
        })
    }

    pub fn build_stk_push_query(&self, checkout_request_id: &str) -> Result<StkQueryPayload, MpesaError> {
        Ok(StkQueryPayload {
            business_short_code: self.config.business_short_code.clone(),
            password: self.secrets.password.clone(),
            timestamp: self.secrets.timestamp.clone(),
            checkout_request_id: require(checkout_request_id, "CheckoutRequestID")?,
        })
    }

    pub fn build_register_url(&self, request: &RegisterUrlRequest) -> Result<RegisterUrlPayload, MpesaError> {
        Ok(RegisterUrlPayload {
            short_code: self.config.business_short_code.clone(),
            response_type: or_default(&request.response_type, DEFAULT_RESPONSE_TYPE),
            confirmation_url: require(&request.confirmation_url, "ConfirmationURL")?,
            validation_url: require(&request.validation_url, "ValidationURL")?,
        })
    }

    pub fn build_b2c(&self, request: &B2cRequest) -> Result<B2cPayload, MpesaError> {
        let amount = require_amount(request.amount)?;
        let phone = require_phone(&request.phone_number, "PhoneNumber")?;
        let result_url = require(&request.result_url, "ResultURL")?;

        Ok(B2cPayload {
            initiator_name: self.config.initiator_name.clone(),
            security_credential: self.secrets.security_credential.clone(),
            command_id: request.command_id.as_str(),
            amount,
            party_a: self.config.business_short_code.clone(),
            party_b: phone,
            remarks: or_default(&request.remarks, DEFAULT_DESCRIPTION),
            queue_timeout_url: or_default(&request.queue_timeout_url, &result_url),
            result_url,
            occasion: or_default(&request.occasion, ""),
        })
    }

    pub fn build_transaction_status(
        &self,
        request: &TransactionStatusRequest,
    ) -> Result<TransactionStatusPayload, MpesaError> {
        let transaction_id = require(&request.transaction_id, "TransactionID")?;
        let result_url = require(&request.result_url, "ResultURL")?;

        Ok(TransactionStatusPayload {
            initiator: self.config.initiator_name.clone(),
            security_credential: self.secrets.security_credential.clone(),
            command_id: "TransactionStatusQuery",
            transaction_id,
            party_a: self.config.business_short_code.clone(),
            identifier_type: self.config.short_code_type.identifier_type(),
            queue_timeout_url: or_default(&request.queue_timeout_url, &result_url),
            result_url,
            remarks: or_default(&request.remarks, DEFAULT_DESCRIPTION),
            occasion: or_default(&request.occasion, ""),
        })
    }

    pub fn build_account_balance(&self, request: &AccountBalanceRequest) -> Result<AccountBalancePayload, MpesaError> {
        let result_url = require(&request.result_url, "ResultURL")?;

        Ok(AccountBalancePayload {
            initiator: self.config.initiator_name.clone(),
            security_credential: self.secrets.security_credential.clone(),
            command_id: "AccountBalance",
            party_a: self.config.business_short_code.clone(),
            identifier_type: self.config.short_code_type.identifier_type(),
            remarks: or_default(&request.remarks, DEFAULT_DESCRIPTION),
            queue_timeout_url: or_default(&request.queue_timeout_url, &result_url),
            result_url,
        })
    }

    pub fn build_reversal(&self, request: &ReversalRequest) -> Result<ReversalPayload, MpesaError> {
        let transaction_id = require(&request.transaction_id, "TransactionID")?;
        let amount = require_amount(request.amount)?;
        let result_url = require(&request.result_url, "ResultURL")?;

        Ok(ReversalPayload {
            initiator: self.config.initiator_name.clone(),
            security_credential: self.secrets.security_credential.clone(),
            command_id: "TransactionReversal",
            transaction_id,
            amount,
            receiver_party: self.config.business_short_code.clone(),
            reciever_identifier_type: "11",
            queue_timeout_url: or_default(&request.queue_timeout_url, &result_url),
            result_url,
            remarks: or_default(&request.remarks, DEFAULT_DESCRIPTION),
            occasion: or_default(&request.occasion, ""),
        })
    }

    pub fn build_tax_remittance(&self, request: &TaxRemittanceRequest) -> Result<B2bPayload, MpesaError> {
        let amount = require_amount(request.amount)?;
        let account_reference = require(&request.account_reference, "AccountReference")?;
        let result_url = require(&request.result_url, "ResultURL")?;

        Ok(B2bPayload {
            initiator: self.config.initiator_name.clone(),
            security_credential: self.secrets.security_credential.clone(),
            command_id: "PayTaxToKRA",
            sender_identifier_type: "4",
            reciever_identifier_type: "4",
            amount,
            party_a: self.config.business_short_code.clone(),
            party_b: KRA_SHORT_CODE.to_string(),
            account_reference,
            requester: None,
            remarks: or_default(&request.remarks, DEFAULT_DESCRIPTION),
            queue_timeout_url: or_default(&request.queue_timeout_url, &result_url),
            result_url,
        })
    }

    pub fn build_b2b(&self, request: &B2bRequest) -> Result<B2bPayload, MpesaError> {
        let amount = require_amount(request.amount)?;
        let party_b = require(&request.receiver_short_code, "PartyB")?;
        let account_reference = require(&request.account_reference, "AccountReference")?;
        let result_url = require(&request.result_url, "ResultURL")?;
        let requester = non_empty(&request.requester).unwrap_or_else(|| self.config.requester.clone());
        let requester = require_phone(&requester, "Requester")?;

        Ok(B2bPayload {
            initiator: self.config.initiator_name.clone(),
            security_credential: self.secrets.security_credential.clone(),
            command_id: request.payment_type.command_id(),
            sender_identifier_type: "4",
            reciever_identifier_type: "4",
            amount,
            party_a: self.config.business_short_code.clone(),
            party_b,
            account_reference,
            requester: Some(requester),
            remarks: or_default(&request.remarks, DEFAULT_DESCRIPTION),
            queue_timeout_url: or_default(&request.queue_timeout_url, &result_url),
            result_url,
        })
    }

    pub fn build_b2b_express_checkout(
        &self,
        request: &B2bExpressCheckoutRequest,
    ) -> Result<B2bExpressCheckoutPayload, MpesaError> {
        let amount = require_amount(request.amount)?;
        let receiver_short_code = require(&request.receiver_short_code, "receiverShortCode")?;
        let partner_name = require(&request.partner_name, "partnerName")?;
        let callback_url = require(&request.callback_url, "callbackUrl")?;

        Ok(B2bExpressCheckoutPayload {
            primary_short_code: self.config.business_short_code.clone(),
            receiver_short_code,
            amount: amount.to_string(),
            payment_ref: non_empty(&request.payment_ref).unwrap_or_else(|| generate_reference("PAY")),
            callback_url,
            partner_name,
            request_ref_id: non_empty(&request.request_ref_id).unwrap_or_else(|| generate_reference("REQ")),
        })
    }

    pub fn build_standing_order(&self, request: &StandingOrderRequest) -> Result<StandingOrderPayload, MpesaError> {
        let standing_order_name = require(&request.standing_order_name, "StandingOrderName")?;
        let start_date = require(&request.start_date, "StartDate")?;
        let end_date = require(&request.end_date, "EndDate")?;
        let amount = require_amount(request.amount)?;
        let phone = require_phone(&request.phone_number, "PhoneNumber")?;
        let callback_url = require(&request.callback_url, "CallBackURL")?;
        let account_reference = require(&request.account_reference, "AccountReference")?;
        let kind = self.config.short_code_type;

        Ok(StandingOrderPayload {
            standing_order_name,
            start_date,
            end_date,
            business_short_code: self.config.business_short_code.clone(),
            transaction_type: kind.standing_order_transaction_type(),
            receiver_party_identifier_type: kind.standing_order_receiver_identifier(),
            amount: amount.to_string(),
            party_a: phone,
            callback_url,
            account_reference,
            transaction_desc: or_default(&request.transaction_desc, DEFAULT_DESCRIPTION),
            frequency: request.frequency.code(),
            password: self.secrets.password.clone(),
            timestamp: self.secrets.timestamp.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Registered name of the client's own shortcode.
    pub async fn get_business_name(&self) -> Result<String, MpesaError> {
        let info = self
            .query_org_info(self.config.short_code_type, &self.config.business_short_code)
            .await?;
        info.get("OrganizationName")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| MpesaError::Request("OrganizationName missing from organization info".to_string()))
    }

    /// Prompt a customer's phone to authorize a payment.
    pub async fn stk_push(&self, request: &StkPushRequest) -> Result<Value, MpesaError> {
        let payload = self.build_stk_push(request)?;
        ensure_success(self.dispatcher.send(STK_PUSH, &payload).await?)
    }

    pub async fn query_org_info(&self, kind: ShortCodeType, short_code: &str) -> Result<Value, MpesaError> {
        let payload = self.build_org_info(kind, short_code)?;
        ensure_success(self.dispatcher.send(ORG_INFO, &payload).await?)
    }

    /// Generate a QR code for the client's shortcode. Looks up the merchant
    /// name first, so this costs two business calls.
    pub async fn generate_qr_code(&self, request: &QrCodeRequest) -> Result<Value, MpesaError> {
        validate_qr_code(request)?;
        let merchant_name = self.get_business_name().await?;
        let payload = self.build_qr_code(request, &merchant_name)?;
        ensure_success(self.dispatcher.send(QR_CODE, &payload).await?)
    }

    pub async fn stk_push_query(&self, checkout_request_id: &str) -> Result<Value, MpesaError> {
        let payload = self.build_stk_push_query(checkout_request_id)?;
        ensure_success(self.dispatcher.send(STK_PUSH_QUERY, &payload).await?)
    }

    pub async fn register_url(&self, request: &RegisterUrlRequest) -> Result<Value, MpesaError> {
        let payload = self.build_register_url(request)?;
        ensure_success(self.dispatcher.send(REGISTER_URL, &payload).await?)
    }

    pub async fn initiate_b2c(&self, request: &B2cRequest) -> Result<Value, MpesaError> {
        let payload = self.build_b2c(request)?;
        ensure_success(self.dispatcher.send(B2C_PAYMENT, &payload).await?)
    }

    pub async fn transaction_status(&self, request: &TransactionStatusRequest) -> Result<Value, MpesaError> {
        let payload = self.build_transaction_status(request)?;
        ensure_success(self.dispatcher.send(TRANSACTION_STATUS, &payload).await?)
    }

    pub async fn account_balance(&self, request: &AccountBalanceRequest) -> Result<Value, MpesaError> {
        let payload = self.build_account_balance(request)?;
        ensure_success(self.dispatcher.send(ACCOUNT_BALANCE, &payload).await?)
    }

    pub async fn reverse_transaction(&self, request: &ReversalRequest) -> Result<Value, MpesaError> {
        let payload = self.build_reversal(request)?;
        ensure_success(self.dispatcher.send(REVERSAL, &payload).await?)
    }

    pub async fn tax_remittance(&self, request: &TaxRemittanceRequest) -> Result<Value, MpesaError> {
        let payload = self.build_tax_remittance(request)?;
        ensure_success(self.dispatcher.send(TAX_REMITTANCE, &payload).await?)
    }

    pub async fn initiate_b2b(&self, request: &B2bRequest) -> Result<Value, MpesaError> {
        let payload = self.build_b2b(request)?;
        ensure_success(self.dispatcher.send(B2B_PAYMENT, &payload).await?)
    }

    pub async fn initiate_b2b_express_checkout(&self, request: &B2bExpressCheckoutRequest) -> Result<Value, MpesaError> {
        let payload = self.build_b2b_express_checkout(request)?;
        ensure_success_without_response_message(self.dispatcher.send(B2B_EXPRESS_CHECKOUT, &payload).await?)
    }

    /// Create a Ratiba standing order.
    pub async fn mpesa_ratiba(&self, request: &StandingOrderRequest) -> Result<Value, MpesaError> {
        let payload = self.build_standing_order(request)?;
        ensure_success(self.dispatcher.send(STANDING_ORDER, &payload).await?)
    }
}

fn validate_qr_code(request: &QrCodeRequest) -> Result<(u64, String), MpesaError> {
    Ok((require_amount(request.amount)?, require(&request.ref_no, "RefNo")?))
}

fn require(value: &str, field: &str) -> Result<String, MpesaError> {
    if value.is_empty() {
        return Err(MpesaError::missing(field));
    }
    Ok(value.to_string())
}

fn require_amount(amount: u64) -> Result<u64, MpesaError> {
    if amount == 0 {
        return Err(MpesaError::missing("Amount"));
    }
    Ok(amount)
}

fn require_phone(phone: &str, field: &str) -> Result<String, MpesaError> {
    normalize_phone_number(phone).ok_or_else(|| MpesaError::missing(field))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}

fn or_default(value: &Option<String>, default: &str) -> String {
    non_empty(value).unwrap_or_else(|| default.to_string())
}

/// `{prefix}_{epochMillis}_{9 base-36 characters}`.
fn generate_reference(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect();
    format!("{prefix}_{}_{suffix}", Utc::now().timestamp_millis())
}
