//! Inputs to the business operations.
//!
//! # Design
//! One struct per operation, owned `String` fields, `Default` so callers
//! can spell out only what they need with `..Default::default()`. Optional
//! fields are `Option`; the client fills in the documented defaults.
//! Required fields are still plain values: an empty string or a zero
//! amount counts as missing and is rejected before any I/O.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MpesaError;

/// Lipa na M-Pesa Online (STK push) prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StkPushRequest {
    pub amount: u64,
    pub phone_number: String,
    pub callback_url: String,
    pub account_reference: String,
    /// Defaults to `"Payment"`.
    pub transaction_desc: Option<String>,
}

/// Dynamic QR code for the client's own shortcode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QrCodeRequest {
    pub amount: u64,
    pub ref_no: String,
    /// Pixel size of the image; defaults to `"300"`.
    pub size: Option<String>,
    /// Credit party identifier; defaults to the business shortcode.
    pub cpi: Option<String>,
}

/// C2B confirmation/validation URL registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterUrlRequest {
    pub confirmation_url: String,
    pub validation_url: String,
    /// `"Completed"` or `"Cancelled"`; defaults to `"Completed"`.
    pub response_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum B2cCommand {
    #[default]
    BusinessPayment,
    SalaryPayment,
    PromotionPayment,
}

impl B2cCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            B2cCommand::BusinessPayment => "BusinessPayment",
            B2cCommand::SalaryPayment => "SalaryPayment",
            B2cCommand::PromotionPayment => "PromotionPayment",
        }
    }
}

/// Business-to-customer disbursement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct B2cRequest {
    pub amount: u64,
    pub phone_number: String,
    pub command_id: B2cCommand,
    pub remarks: Option<String>,
    pub result_url: String,
    /// Defaults to `result_url`.
    pub queue_timeout_url: Option<String>,
    pub occasion: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionStatusRequest {
    pub transaction_id: String,
    pub result_url: String,
    pub queue_timeout_url: Option<String>,
    pub remarks: Option<String>,
    pub occasion: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountBalanceRequest {
    pub result_url: String,
    pub queue_timeout_url: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReversalRequest {
    pub transaction_id: String,
    pub amount: u64,
    pub result_url: String,
    pub queue_timeout_url: Option<String>,
    pub remarks: Option<String>,
    pub occasion: Option<String>,
}

/// Tax payment to KRA. `account_reference` is the KRA payment registration
/// number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxRemittanceRequest {
    pub amount: u64,
    pub account_reference: String,
    pub result_url: String,
    pub queue_timeout_url: Option<String>,
    pub remarks: Option<String>,
}

/// Kind of business-to-business transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum B2bPaymentType {
    #[default]
    PaybillToPaybill,
    PaybillToTill,
    #[serde(rename = "B2BAccountTopUp")]
    B2bAccountTopUp,
}

impl B2bPaymentType {
    pub fn command_id(self) -> &'static str {
        match self {
            B2bPaymentType::PaybillToPaybill => "BusinessPayBill",
            B2bPaymentType::PaybillToTill => "BusinessBuyGoods",
            B2bPaymentType::B2bAccountTopUp => "BusinessPayToBulk",
        }
    }
}

impl FromStr for B2bPaymentType {
    type Err = MpesaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PaybillToPaybill" => Ok(B2bPaymentType::PaybillToPaybill),
            "PaybillToTill" => Ok(B2bPaymentType::PaybillToTill),
            "B2BAccountTopUp" => Ok(B2bPaymentType::B2bAccountTopUp),
            other => Err(MpesaError::Validation(format!("Unsupported payment type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct B2bRequest {
    pub amount: u64,
    /// Receiving paybill or till.
    pub receiver_short_code: String,
    pub payment_type: B2bPaymentType,
    pub account_reference: String,
    /// Phone number of the customer the payment is made on behalf of;
    /// defaults to the configured requester.
    pub requester: Option<String>,
    pub result_url: String,
    pub queue_timeout_url: Option<String>,
    pub remarks: Option<String>,
}

/// USSD push asking a merchant to approve a till-to-till payment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct B2bExpressCheckoutRequest {
    pub amount: u64,
    pub receiver_short_code: String,
    pub partner_name: String,
    pub callback_url: String,
    /// Generated as `PAY_{epochMillis}_{random}` when absent.
    pub payment_ref: Option<String>,
    /// Generated as `REQ_{epochMillis}_{random}` when absent.
    pub request_ref_id: Option<String>,
}

/// How often a Ratiba standing order runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandingOrderFrequency {
    OneOff,
    #[default]
    Daily,
    Weekly,
    Monthly,
    BiMonthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl StandingOrderFrequency {
    pub fn code(self) -> &'static str {
        match self {
            StandingOrderFrequency::OneOff => "1",
            StandingOrderFrequency::Daily => "2",
            StandingOrderFrequency::Weekly => "3",
            StandingOrderFrequency::Monthly => "4",
            StandingOrderFrequency::BiMonthly => "5",
            StandingOrderFrequency::Quarterly => "6",
            StandingOrderFrequency::HalfYearly => "7",
            StandingOrderFrequency::Yearly => "8",
        }
    }
}

/// Ratiba standing order. Dates are `YYYYMMDD`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StandingOrderRequest {
    pub standing_order_name: String,
    pub start_date: String,
    pub end_date: String,
    pub amount: u64,
    pub phone_number: String,
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: Option<String>,
    pub frequency: StandingOrderFrequency,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn b2b_command_ids() {
        assert_eq!(B2bPaymentType::PaybillToPaybill.command_id(), "BusinessPayBill");
        assert_eq!(B2bPaymentType::PaybillToTill.command_id(), "BusinessBuyGoods");
        assert_eq!(B2bPaymentType::B2bAccountTopUp.command_id(), "BusinessPayToBulk");
    }

    #[test]
    fn b2b_payment_type_parses_wire_names() {
        assert_eq!("PaybillToTill".parse::<B2bPaymentType>().unwrap(), B2bPaymentType::PaybillToTill);
        assert_eq!(
            "B2BAccountTopUp".parse::<B2bPaymentType>().unwrap(),
            B2bPaymentType::B2bAccountTopUp
        );
        let err = "TillToTill".parse::<B2bPaymentType>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported payment type: TillToTill");
    }

    #[test]
    fn frequency_defaults_to_daily() {
        assert_eq!(StandingOrderFrequency::default().code(), "2");
        assert_eq!(StandingOrderFrequency::Yearly.code(), "8");
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let req: B2cRequest = serde_json::from_str(
            r#"{"amount":10,"phoneNumber":"0712345678","resultUrl":"https://x/result"}"#,
        )
        .unwrap();
        assert_eq!(req.command_id, B2cCommand::BusinessPayment);
        assert!(req.queue_timeout_url.is_none());

        let b2b: B2bRequest = serde_json::from_str(r#"{"paymentType":"B2BAccountTopUp"}"#).unwrap();
        assert_eq!(b2b.payment_type, B2bPaymentType::B2bAccountTopUp);
    }
}
