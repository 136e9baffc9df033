//! Outbound Daraja request bodies.
//!
//! Field names follow the Daraja wire format exactly, including its
//! inconsistencies (`CallBackURL`, `QueueTimeOutURL`, `RecieverIdentifierType`).

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushPayload {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: &'static str,
    pub amount: u64,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrgInfoPayload {
    pub identifier_type: &'static str,
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QrCodePayload {
    pub merchant_name: String,
    pub ref_no: String,
    pub amount: u64,
    pub trx_code: &'static str,
    #[serde(rename = "CPI")]
    pub cpi: String,
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkQueryPayload {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterUrlPayload {
    pub short_code: String,
    pub response_type: String,
    #[serde(rename = "ConfirmationURL")]
    pub confirmation_url: String,
    #[serde(rename = "ValidationURL")]
    pub validation_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct B2cPayload {
    pub initiator_name: String,
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: &'static str,
    pub amount: u64,
    pub party_a: String,
    pub party_b: String,
    pub remarks: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_timeout_url: String,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
    pub occasion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionStatusPayload {
    pub initiator: String,
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: &'static str,
    #[serde(rename = "TransactionID")]
    pub transaction_id: String,
    pub party_a: String,
    pub identifier_type: &'static str,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_timeout_url: String,
    pub remarks: String,
    pub occasion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountBalancePayload {
    pub initiator: String,
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: &'static str,
    pub party_a: String,
    pub identifier_type: &'static str,
    pub remarks: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_timeout_url: String,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReversalPayload {
    pub initiator: String,
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: &'static str,
    #[serde(rename = "TransactionID")]
    pub transaction_id: String,
    pub amount: u64,
    pub receiver_party: String,
    pub reciever_identifier_type: &'static str,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_timeout_url: String,
    pub remarks: String,
    pub occasion: String,
}

/// Shared by tax remittance and B2B payments; tax leaves `requester` unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct B2bPayload {
    pub initiator: String,
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: &'static str,
    pub sender_identifier_type: &'static str,
    pub reciever_identifier_type: &'static str,
    pub amount: u64,
    pub party_a: String,
    pub party_b: String,
    pub account_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
    pub remarks: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_timeout_url: String,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct B2bExpressCheckoutPayload {
    pub primary_short_code: String,
    pub receiver_short_code: String,
    pub amount: String,
    pub payment_ref: String,
    pub callback_url: String,
    pub partner_name: String,
    #[serde(rename = "RequestRefID")]
    pub request_ref_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StandingOrderPayload {
    pub standing_order_name: String,
    pub start_date: String,
    pub end_date: String,
    pub business_short_code: String,
    pub transaction_type: &'static str,
    pub receiver_party_identifier_type: &'static str,
    pub amount: String,
    pub party_a: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
    pub frequency: &'static str,
    pub password: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_match_daraja() {
        let payload = ReversalPayload {
            initiator: "api".to_string(),
            security_credential: "cred".to_string(),
            command_id: "TransactionReversal",
            transaction_id: "OEI2AK4Q16".to_string(),
            amount: 10,
            receiver_party: "600000".to_string(),
            reciever_identifier_type: "11",
            result_url: "https://x/result".to_string(),
            queue_timeout_url: "https://x/timeout".to_string(),
            remarks: "Payment".to_string(),
            occasion: String::new(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        for key in [
            "Initiator",
            "SecurityCredential",
            "CommandID",
            "TransactionID",
            "Amount",
            "ReceiverParty",
            "RecieverIdentifierType",
            "ResultURL",
            "QueueTimeOutURL",
            "Remarks",
            "Occasion",
        ] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(keys.len(), 11);
    }

    #[test]
    fn express_checkout_is_camel_case() {
        let payload = B2bExpressCheckoutPayload {
            primary_short_code: "000001".to_string(),
            receiver_short_code: "000002".to_string(),
            amount: "100".to_string(),
            payment_ref: "PAY_1".to_string(),
            callback_url: "https://x/cb".to_string(),
            partner_name: "Vendor".to_string(),
            request_ref_id: "REQ_1".to_string(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["primaryShortCode"], "000001");
        assert_eq!(value["callbackUrl"], "https://x/cb");
        assert_eq!(value["RequestRefID"], "REQ_1");
    }

    #[test]
    fn b2b_requester_is_omitted_when_unset() {
        let payload = B2bPayload {
            initiator: "api".to_string(),
            security_credential: "cred".to_string(),
            command_id: "PayTaxToKRA",
            sender_identifier_type: "4",
            reciever_identifier_type: "4",
            amount: 1,
            party_a: "600000".to_string(),
            party_b: "572572".to_string(),
            account_reference: "PRN".to_string(),
            requester: None,
            remarks: "Payment".to_string(),
            queue_timeout_url: "q".to_string(),
            result_url: "r".to_string(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("Requester").is_none());
    }
}
