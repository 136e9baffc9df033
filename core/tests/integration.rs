//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock Daraja server on a random port, then drives every client
//! operation over real HTTP through the default `UreqTransport`. Validates
//! that token acquisition, payload building, and response checking work
//! together with an actual server.

use mock_server::MockDaraja;
use mpesa_core::{
    AccountBalanceRequest, AppInfo, B2bExpressCheckoutRequest, B2bPaymentType, B2bRequest, B2cRequest, ClientConfig,
    Credentials, Environment, ErrorKind, MpesaClient, QrCodeRequest, RegisterUrlRequest, ReversalRequest,
    ShortCodeType, StandingOrderRequest, StkPushRequest, TaxRemittanceRequest, TransactionStatusRequest,
};
use serde_json::json;

const CERT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test-certificate.cer");
const RESULT_URL: &str = "https://example.com/result";

/// Serve `state` on a random port from its own thread and return the base URL.
fn start_mock(state: MockDaraja) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, state).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn config(base_url: &str) -> ClientConfig {
    ClientConfig {
        env: Some(Environment::Sandbox),
        requester: Some("0708374149".to_string()),
        short_code_type: Some(ShortCodeType::Paybill),
        business_short_code: Some("600000".to_string()),
        credentials: Some(Credentials {
            pass_key: Some("bfb279f9aa9bdbcf158e97dd71a467cd2e0c893059b10f78e6b72ada1ed2c919".to_string()),
            initiator_name: Some("testapi".to_string()),
            initiator_pass: Some("Safaricom999!*!".to_string()),
        }),
        app_info: Some(AppInfo {
            consumer_key: Some("key".to_string()),
            consumer_secret: Some("secret".to_string()),
        }),
        base_url: Some(base_url.to_string()),
        certificate: None,
        certificate_path: Some(CERT.into()),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn every_operation_round_trips() {
    let state = MockDaraja::new()
        .with_credentials("key", "secret")
        .with_organization_name("Acme Ltd");
    let base_url = start_mock(state.clone());
    let client = MpesaClient::new(config(&base_url)).unwrap();

    // STK push and its status query.
    let pushed = client
        .stk_push(&StkPushRequest {
            amount: 1,
            phone_number: "0712345678".to_string(),
            callback_url: "https://example.com/callback".to_string(),
            account_reference: "INV-1".to_string(),
            transaction_desc: None,
        })
        .await
        .unwrap();
    assert_eq!(pushed["ResponseCode"], "0");
    let checkout_id = pushed["CheckoutRequestID"].as_str().unwrap();

    let queried = client.stk_push_query(checkout_id).await.unwrap();
    assert_eq!(queried["CheckoutRequestID"], checkout_id);

    assert_eq!(client.get_business_name().await.unwrap(), "Acme Ltd");

    let qr = client
        .generate_qr_code(&QrCodeRequest {
            amount: 50,
            ref_no: "INV-9".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(qr["ResponseCode"], "00");

    let registered = client
        .register_url(&RegisterUrlRequest {
            confirmation_url: "https://example.com/confirm".to_string(),
            validation_url: "https://example.com/validate".to_string(),
            response_type: None,
        })
        .await
        .unwrap();
    assert_eq!(registered["ResponseDescription"], "Success");

    let b2c = client
        .initiate_b2c(&B2cRequest {
            amount: 100,
            phone_number: "0712345678".to_string(),
            result_url: RESULT_URL.to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(b2c["ResponseCode"], "0");

    client
        .transaction_status(&TransactionStatusRequest {
            transaction_id: "OEI2AK4Q16".to_string(),
            result_url: RESULT_URL.to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    client
        .account_balance(&AccountBalanceRequest {
            result_url: RESULT_URL.to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    client
        .reverse_transaction(&ReversalRequest {
            transaction_id: "OEI2AK4Q16".to_string(),
            amount: 100,
            result_url: RESULT_URL.to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    client
        .tax_remittance(&TaxRemittanceRequest {
            amount: 100,
            account_reference: "PRN1234XN".to_string(),
            result_url: RESULT_URL.to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    client
        .initiate_b2b(&B2bRequest {
            amount: 100,
            receiver_short_code: "000000".to_string(),
            payment_type: B2bPaymentType::PaybillToTill,
            account_reference: "353353".to_string(),
            result_url: RESULT_URL.to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let express = client
        .initiate_b2b_express_checkout(&B2bExpressCheckoutRequest {
            amount: 100,
            receiver_short_code: "000002".to_string(),
            partner_name: "Vendor".to_string(),
            callback_url: "https://example.com/cb".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(express["status"], "USSD Initiated Successfully");

    let ratiba = client
        .mpesa_ratiba(&StandingOrderRequest {
            standing_order_name: "Rent".to_string(),
            start_date: "20250101".to_string(),
            end_date: "20251231".to_string(),
            amount: 4500,
            phone_number: "0712345678".to_string(),
            callback_url: "https://example.com/ratiba".to_string(),
            account_reference: "Flat 4".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(ratiba["ResponseHeader"]["responseCode"], "200");

    let recorded = state.requests().await;
    // The QR code call looks up the business name first.
    assert_eq!(recorded.len(), 14);
    assert_eq!(state.token_requests().await, 14);
    assert!(recorded
        .iter()
        .all(|r| r.authorization.as_deref().is_some_and(|a| a.starts_with("Bearer "))));

    let stk = &recorded[0];
    assert_eq!(stk.path, "/mpesa/stkpush/v1/processrequest");
    assert_eq!(stk.body["PhoneNumber"], "254712345678");
    assert_eq!(stk.body["Password"], client.password());

    let b2b = recorded
        .iter()
        .find(|r| r.path == "/mpesa/b2b/v1/paymentrequest")
        .unwrap();
    assert_eq!(b2b.body["CommandID"], "BusinessBuyGoods");
    assert_eq!(b2b.body["Requester"], "254708374149");
}

#[tokio::test(flavor = "multi_thread")]
async fn response_message_surfaces_as_error() {
    let state = MockDaraja::new();
    state
        .respond_with(
            "/mpesa/stkpush/v1/processrequest",
            400,
            json!({"ResponseMessage": "Invalid Amount"}),
        )
        .await;
    let client = MpesaClient::new(config(&start_mock(state))).unwrap();

    let err = client
        .stk_push(&StkPushRequest {
            amount: 1,
            phone_number: "0712345678".to_string(),
            callback_url: "https://example.com/callback".to_string(),
            account_reference: "INV-1".to_string(),
            transaction_desc: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Request);
    assert_eq!(err.to_string(), "Invalid Amount");
}

#[tokio::test(flavor = "multi_thread")]
async fn error_message_on_failure_status() {
    let state = MockDaraja::new();
    state
        .respond_with(
            "/mpesa/b2c/v1/paymentrequest",
            500,
            json!({"requestId": "1", "errorCode": "500.003.1001", "errorMessage": "Internal Server Error"}),
        )
        .await;
    let client = MpesaClient::new(config(&start_mock(state))).unwrap();

    let err = client
        .initiate_b2c(&B2cRequest {
            amount: 100,
            phone_number: "0712345678".to_string(),
            result_url: RESULT_URL.to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Internal Server Error");
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_credentials_stop_before_business_request() {
    let state = MockDaraja::new().with_credentials("key", "not-the-secret");
    let client = MpesaClient::new(config(&start_mock(state.clone()))).unwrap();

    let err = client.stk_push_query("ws_CO_1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(
        err.to_string(),
        "Failed to obtain access token: Invalid Authentication passed"
    );
    assert_eq!(state.token_requests().await, 1);
    assert!(state.requests().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_server_is_auth_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = MpesaClient::new(config(&format!("http://{addr}"))).unwrap();
    let err = client.stk_push_query("ws_CO_1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(err.to_string().starts_with("Failed to obtain access token: "));
}
