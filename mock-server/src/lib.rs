use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    routing::{get, post},
    Json, Router,
};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const TOKEN_PATH: &str = "/oauth/v1/generate";

pub const STK_PUSH: &str = "/mpesa/stkpush/v1/processrequest";
pub const ORG_INFO: &str = "/sfcverify/v1/query/info";
pub const QR_CODE: &str = "/mpesa/qrcode/v1/generate";
pub const STK_PUSH_QUERY: &str = "/mpesa/stkpushquery/v1/query";
pub const REGISTER_URL: &str = "/mpesa/c2b/v2/registerurl";
pub const B2C_PAYMENT: &str = "/mpesa/b2c/v1/paymentrequest";
pub const TRANSACTION_STATUS: &str = "/mpesa/transactionstatus/v1/query";
pub const ACCOUNT_BALANCE: &str = "/mpesa/accountbalance/v1/query";
pub const REVERSAL: &str = "/mpesa/reversal/v1/request";
pub const TAX_REMITTANCE: &str = "/mpesa/b2b/v1/remittax";
pub const B2B_PAYMENT: &str = "/mpesa/b2b/v1/paymentrequest";
pub const B2B_EXPRESS_CHECKOUT: &str = "/v1/ussdpush/get-msisdn";
pub const STANDING_ORDER: &str = "/mpesa/standingorders/v1/create";

const BUSINESS_ENDPOINTS: [&str; 13] = [
    STK_PUSH,
    ORG_INFO,
    QR_CODE,
    STK_PUSH_QUERY,
    REGISTER_URL,
    B2C_PAYMENT,
    TRANSACTION_STATUS,
    ACCOUNT_BALANCE,
    REVERSAL,
    TAX_REMITTANCE,
    B2B_PAYMENT,
    B2B_EXPRESS_CHECKOUT,
    STANDING_ORDER,
];

/// A business request as the mock received it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct Journal {
    tokens: Vec<String>,
    token_requests: usize,
    requests: Vec<RecordedRequest>,
    overrides: HashMap<String, (u16, Value)>,
}

/// Shared state of a mock Daraja instance. Clones share the same journal,
/// so a test can keep one handle and hand another to `run`.
#[derive(Clone)]
pub struct MockDaraja {
    credentials: Option<(String, String)>,
    organization_name: String,
    journal: Arc<RwLock<Journal>>,
}

impl Default for MockDaraja {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDaraja {
    /// Accepts any non-empty consumer key and secret.
    pub fn new() -> Self {
        Self {
            credentials: None,
            organization_name: "Mock Merchant Ltd".to_string(),
            journal: Arc::new(RwLock::new(Journal::default())),
        }
    }

    pub fn with_credentials(mut self, consumer_key: &str, consumer_secret: &str) -> Self {
        self.credentials = Some((consumer_key.to_string(), consumer_secret.to_string()));
        self
    }

    pub fn with_organization_name(mut self, name: &str) -> Self {
        self.organization_name = name.to_string();
        self
    }

    /// Answer every later request to `path` with `status` and `body`.
    pub async fn respond_with(&self, path: &str, status: u16, body: Value) {
        self.journal
            .write()
            .await
            .overrides
            .insert(path.to_string(), (status, body));
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.journal.read().await.requests.clone()
    }

    pub async fn token_requests(&self) -> usize {
        self.journal.read().await.token_requests
    }

    fn accepts(&self, key: &str, secret: &str) -> bool {
        match &self.credentials {
            Some((k, s)) => k == key && s == secret,
            None => !key.is_empty() && !secret.is_empty(),
        }
    }
}

pub fn app(state: MockDaraja) -> Router {
    let mut router = Router::new().route(TOKEN_PATH, get(generate_token));
    for endpoint in BUSINESS_ENDPOINTS {
        router = router.route(endpoint, post(business_request));
    }
    router.with_state(state)
}

pub async fn run(listener: TcpListener, state: MockDaraja) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

type Reply = (StatusCode, Json<Value>);

fn reply(status: u16, body: Value) -> Reply {
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(body),
    )
}

async fn generate_token(
    State(state): State<MockDaraja>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Reply {
    info!("GET {TOKEN_PATH}");
    state.journal.write().await.token_requests += 1;

    if params.get("grant_type").map(String::as_str) != Some("client_credentials") {
        return reply(
            400,
            json!({"errorCode": "400.008.02", "errorMessage": "Invalid grant type passed"}),
        );
    }

    let authorized = basic_credentials(&headers)
        .map(|(key, secret)| state.accepts(&key, &secret))
        .unwrap_or(false);
    if !authorized {
        return reply(
            400,
            json!({"errorCode": "400.008.01", "errorMessage": "Invalid Authentication passed"}),
        );
    }

    let token = Uuid::new_v4().simple().to_string();
    state.journal.write().await.tokens.push(token.clone());
    reply(200, json!({"access_token": token, "expires_in": "3599"}))
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(BASE64_STANDARD.decode(encoded).ok()?).ok()?;
    let (key, secret) = decoded.split_once(':')?;
    Some((key.to_string(), secret.to_string()))
}

async fn business_request(
    State(state): State<MockDaraja>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Reply {
    let path = uri.path().to_string();
    info!("POST {path}");

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    let mut journal = state.journal.write().await;
    journal.requests.push(RecordedRequest {
        path: path.clone(),
        authorization: authorization.clone(),
        body: body.clone(),
    });

    let token = authorization.as_deref().and_then(|v| v.strip_prefix("Bearer "));
    if !token.is_some_and(|t| journal.tokens.iter().any(|issued| issued == t)) {
        return reply(
            401,
            json!({"errorCode": "404.001.03", "errorMessage": "Invalid Access Token"}),
        );
    }
    if !body.is_object() {
        return reply(
            400,
            json!({"errorCode": "400.002.02", "errorMessage": "Bad Request - Invalid JSON"}),
        );
    }
    if let Some((status, canned)) = journal.overrides.get(&path) {
        return reply(*status, canned.clone());
    }
    drop(journal);

    reply(200, default_response(&state, &path, &body))
}

fn default_response(state: &MockDaraja, path: &str, body: &Value) -> Value {
    let request_id = Uuid::new_v4().to_string();
    match path {
        STK_PUSH => json!({
            "MerchantRequestID": request_id,
            "CheckoutRequestID": format!("ws_CO_{}", Uuid::new_v4().simple()),
            "ResponseCode": "0",
            "ResponseDescription": "Success. Request accepted for processing",
            "CustomerMessage": "Success. Request accepted for processing"
        }),
        ORG_INFO => json!({
            "ResponseCode": "0",
            "Identifier": body["Identifier"],
            "OrganizationName": state.organization_name
        }),
        QR_CODE => {
            let content = format!(
                "{}|{}|{}|{}",
                body["MerchantName"], body["RefNo"], body["Amount"], body["TrxCode"]
            );
            json!({
                "ResponseCode": "00",
                "RequestID": request_id,
                "ResponseDescription": "The service request is processed successfully.",
                "QRCode": BASE64_STANDARD.encode(content)
            })
        }
        STK_PUSH_QUERY => json!({
            "ResponseCode": "0",
            "ResponseDescription": "The service request has been accepted successsfully",
            "MerchantRequestID": request_id,
            "CheckoutRequestID": body["CheckoutRequestID"],
            "ResultCode": "0",
            "ResultDesc": "The service request is processed successfully."
        }),
        REGISTER_URL => json!({
            "OriginatorCoversationID": request_id,
            "ResponseCode": "0",
            "ResponseDescription": "Success"
        }),
        B2B_EXPRESS_CHECKOUT => json!({
            "code": "0",
            "status": "USSD Initiated Successfully"
        }),
        STANDING_ORDER => json!({
            "ResponseHeader": {
                "responseRefID": request_id,
                "responseCode": "200",
                "responseDescription": "Request accepted for processing",
                "ResultDesc": "The service request is processed successfully."
            },
            "ResponseBody": {
                "responseDescription": "Request accepted for processing",
                "responseCode": "200"
            }
        }),
        _ => json!({
            "ConversationID": format!("AG_{}", Uuid::new_v4().simple()),
            "OriginatorConversationID": request_id,
            "ResponseCode": "0",
            "ResponseDescription": "Accept the service request successfully."
        }),
    }
}
