use checkout_common::{Cents, Secret};
use log::*;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{rest::RestBody, GatewayApiError, RestClient};

#[derive(Debug, Clone)]
pub struct AuthorizeNetConfig {
    pub url: String,
    pub login_id: String,
    pub transaction_key: Secret<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AuthorizeNetCard {
    pub number: String,
    /// `YYYY-MM`
    pub expiration_date: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    #[serde(default)]
    pub response_code: String,
    #[serde(default)]
    pub auth_code: String,
    #[serde(default)]
    pub trans_id: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub account_type: String,
    #[serde(default)]
    pub errors: Vec<TransactionError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionError {
    pub error_code: String,
    pub error_text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    transaction_response: Option<TransactionResponse>,
    messages: ApiMessages,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMessages {
    result_code: String,
    #[serde(default)]
    message: Vec<ApiMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    text: String,
}

impl TransactionResponse {
    pub fn is_approved(&self) -> bool {
        self.response_code == "1"
    }
}

/// Authorize.Net JSON API client. Every call is a `createTransactionRequest` posted to a single endpoint, with the
/// merchant credentials inside the body.
#[derive(Clone)]
pub struct AuthorizeNetApi {
    rest: RestClient,
    login_id: String,
    transaction_key: Secret<String>,
}

impl AuthorizeNetApi {
    pub fn new(config: AuthorizeNetConfig) -> Result<Self, GatewayApiError> {
        let rest = RestClient::new(&config.url, None)?;
        Ok(Self { rest, login_id: config.login_id, transaction_key: config.transaction_key })
    }

    pub async fn authorize(
        &self,
        amount: Cents,
        card: &AuthorizeNetCard,
        invoice_number: &str,
    ) -> Result<TransactionResponse, GatewayApiError> {
        debug!("Authorize.Net authOnly for {amount}, invoice {invoice_number}");
        let request = json!({
            "transactionType": "authOnlyTransaction",
            "amount": amount.to_decimal_string(),
            "payment": { "creditCard": {
                "cardNumber": card.number,
                "expirationDate": card.expiration_date,
                "cardCode": card.code,
            }},
            "order": { "invoiceNumber": invoice_number },
        });
        self.transaction(request).await
    }

    pub async fn capture(&self, trans_id: &str, amount: Cents) -> Result<TransactionResponse, GatewayApiError> {
        debug!("Authorize.Net priorAuthCapture for {trans_id}");
        let request = json!({
            "transactionType": "priorAuthCaptureTransaction",
            "amount": amount.to_decimal_string(),
            "refTransId": trans_id,
        });
        self.transaction(request).await
    }

    pub async fn refund(
        &self,
        trans_id: &str,
        amount: Cents,
        last_four: &str,
    ) -> Result<TransactionResponse, GatewayApiError> {
        debug!("Authorize.Net refund of {amount} against {trans_id}");
        let request = json!({
            "transactionType": "refundTransaction",
            "amount": amount.to_decimal_string(),
            "payment": { "creditCard": { "cardNumber": last_four, "expirationDate": "XXXX" } },
            "refTransId": trans_id,
        });
        self.transaction(request).await
    }

    async fn transaction(&self, transaction_request: Value) -> Result<TransactionResponse, GatewayApiError> {
        let body = json!({
            "createTransactionRequest": {
                "merchantAuthentication": { "name": self.login_id, "transactionKey": self.transaction_key.reveal() },
                "transactionRequest": transaction_request,
            }
        });
        let text = self.rest.send(Method::POST, "", &[], Some(RestBody::Json(body))).await?;
        parse_response(&text)
    }
}

/// Authorize.Net prefixes its JSON with a byte-order mark, which `serde_json` rejects.
fn parse_response(text: &str) -> Result<TransactionResponse, GatewayApiError> {
    let response: ApiResponse = serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .map_err(|e| GatewayApiError::JsonError(e.to_string()))?;
    let transaction = response.transaction_response;
    match transaction {
        Some(t) if response.messages.result_code == "Ok" && t.is_approved() => Ok(t),
        Some(t) if !t.errors.is_empty() => {
            let msg = t.errors.iter().map(|e| format!("{}: {}", e.error_code, e.error_text)).collect::<Vec<_>>();
            Err(GatewayApiError::Declined(msg.join(", ")))
        },
        _ => {
            let msg = response.messages.message.iter().map(|m| m.text.as_str()).collect::<Vec<_>>().join(" ");
            Err(GatewayApiError::Declined(msg))
        },
    }
}
