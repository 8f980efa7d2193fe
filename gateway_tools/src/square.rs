use checkout_common::{Cents, Currency, Secret};
use log::*;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{rest::RestBody, GatewayApiError, RestClient};

const SQUARE_VERSION: &str = "2024-06-04";

#[derive(Debug, Clone)]
pub struct SquareConfig {
    pub base_url: String,
    pub access_token: Secret<String>,
    pub location_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: Cents, currency: &Currency) -> Self {
        Self { amount: amount.value(), currency: currency.to_upper() }
    }
}

/// Body of `POST /v2/payments`. With `autocomplete = false` the payment is only approved and must later be completed.
#[derive(Debug, Clone, Serialize)]
pub struct SquarePaymentRequest {
    pub source_id: String,
    pub idempotency_key: String,
    pub amount_money: Money,
    pub autocomplete: bool,
    pub location_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_email_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquarePayment {
    pub id: String,
    pub status: String,
    pub amount_money: Money,
    #[serde(default)]
    pub card_details: Option<SquareCardDetails>,
}

impl SquarePayment {
    pub fn is_approved(&self) -> bool {
        matches!(self.status.as_str(), "APPROVED" | "COMPLETED")
    }

    pub fn is_completed(&self) -> bool {
        self.status == "COMPLETED"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquareCardDetails {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub card: Option<SquareCard>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquareCard {
    #[serde(default)]
    pub card_brand: String,
    #[serde(default)]
    pub last_4: String,
    #[serde(default)]
    pub exp_month: u32,
    #[serde(default)]
    pub exp_year: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquareRefund {
    pub id: String,
    pub status: String,
    pub amount_money: Money,
}

#[derive(Deserialize)]
struct PaymentResponse {
    payment: SquarePayment,
}

#[derive(Deserialize)]
struct RefundResponse {
    refund: SquareRefund,
}

#[derive(Clone)]
pub struct SquareApi {
    rest: RestClient,
    location_id: String,
}

impl SquareApi {
    pub fn new(config: SquareConfig) -> Result<Self, GatewayApiError> {
        let rest = RestClient::new(&config.base_url, Some(config.access_token.reveal()))?;
        Ok(Self { rest, location_id: config.location_id })
    }

    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    fn headers() -> [(&'static str, String); 1] {
        [("Square-Version", SQUARE_VERSION.to_string())]
    }

    pub async fn create_payment(&self, req: &SquarePaymentRequest) -> Result<SquarePayment, GatewayApiError> {
        debug!("Creating square payment {} (autocomplete: {})", req.idempotency_key, req.autocomplete);
        let body = serde_json::to_value(req).map_err(|e| GatewayApiError::JsonError(e.to_string()))?;
        let res: PaymentResponse =
            self.rest.rest_query(Method::POST, "/v2/payments", &Self::headers(), Some(RestBody::Json(body))).await?;
        if res.payment.is_approved() {
            Ok(res.payment)
        } else {
            Err(GatewayApiError::Declined(format!("Square payment {} is {}", res.payment.id, res.payment.status)))
        }
    }

    pub async fn complete_payment(&self, payment_id: &str) -> Result<SquarePayment, GatewayApiError> {
        debug!("Completing square payment {payment_id}");
        let path = format!("/v2/payments/{payment_id}/complete");
        let res: PaymentResponse =
            self.rest.rest_query(Method::POST, &path, &Self::headers(), Some(RestBody::Json(json!({})))).await?;
        Ok(res.payment)
    }

    pub async fn refund_payment(
        &self,
        idempotency_key: &str,
        payment_id: &str,
        amount: Money,
    ) -> Result<SquareRefund, GatewayApiError> {
        debug!("Refunding {} {} on square payment {payment_id}", amount.amount, amount.currency);
        let body = json!({
            "idempotency_key": idempotency_key,
            "payment_id": payment_id,
            "amount_money": amount,
        });
        let res: RefundResponse =
            self.rest.rest_query(Method::POST, "/v2/refunds", &Self::headers(), Some(RestBody::Json(body))).await?;
        Ok(res.refund)
    }
}
