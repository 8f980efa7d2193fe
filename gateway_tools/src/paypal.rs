use checkout_common::{Cents, Currency, Secret};
use log::*;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use crate::{rest::RestBody, GatewayApiError, RestClient};

#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub base_url: String,
    pub client_id: String,
    pub secret: Secret<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaypalLink {
    pub href: String,
    pub rel: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaypalOrder {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub links: Vec<PaypalLink>,
    #[serde(default)]
    pub purchase_units: Vec<PaypalPurchaseUnit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaypalPurchaseUnit {
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub payments: Option<PaypalPayments>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaypalPayments {
    #[serde(default)]
    pub captures: Vec<PaypalCapture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaypalCapture {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaypalRefund {
    pub id: String,
    pub status: String,
}

impl PaypalOrder {
    /// The URL the buyer must be redirected to in order to approve the payment.
    pub fn approve_url(&self) -> Option<&str> {
        self.links.iter().find(|l| l.rel == "approve" || l.rel == "payer-action").map(|l| l.href.as_str())
    }

    /// Captures recorded against the order, across all purchase units.
    pub fn captures(&self) -> impl Iterator<Item = &PaypalCapture> {
        self.purchase_units.iter().filter_map(|u| u.payments.as_ref()).flat_map(|p| p.captures.iter())
    }
}

#[derive(Deserialize)]
struct AccessToken {
    access_token: String,
}

/// PayPal Orders v2 client. Every call first exchanges the client credentials for a short-lived access token.
#[derive(Clone)]
pub struct PaypalApi {
    rest: RestClient,
    client_id: String,
    secret: Secret<String>,
}

impl PaypalApi {
    pub fn new(config: PaypalConfig) -> Result<Self, GatewayApiError> {
        let rest = RestClient::new(&config.base_url, None)?;
        Ok(Self { rest, client_id: config.client_id, secret: config.secret })
    }

    async fn access_token(&self) -> Result<String, GatewayApiError> {
        trace!("Requesting paypal access token");
        let response = self
            .rest
            .client()
            .post(self.rest.url("/v1/oauth2/token"))
            .basic_auth(&self.client_id, Some(self.secret.reveal()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| GatewayApiError::RestRequestError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayApiError::QueryError { status, message });
        }
        let token = response.json::<AccessToken>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))?;
        Ok(token.access_token)
    }

    async fn authorized_post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, GatewayApiError> {
        let token = self.access_token().await?;
        let headers = [("Authorization", format!("Bearer {token}"))];
        self.rest.rest_query(Method::POST, path, &headers, Some(RestBody::Json(body))).await
    }

    pub async fn create_order(
        &self,
        reference_id: &str,
        amount: Cents,
        currency: &Currency,
        return_url: &str,
        cancel_url: &str,
    ) -> Result<PaypalOrder, GatewayApiError> {
        debug!("Creating paypal order for {reference_id}: {amount} {currency}");
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": reference_id,
                "amount": { "currency_code": currency.to_upper(), "value": amount.to_decimal_string() },
            }],
            "application_context": { "return_url": return_url, "cancel_url": cancel_url },
        });
        self.authorized_post("/v2/checkout/orders", body).await
    }

    pub async fn capture_order(&self, paypal_order_id: &str) -> Result<PaypalOrder, GatewayApiError> {
        debug!("Capturing paypal order {paypal_order_id}");
        let path = format!("/v2/checkout/orders/{paypal_order_id}/capture");
        self.authorized_post(&path, json!({})).await
    }

    pub async fn refund_capture(
        &self,
        capture_id: &str,
        amount: Cents,
        currency: &Currency,
    ) -> Result<PaypalRefund, GatewayApiError> {
        debug!("Refunding {amount} {currency} on paypal capture {capture_id}");
        let path = format!("/v2/payments/captures/{capture_id}/refund");
        let body = json!({ "amount": { "currency_code": currency.to_upper(), "value": amount.to_decimal_string() } });
        self.authorized_post(&path, body).await
    }
}
