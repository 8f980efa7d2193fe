use checkout_common::{Cents, Currency, Secret};
use log::*;
use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize};

use crate::{rest::RestBody, GatewayApiError, RestClient};

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub base_url: String,
    pub secret_key: Secret<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    #[serde(default)]
    pub default_source: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCard {
    pub id: String,
    #[serde(default)]
    pub last4: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub exp_month: u32,
    #[serde(default)]
    pub exp_year: u32,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCharge {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_refunded: i64,
    pub captured: bool,
    pub paid: bool,
    pub livemode: bool,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub balance_transaction: Option<String>,
    #[serde(default)]
    pub failure_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeRefund {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

/// Parameters for `POST /v1/charges`. `capture = false` creates an authorization-only charge.
#[derive(Debug, Clone)]
pub struct StripeChargeRequest {
    pub amount: Cents,
    pub currency: Currency,
    pub customer: String,
    pub source: Option<String>,
    pub description: String,
    pub capture: bool,
    pub metadata: Vec<(String, String)>,
}

impl StripeChargeRequest {
    fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), self.amount.value().to_string()),
            ("currency".to_string(), self.currency.to_string()),
            ("customer".to_string(), self.customer.clone()),
            ("description".to_string(), self.description.clone()),
            ("capture".to_string(), self.capture.to_string()),
        ];
        if let Some(source) = &self.source {
            form.push(("source".to_string(), source.clone()));
        }
        for (k, v) in &self.metadata {
            form.push((format!("metadata[{k}]"), v.clone()));
        }
        form
    }
}

#[derive(Clone)]
pub struct StripeApi {
    rest: RestClient,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, GatewayApiError> {
        let rest = RestClient::new(&config.base_url, Some(config.secret_key.reveal()))?;
        Ok(Self { rest })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, form: Vec<(String, String)>) -> Result<T, GatewayApiError> {
        self.rest.rest_query(Method::POST, path, &[], Some(RestBody::Form(form))).await
    }

    pub async fn create_customer(&self, email: &str, source_token: &str) -> Result<StripeCustomer, GatewayApiError> {
        debug!("Creating stripe customer for {email}");
        let form = vec![("email".to_string(), email.to_string()), ("source".to_string(), source_token.to_string())];
        self.post("/v1/customers", form).await
    }

    pub async fn list_cards(&self, customer: &str) -> Result<Vec<StripeCard>, GatewayApiError> {
        let path = format!("/v1/customers/{customer}/sources?object=card&limit=100");
        let list = self.rest.rest_query::<StripeList<StripeCard>>(Method::GET, &path, &[], None).await?;
        Ok(list.data)
    }

    pub async fn add_card(&self, customer: &str, source_token: &str) -> Result<StripeCard, GatewayApiError> {
        debug!("Adding card to stripe customer {customer}");
        let path = format!("/v1/customers/{customer}/sources");
        self.post(&path, vec![("source".to_string(), source_token.to_string())]).await
    }

    pub async fn set_default_source(&self, customer: &str, card: &str) -> Result<StripeCustomer, GatewayApiError> {
        let path = format!("/v1/customers/{customer}");
        self.post(&path, vec![("default_source".to_string(), card.to_string())]).await
    }

    pub async fn delete_card(&self, customer: &str, card: &str) -> Result<(), GatewayApiError> {
        debug!("Removing duplicate card {card} from stripe customer {customer}");
        let path = format!("/v1/customers/{customer}/sources/{card}");
        let _ = self.rest.send(Method::DELETE, &path, &[], None).await?;
        Ok(())
    }

    pub async fn create_charge(&self, req: &StripeChargeRequest) -> Result<StripeCharge, GatewayApiError> {
        debug!("Creating stripe charge of {} {} (capture: {})", req.amount, req.currency, req.capture);
        let charge: StripeCharge = self.post("/v1/charges", req.to_form()).await?;
        match &charge.failure_message {
            Some(msg) if charge.status == "failed" => Err(GatewayApiError::Declined(msg.clone())),
            _ => Ok(charge),
        }
    }

    pub async fn capture_charge(&self, charge_id: &str) -> Result<StripeCharge, GatewayApiError> {
        debug!("Capturing stripe charge {charge_id}");
        let path = format!("/v1/charges/{charge_id}/capture");
        self.post(&path, vec![]).await
    }

    pub async fn create_refund(&self, charge_id: &str, amount: Cents) -> Result<StripeRefund, GatewayApiError> {
        debug!("Refunding {amount} on stripe charge {charge_id}");
        let form = vec![("charge".to_string(), charge_id.to_string()), ("amount".to_string(), amount.value().to_string())];
        self.post("/v1/refunds", form).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn charge_form_encoding() {
        let req = StripeChargeRequest {
            amount: Cents::from(1_250),
            currency: Currency::from("USD"),
            customer: "cus_123".into(),
            source: Some("card_9".into()),
            description: "Order 1001".into(),
            capture: false,
            metadata: vec![("order".into(), "ord_1".into())],
        };
        let form = req.to_form();
        assert!(form.contains(&("amount".into(), "1250".into())));
        assert!(form.contains(&("currency".into(), "usd".into())));
        assert!(form.contains(&("capture".into(), "false".into())));
        assert!(form.contains(&("source".into(), "card_9".into())));
        assert!(form.contains(&("metadata[order]".into(), "ord_1".into())));
    }

    #[test]
    fn charge_deserialization() {
        let json = r#"{"id":"ch_1","amount":500,"captured":false,"paid":true,"livemode":false,"status":"succeeded",
            "balance_transaction":null,"object":"charge"}"#;
        let charge: StripeCharge = serde_json::from_str(json).unwrap();
        assert_eq!(charge.id, "ch_1");
        assert!(!charge.captured);
        assert_eq!(charge.amount_refunded, 0);
    }
}
