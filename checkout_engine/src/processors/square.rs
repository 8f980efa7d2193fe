use async_trait::async_trait;
use checkout_common::Cents;
use gateway_tools::{GatewayEndpoints, Money, SquareApi, SquareConfig, SquarePaymentRequest};
use log::*;
use uuid::Uuid;

use super::{gateway_err, required, PaymentProcessor};
use crate::{
    catalog_types::Organization,
    checkout_api::errors::CheckoutError,
    db_types::{Order, Payment, PaymentType, User},
};

const SQUARE: &str = "Square";

/// Card payments through the Square Payments API.
///
/// The browser tokenizes the card into a nonce. Authorization creates a payment with `autocomplete = false`, and
/// capture completes it. Every call that creates something carries a fresh idempotency key.
pub struct SquareProcessor {
    endpoints: GatewayEndpoints,
}

impl SquareProcessor {
    pub fn new(endpoints: GatewayEndpoints) -> Self {
        Self { endpoints }
    }

    fn api(&self, org: &Organization) -> Result<SquareApi, CheckoutError> {
        let creds = &org.square;
        let (access_token, location_id) = if org.live {
            (creds.access_token.clone(), creds.location_id.clone())
        } else {
            (creds.sandbox_access_token.clone(), creds.sandbox_location_id.clone())
        };
        if access_token.is_empty() || location_id.is_empty() {
            return Err(CheckoutError::validation(format!("Square is not configured for {}", org.name)));
        }
        let config = SquareConfig { base_url: self.endpoints.square_for(org.live).to_string(), access_token, location_id };
        SquareApi::new(config).map_err(gateway_err(SQUARE))
    }
}

#[async_trait]
impl PaymentProcessor for SquareProcessor {
    fn payment_type(&self) -> PaymentType {
        PaymentType::Square
    }

    async fn authorize(
        &self,
        org: &Organization,
        order: &mut Order,
        user: &mut User,
        payment: &mut Payment,
    ) -> Result<(), CheckoutError> {
        let api = self.api(org)?;
        let nonce = required(&payment.account.token, "A Square card nonce")?.to_string();
        let idempotency_key = Uuid::new_v4().to_string();
        let request = SquarePaymentRequest {
            source_id: nonce,
            idempotency_key: idempotency_key.clone(),
            amount_money: Money::new(payment.amount, &payment.currency),
            autocomplete: false,
            location_id: api.location_id().to_string(),
            reference_id: Some(order.id.clone()),
            note: (!payment.description.is_empty()).then(|| payment.description.clone()),
            buyer_email_address: (!user.email.is_empty()).then(|| user.email.clone()),
        };
        payment.account.idempotency_key = Some(idempotency_key);
        let square_payment = api.create_payment(&request).await.map_err(gateway_err(SQUARE))?;
        info!("💳️ Square payment {} approved for order {}", square_payment.id, order.id);
        if let Some(card) = square_payment.card_details.and_then(|d| d.card) {
            payment.account.last_four = card.last_4;
            payment.account.brand = card.card_brand;
            payment.account.month = card.exp_month;
            payment.account.year = card.exp_year;
        }
        payment.account.payment_id = Some(square_payment.id);
        payment.live = org.live;
        Ok(())
    }

    async fn capture_payment(&self, org: &Organization, _order: &Order, payment: &mut Payment) -> Result<(), CheckoutError> {
        let payment_id = required(&payment.account.payment_id, "A Square payment id")?;
        let completed = self.api(org)?.complete_payment(payment_id).await.map_err(gateway_err(SQUARE))?;
        if !completed.is_completed() {
            return Err(CheckoutError::failed_to_capture(&format!(
                "Square payment {} is {}",
                completed.id, completed.status
            )));
        }
        Ok(())
    }

    async fn refund_payment(
        &self,
        org: &Organization,
        _order: &Order,
        payment: &mut Payment,
        amount: Cents,
    ) -> Result<(), CheckoutError> {
        let payment_id = required(&payment.account.payment_id, "A Square payment id")?;
        let key = Uuid::new_v4().to_string();
        let money = Money::new(amount, &payment.currency);
        let refund = self.api(org)?.refund_payment(&key, payment_id, money).await.map_err(gateway_err(SQUARE))?;
        debug!("💳️ Square refund {} is {}", refund.id, refund.status);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::checkout_api::errors::ErrorKind;

    #[tokio::test]
    async fn live_and_sandbox_credentials() {
        let processor = SquareProcessor::new(GatewayEndpoints::default());
        let mut org = Organization { name: "Acme".into(), live: true, ..Default::default() };
        org.square.sandbox_access_token = "sandbox".into();
        org.square.sandbox_location_id = "L1".into();
        // Live org with only sandbox credentials
        let err = processor.api(&org).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
        org.live = false;
        let api = processor.api(&org).unwrap();
        assert_eq!(api.location_id(), "L1");

        let mut payment = Payment::default();
        let err = processor
            .authorize(&org, &mut Order::default(), &mut User::default(), &mut payment)
            .await
            .unwrap_err();
        assert!(err.message.contains("nonce"));
        assert!(payment.account.idempotency_key.is_none());
    }
}
