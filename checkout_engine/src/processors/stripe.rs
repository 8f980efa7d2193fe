use async_trait::async_trait;
use checkout_common::Cents;
use gateway_tools::{GatewayEndpoints, StripeApi, StripeCard, StripeChargeRequest, StripeConfig};
use log::*;

use super::{gateway_err, required, PaymentProcessor};
use crate::{
    catalog_types::Organization,
    checkout_api::errors::CheckoutError,
    db_types::{Order, Payment, PaymentType, User},
};

const STRIPE: &str = "Stripe";

/// Card payments through Stripe charges.
///
/// Authorization creates an uncaptured charge. First-time buyers get a Stripe customer created from the card token.
/// Returning buyers have the card added to their existing customer and made the default, and any older cards with the
/// same last four digits are removed so the customer doesn't accumulate duplicates.
pub struct StripeProcessor {
    endpoints: GatewayEndpoints,
}

impl StripeProcessor {
    pub fn new(endpoints: GatewayEndpoints) -> Self {
        Self { endpoints }
    }

    fn api(&self, org: &Organization) -> Result<StripeApi, CheckoutError> {
        let secret_key =
            if org.live { org.stripe.live_secret_key.clone() } else { org.stripe.test_secret_key.clone() };
        if secret_key.is_empty() {
            return Err(CheckoutError::validation(format!("Stripe is not configured for {}", org.name)));
        }
        let config = StripeConfig { base_url: self.endpoints.stripe.clone(), secret_key };
        StripeApi::new(config).map_err(gateway_err(STRIPE))
    }

    /// Adds the card to an existing customer. Returns the new card's id.
    async fn returning_customer(
        &self,
        api: &StripeApi,
        customer_id: &str,
        token: &str,
        payment: &mut Payment,
    ) -> Result<String, CheckoutError> {
        let card = api.add_card(customer_id, token).await.map_err(gateway_err(STRIPE))?;
        api.set_default_source(customer_id, &card.id).await.map_err(gateway_err(STRIPE))?;
        let cards = api.list_cards(customer_id).await.map_err(gateway_err(STRIPE))?;
        for old in duplicates_of(&card, &cards) {
            if let Err(e) = api.delete_card(customer_id, &old.id).await {
                warn!("💳️ Could not remove duplicate card {} from customer {customer_id}. {e}", old.id);
            }
        }
        payment.account.last_four = card.last4;
        payment.account.brand = card.brand;
        payment.account.month = card.exp_month;
        payment.account.year = card.exp_year;
        Ok(card.id)
    }
}

/// Cards other than `card` that share its last four digits.
fn duplicates_of<'a>(card: &'a StripeCard, cards: &'a [StripeCard]) -> impl Iterator<Item = &'a StripeCard> {
    cards.iter().filter(move |c| c.id != card.id && c.last4 == card.last4)
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    fn payment_type(&self) -> PaymentType {
        PaymentType::Stripe
    }

    async fn authorize(
        &self,
        org: &Organization,
        order: &mut Order,
        user: &mut User,
        payment: &mut Payment,
    ) -> Result<(), CheckoutError> {
        let api = self.api(org)?;
        let token = required(&payment.account.token, "A Stripe card token")?.to_string();
        let (customer_id, source) = match user.stripe_customer_id.clone() {
            None => {
                debug!("💳️ First Stripe payment for {}", user.email);
                let customer = api.create_customer(&user.email, &token).await.map_err(gateway_err(STRIPE))?;
                (customer.id, customer.default_source)
            },
            Some(customer_id) => {
                debug!("💳️ Returning Stripe customer {customer_id}");
                let card_id = self.returning_customer(&api, &customer_id, &token, payment).await?;
                (customer_id, Some(card_id))
            },
        };
        let request = StripeChargeRequest {
            amount: payment.amount,
            currency: payment.currency.clone(),
            customer: customer_id.clone(),
            source: source.clone(),
            description: payment.description.clone(),
            capture: false,
            metadata: vec![("order_id".into(), order.id.clone()), ("payment_id".into(), payment.id.clone())],
        };
        let charge = api.create_charge(&request).await.map_err(gateway_err(STRIPE))?;
        info!("💳️ Stripe charge {} authorized for order {}", charge.id, order.id);
        user.stripe_customer_id = Some(customer_id.clone());
        payment.account.customer_id = Some(customer_id);
        payment.account.card_id = source;
        payment.account.charge_id = Some(charge.id);
        payment.account.balance_transaction_id = charge.balance_transaction;
        payment.live = charge.livemode;
        Ok(())
    }

    async fn capture_payment(&self, org: &Organization, _order: &Order, payment: &mut Payment) -> Result<(), CheckoutError> {
        let charge_id = required(&payment.account.charge_id, "A Stripe charge id")?;
        let charge = self.api(org)?.capture_charge(charge_id).await.map_err(gateway_err(STRIPE))?;
        if !charge.captured {
            return Err(CheckoutError::failed_to_capture(&format!("Stripe charge {} is {}", charge.id, charge.status)));
        }
        payment.account.balance_transaction_id = charge.balance_transaction;
        Ok(())
    }

    async fn refund_payment(
        &self,
        org: &Organization,
        _order: &Order,
        payment: &mut Payment,
        amount: Cents,
    ) -> Result<(), CheckoutError> {
        let charge_id = required(&payment.account.charge_id, "A Stripe charge id")?;
        let refund = self.api(org)?.create_refund(charge_id, amount).await.map_err(gateway_err(STRIPE))?;
        debug!("💳️ Stripe refund {} is {}", refund.id, refund.status);
        Ok(())
    }
}
