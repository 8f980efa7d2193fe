use async_trait::async_trait;
use checkout_common::Cents;
use gateway_tools::{GatewayEndpoints, PaypalApi, PaypalConfig};
use log::*;

use super::{gateway_err, required, PaymentProcessor};
use crate::{
    catalog_types::Organization,
    checkout_api::errors::{CheckoutError, ErrorKind},
    db_types::{Order, Payment, PaymentStatus, PaymentType, User},
};

const PAYPAL: &str = "PayPal";

/// PayPal checkout orders. This is a two-phase gateway.
///
/// Authorization creates a PayPal order and stores its id as the payment's pay key, along with the approval link the
/// buyer must be redirected to. Nothing is captured until PayPal calls back: `confirm` captures the approved order and
/// `cancel` abandons it. A plain `capture` is a no-op.
pub struct PaypalProcessor {
    endpoints: GatewayEndpoints,
}

impl PaypalProcessor {
    pub fn new(endpoints: GatewayEndpoints) -> Self {
        Self { endpoints }
    }

    fn api(&self, org: &Organization) -> Result<PaypalApi, CheckoutError> {
        let creds = &org.paypal;
        let (client_id, secret) = if org.live {
            (creds.client_id.clone(), creds.secret.clone())
        } else {
            (creds.sandbox_client_id.clone(), creds.sandbox_secret.clone())
        };
        if client_id.is_empty() || secret.is_empty() {
            return Err(CheckoutError::validation(format!("PayPal is not configured for {}", org.name)));
        }
        let config = PaypalConfig { base_url: self.endpoints.paypal_for(org.live).to_string(), client_id, secret };
        PaypalApi::new(config).map_err(gateway_err(PAYPAL))
    }
}

#[async_trait]
impl PaymentProcessor for PaypalProcessor {
    fn payment_type(&self) -> PaymentType {
        PaymentType::Paypal
    }

    async fn authorize(
        &self,
        org: &Organization,
        order: &mut Order,
        _user: &mut User,
        payment: &mut Payment,
    ) -> Result<(), CheckoutError> {
        let api = self.api(org)?;
        let creds = &org.paypal;
        let paypal_order = api
            .create_order(&order.id, payment.amount, &payment.currency, &creds.return_url, &creds.cancel_url)
            .await
            .map_err(gateway_err(PAYPAL))?;
        let approval_url = paypal_order.approve_url().map(String::from).ok_or_else(|| {
            CheckoutError::gateway(PAYPAL, format!("order {} has no approval link", paypal_order.id))
        })?;
        info!("💳️ PayPal order {} awaiting approval for order {}", paypal_order.id, order.id);
        payment.account.pay_key = Some(paypal_order.id);
        payment.account.approval_url = Some(approval_url);
        payment.live = org.live;
        Ok(())
    }

    async fn capture(&self, _org: &Organization, order: &Order, _payments: &mut [Payment]) -> Result<(), CheckoutError> {
        debug!("💳️ PayPal order {} is captured when the buyer confirms it", order.id);
        Ok(())
    }

    async fn capture_payment(&self, org: &Organization, order: &Order, payment: &mut Payment) -> Result<(), CheckoutError> {
        let pay_key = required(&payment.account.pay_key, "A PayPal pay key")?;
        let captured = self.api(org)?.capture_order(pay_key).await.map_err(gateway_err(PAYPAL))?;
        let capture = captured.captures().next().ok_or_else(|| {
            CheckoutError::failed_to_capture(&format!("PayPal order {} is {}", captured.id, captured.status))
        })?;
        debug!("💳️ PayPal capture {} for order {}", capture.id, order.id);
        payment.account.capture_id = Some(capture.id.clone());
        Ok(())
    }

    async fn refund_payment(
        &self,
        org: &Organization,
        _order: &Order,
        payment: &mut Payment,
        amount: Cents,
    ) -> Result<(), CheckoutError> {
        let capture_id = required(&payment.account.capture_id, "A PayPal capture id")?;
        let refund = self
            .api(org)?
            .refund_capture(capture_id, amount, &payment.currency)
            .await
            .map_err(gateway_err(PAYPAL))?;
        debug!("💳️ PayPal refund {} is {}", refund.id, refund.status);
        Ok(())
    }

    async fn confirm(&self, org: &Organization, order: &mut Order, payments: &mut [Payment]) -> Result<(), CheckoutError> {
        let pending = payments.iter().filter(|p| !p.captured && p.status != PaymentStatus::Cancelled).count();
        if pending == 0 {
            return Err(CheckoutError::new(ErrorKind::Validation, format!("Order {} has nothing to confirm", order.id)));
        }
        // Confirmation is exactly the capture a plain `capture` skips
        for payment in payments.iter_mut().filter(|p| !p.captured && p.status != PaymentStatus::Cancelled) {
            match self.capture_payment(org, order, payment).await {
                Ok(()) => payment.mark_captured(),
                Err(e) => {
                    payment.mark_failed(&e.message);
                    return Err(e);
                },
            }
        }
        Ok(())
    }

    async fn cancel(&self, _org: &Organization, order: &mut Order, payments: &mut [Payment]) -> Result<(), CheckoutError> {
        for payment in payments.iter_mut().filter(|p| !p.captured) {
            payment.status = PaymentStatus::Cancelled;
        }
        order.cancel();
        order.payment_status = PaymentStatus::Cancelled;
        info!("💳️ PayPal order {} cancelled by the buyer", order.id);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pending(id: &str) -> Payment {
        Payment { id: id.into(), payment_type: PaymentType::Paypal, amount: Cents::from(1_000), ..Default::default() }
    }

    #[tokio::test]
    async fn capture_waits_for_confirmation() {
        let processor = PaypalProcessor::new(GatewayEndpoints::default());
        let org = Organization::default();
        let mut payments = vec![pending("p1")];
        processor.capture(&org, &Order::default(), &mut payments).await.unwrap();
        assert!(!payments[0].captured);
        assert_eq!(payments[0].status, PaymentStatus::Unpaid);
    }

    #[tokio::test]
    async fn cancel_flips_statuses() {
        let processor = PaypalProcessor::new(GatewayEndpoints::default());
        let mut order = Order::default();
        let mut payments = vec![pending("p1"), pending("p2")];
        processor.cancel(&Organization::default(), &mut order, &mut payments).await.unwrap();
        assert!(payments.iter().all(|p| p.status == PaymentStatus::Cancelled));
        assert_eq!(order.status, crate::db_types::OrderStatus::Cancelled);
        assert_eq!(order.payment_status, PaymentStatus::Cancelled);
        // Nothing left to confirm
        let err = processor.confirm(&Organization::default(), &mut order, &mut payments).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn confirm_needs_a_pay_key() {
        let processor = PaypalProcessor::new(GatewayEndpoints::default());
        let mut org = Organization::default();
        org.paypal.sandbox_client_id = "client".into();
        org.paypal.sandbox_secret = "secret".into();
        let mut payments = vec![pending("p1")];
        let err = processor.confirm(&org, &mut Order::default(), &mut payments).await.unwrap_err();
        assert!(err.message.contains("pay key"));
        assert_eq!(payments[0].status, PaymentStatus::Failed);
        assert!(!payments[0].captured);
    }
}
