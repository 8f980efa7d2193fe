//! # Payment processors
//!
//! Every supported gateway is a [`PaymentProcessor`]. The orchestrator never matches on [`PaymentType`] itself; it asks
//! the [`ProcessorRegistry`] for the processor registered under the order's type and drives it through the shared
//! capability set:
//!
//! * `authorize` reserves the funds (or, for two-phase gateways, starts the buyer's approval flow).
//! * `capture` settles every uncaptured payment. The default implementation calls [`PaymentProcessor::capture_payment`]
//!   for each payment with `captured == false` and flips the flag on success. A captured payment is never captured
//!   again.
//! * `refund` drains an amount across the order's payments, calling [`PaymentProcessor::refund_payment`] for each
//!   portion. Test payments are refunded in the books only.
//! * `confirm` and `cancel` complete or abandon a pending approval. Only PayPal supports them; everyone else reports
//!   `InvalidOrderType`.
//!
//! Unknown payment types resolve to the registry's default processor (Stripe, unless configured otherwise).
use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use checkout_common::Cents;
use gateway_tools::{GatewayApiError, GatewayEndpoints};
use log::*;

use crate::{
    catalog_types::Organization,
    checkout_api::errors::{CheckoutError, ErrorKind},
    db_types::{Order, Payment, PaymentStatus, PaymentType, User},
    traits::WalletManagement,
};

mod authorize_net;
mod balance;
mod ethereum;
mod null;
mod paypal;
mod square;
mod stripe;

pub use authorize_net::AuthorizeNetProcessor;
pub use balance::BalanceProcessor;
pub use ethereum::EthereumProcessor;
pub use null::NullProcessor;
pub use paypal::PaypalProcessor;
pub use square::SquareProcessor;
pub use stripe::StripeProcessor;

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    fn payment_type(&self) -> PaymentType;

    /// False for processors whose payment record is created later by an external settlement process. Only the user
    /// and order are stored when such a processor authorizes.
    fn persists_payment(&self) -> bool {
        true
    }

    /// Authorizes `payment.amount` against the gateway, recording the gateway's ids on `payment.account`. Processors
    /// may also update the order (wallets, approval links) and the user (gateway customer ids).
    async fn authorize(
        &self,
        org: &Organization,
        order: &mut Order,
        user: &mut User,
        payment: &mut Payment,
    ) -> Result<(), CheckoutError>;

    /// Settles a single authorized payment.
    async fn capture_payment(&self, org: &Organization, order: &Order, payment: &mut Payment)
        -> Result<(), CheckoutError>;

    /// Returns `amount` of a captured payment to the buyer.
    async fn refund_payment(
        &self,
        org: &Organization,
        order: &Order,
        payment: &mut Payment,
        amount: Cents,
    ) -> Result<(), CheckoutError>;

    /// Captures every payment that has not been captured yet. Stops at the first failure, which is recorded on the
    /// payment. Payments captured before the failure stay captured.
    async fn capture(&self, org: &Organization, order: &Order, payments: &mut [Payment]) -> Result<(), CheckoutError> {
        for payment in payments.iter_mut().filter(|p| !p.captured && p.status != PaymentStatus::Cancelled) {
            match self.capture_payment(org, order, payment).await {
                Ok(()) => {
                    payment.mark_captured();
                    info!("💳️ Captured {} on payment {} for order {}", payment.amount, payment.id, order.id);
                },
                Err(e) => {
                    warn!("💳️ Could not capture payment {} for order {}. {e}", payment.id, order.id);
                    payment.mark_failed(&e.message);
                    return Err(e);
                },
            }
        }
        Ok(())
    }

    /// Refunds `amount`, taking as much as possible from each payment in turn. The caller has already checked that
    /// the payments can cover the amount.
    async fn refund(
        &self,
        org: &Organization,
        order: &Order,
        payments: &mut [Payment],
        amount: Cents,
    ) -> Result<(), CheckoutError> {
        let mut remaining = amount;
        for payment in payments.iter_mut() {
            if !remaining.is_positive() {
                break;
            }
            let portion = remaining.min(payment.refundable());
            if !portion.is_positive() {
                continue;
            }
            if payment.test {
                debug!("💳️ Payment {} is a test payment. Refunding {portion} without calling the gateway.", payment.id);
            } else {
                self.refund_payment(org, order, payment, portion).await?;
            }
            payment.amount_refunded += portion;
            if payment.amount_refunded == payment.amount {
                payment.status = PaymentStatus::Refunded;
            }
            remaining -= portion;
            info!("💳️ Refunded {portion} of payment {} on order {}", payment.id, order.id);
        }
        Ok(())
    }

    /// Completes a pending approval, capturing the payments.
    async fn confirm(
        &self,
        _org: &Organization,
        _order: &mut Order,
        _payments: &mut [Payment],
    ) -> Result<(), CheckoutError> {
        Err(CheckoutError::invalid_order_type())
    }

    /// Abandons a pending approval.
    async fn cancel(&self, _org: &Organization, _order: &mut Order, _payments: &mut [Payment]) -> Result<(), CheckoutError> {
        Err(CheckoutError::invalid_order_type())
    }
}

/// Maps gateway client errors into checkout errors tagged with the gateway's name.
pub(crate) fn gateway_err(gateway: &'static str) -> impl Fn(GatewayApiError) -> CheckoutError {
    move |e| CheckoutError::gateway(gateway, e)
}

/// The value of an optional account field the gateway call can't do without.
pub(crate) fn required<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str, CheckoutError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CheckoutError::validation(format!("{what} is required")))
}

/// Looks up payment processors by payment type.
#[derive(Clone)]
pub struct ProcessorRegistry {
    processors: HashMap<PaymentType, Arc<dyn PaymentProcessor>>,
    default_type: PaymentType,
}

impl ProcessorRegistry {
    /// An empty registry. Unknown types resolve to `default_type`.
    pub fn with_default(default_type: PaymentType) -> Self {
        Self { processors: HashMap::new(), default_type }
    }

    /// A registry with every supported gateway, defaulting to Stripe.
    pub fn with_gateways(endpoints: GatewayEndpoints, wallets: Arc<dyn WalletManagement>) -> Self {
        let mut registry = Self::with_default(PaymentType::Stripe);
        registry
            .register(Arc::new(BalanceProcessor))
            .register(Arc::new(NullProcessor))
            .register(Arc::new(EthereumProcessor::new(wallets)))
            .register(Arc::new(PaypalProcessor::new(endpoints.clone())))
            .register(Arc::new(StripeProcessor::new(endpoints.clone())))
            .register(Arc::new(SquareProcessor::new(endpoints.clone())))
            .register(Arc::new(AuthorizeNetProcessor::new(endpoints)));
        registry
    }

    /// Adds (or replaces) the processor for its payment type.
    pub fn register(&mut self, processor: Arc<dyn PaymentProcessor>) -> &mut Self {
        self.processors.insert(processor.payment_type(), processor);
        self
    }

    pub fn default_type(&self) -> PaymentType {
        self.default_type
    }

    pub fn resolve(&self, payment_type: PaymentType) -> Result<Arc<dyn PaymentProcessor>, CheckoutError> {
        if let Some(p) = self.processors.get(&payment_type) {
            return Ok(Arc::clone(p));
        }
        warn!("💳️ No processor for payment type '{payment_type}'. Falling back to {}.", self.default_type);
        self.processors.get(&self.default_type).cloned().ok_or_else(|| {
            CheckoutError::new(ErrorKind::UnsupportedPaymentType, format!("Unsupported payment type: {payment_type}"))
        })
    }
}

#[cfg(test)]
mod test {
    use checkout_common::Currency;

    use super::*;

    fn captured(id: &str, amount: i64, test: bool) -> Payment {
        Payment {
            id: id.into(),
            payment_type: PaymentType::Null,
            amount: Cents::from(amount),
            currency: Currency::from("usd"),
            captured: true,
            status: PaymentStatus::Paid,
            test,
            ..Default::default()
        }
    }

    #[test]
    fn unknown_types_use_the_default() {
        let mut registry = ProcessorRegistry::with_default(PaymentType::Null);
        registry.register(Arc::new(NullProcessor)).register(Arc::new(BalanceProcessor));
        assert_eq!(registry.resolve(PaymentType::Balance).unwrap().payment_type(), PaymentType::Balance);
        assert_eq!(registry.resolve(PaymentType::Unknown).unwrap().payment_type(), PaymentType::Null);
        assert_eq!(registry.resolve(PaymentType::Square).unwrap().payment_type(), PaymentType::Null);

        let empty = ProcessorRegistry::with_default(PaymentType::Stripe);
        let err = empty.resolve(PaymentType::Paypal).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnsupportedPaymentType);
    }

    #[tokio::test]
    async fn refunds_drain_payments_in_order() {
        let org = Organization::default();
        let order = Order::default();
        let mut payments = vec![captured("p1", 1_000, true), captured("p2", 3_000, true), captured("p3", 500, true)];
        payments[0].amount_refunded = Cents::from(400);
        NullProcessor.refund(&org, &order, &mut payments, Cents::from(2_000)).await.unwrap();
        assert_eq!(payments[0].amount_refunded, Cents::from(1_000));
        assert_eq!(payments[0].status, PaymentStatus::Refunded);
        assert_eq!(payments[1].amount_refunded, Cents::from(1_400));
        assert_eq!(payments[1].status, PaymentStatus::Paid);
        assert_eq!(payments[2].amount_refunded, Cents::ZERO);
    }

    #[tokio::test]
    async fn capture_skips_captured_payments() {
        let org = Organization::default();
        let order = Order::default();
        let mut pending = captured("p2", 700, false);
        pending.captured = false;
        pending.status = PaymentStatus::Unpaid;
        let mut cancelled = pending.clone();
        cancelled.id = "p3".into();
        cancelled.status = PaymentStatus::Cancelled;
        let mut payments = vec![captured("p1", 1_000, false), pending, cancelled];
        NullProcessor.capture(&org, &order, &mut payments).await.unwrap();
        assert!(payments[1].captured);
        assert_eq!(payments[1].status, PaymentStatus::Paid);
        assert!(!payments[2].captured);
    }
}
