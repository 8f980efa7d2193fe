use std::{fmt::Debug, sync::Arc};

use checkout_common::Cents;
use log::*;

use super::{
    checkout_objects::{AuthorizationRequest, CheckoutResult},
    errors::{CheckoutError, ErrorKind},
};
use crate::{
    catalog_types::{Organization, Store, TokenSale},
    db_types::{Order, OrderStatus, Payment, PaymentStatus, User},
    events::{EventProducers, OrderAuthorizedEvent, OrderCancelledEvent, OrderCapturedEvent, OrderRefundedEvent},
    fees::FeeCalculator,
    helpers::{is_test_email, new_id, order_number_from_id},
    processors::ProcessorRegistry,
    tally::OrderTally,
    traits::{CheckoutDatabase, EntityBatch, WalletManagement},
};

/// The total charged for checkouts by whitelisted test buyers.
pub const TEST_ORDER_TOTAL: Cents = Cents::from_const(50);

/// `CheckoutApi` drives an order through authorize, capture, refund, confirm and cancel.
///
/// Every operation loads the order aggregate, hands it to the payment processor registered for the order's type, and
/// writes the result back in a single [`EntityBatch`]. Events are published only after the batch has been written.
pub struct CheckoutApi<B> {
    db: B,
    processors: ProcessorRegistry,
    wallets: Arc<dyn WalletManagement>,
    producers: EventProducers,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(
        db: B,
        processors: ProcessorRegistry,
        wallets: Arc<dyn WalletManagement>,
        producers: EventProducers,
    ) -> Self {
        Self { db, processors, wallets, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> CheckoutApi<B>
where B: CheckoutDatabase
{
    /// Authorizes a payment for a new order, or for the existing order `order_id`.
    ///
    /// Nothing is written if the tally or the gateway fails. On a gateway failure the returned error carries the
    /// gateway's message; the order and payment are marked cancelled in memory only.
    pub async fn authorize(
        &self,
        org: &Organization,
        order_id: Option<&str>,
        req: AuthorizationRequest,
    ) -> Result<CheckoutResult, CheckoutError> {
        let AuthorizationRequest { user, order: order_req, payment: payment_req } = req;
        let mut user = self.merge_user(user).await?;
        let mut order = match order_id {
            Some(id) => self.fetch_open_order(id).await?,
            None => {
                let id = new_id("ord");
                Order { number: order_number_from_id(&id), id, ..Default::default() }
            },
        };
        order_req.apply_to(&mut order);
        order.user_id = user.id.clone();
        if order.number == 0 {
            order.number = order_number_from_id(&order.id);
        }
        fill_addresses(&mut order, &mut user);

        let payment_type = payment_req.payment_type.unwrap_or(order.payment_type);
        let processor = self.processors.resolve(payment_type)?;
        order.payment_type = processor.payment_type();
        let mut payment = Payment {
            id: new_id("pay"),
            order_id: order.id.clone(),
            user_id: user.id.clone(),
            payment_type: processor.payment_type(),
            account: payment_req.account,
            client_ip: payment_req.client_ip,
            ..Default::default()
        };
        payment.account.normalize();

        let store = match order.store_id.as_deref() {
            Some(id) => {
                let store = self
                    .db
                    .get::<Store>(id)
                    .await?
                    .ok_or_else(|| CheckoutError::validation(format!("Store {id} does not exist")))?;
                order.currency = store.currency.clone();
                Some(store)
            },
            None => None,
        };
        OrderTally::new(&self.db).tally(&mut order, store.as_ref()).await?;

        if let Some(sale_id) = order.token_sale_id.clone() {
            self.provision_token_sale_wallet(&sale_id, &mut order, &mut user).await?;
        }

        payment.buyer = user.buyer();
        if is_test_email(&org.email_whitelist, &user.email) {
            info!("🛒️ {} is a whitelisted test buyer. Order {} is a test order.", user.email, order.id);
            order.adjustment = TEST_ORDER_TOTAL - (order.subtotal + order.shipping + order.tax);
            order.total = TEST_ORDER_TOTAL;
            order.test = true;
            payment.test = true;
            order.update_balance();
        }

        if order.total.is_negative() {
            return Err(CheckoutError::validation(format!("Order {} has a negative total ({})", order.id, order.total)));
        }
        payment.amount = order.total;
        payment.currency = order.currency.clone();
        payment.description = payment_req.description.unwrap_or_else(|| {
            if order.description.is_empty() {
                format!("Order #{}", order.number)
            } else {
                order.description.clone()
            }
        });
        let mut fees = FeeCalculator::new(&self.db).calculate(org, &order, &payment).await?;
        payment.fee = fees.iter().map(|f| f.amount).sum();
        payment.fee_ids = fees.iter().map(|f| f.id.clone()).collect();
        if processor.persists_payment() {
            order.payment_ids.push(payment.id.clone());
        }

        if let Err(e) = processor.authorize(org, &mut order, &mut user, &mut payment).await {
            warn!("🛒️ Authorization of order {} ({}) failed. {e}", order.id, order.payment_type);
            order.cancel();
            payment.status = PaymentStatus::Cancelled;
            payment.account.error = Some(e.message.clone());
            return Err(e);
        }
        payment.test = payment.test || !payment.live;
        order.test = order.test || payment.test;
        fees.iter_mut().for_each(|f| f.test = payment.test);

        let mut batch = EntityBatch::new();
        batch.add(&user)?.add(&order)?;
        if processor.persists_payment() {
            batch.add(&payment)?.add_all(&fees)?;
        }
        self.db.put_batch(batch).await?;
        info!("🛒️ Order {} authorized for {} {} via {}", order.id, payment.amount, payment.currency, order.payment_type);

        let payments = if processor.persists_payment() { vec![payment] } else { vec![] };
        let event = OrderAuthorizedEvent::new(order.clone(), payments.first().cloned());
        self.producers.publish_order_authorized(event).await;
        Ok(CheckoutResult::new(order, payments))
    }

    /// Captures every uncaptured payment on the order.
    ///
    /// The order and payments are written back even if a capture fails, so that payments captured before the failure
    /// (and the failure itself) are on record.
    pub async fn capture(&self, org: &Organization, order_id: &str) -> Result<CheckoutResult, CheckoutError> {
        let mut order = self.fetch_order(order_id).await?;
        let mut payments = self.db.children::<Payment>(&order.id).await?;
        let processor = self.processors.resolve(order.payment_type)?;
        let before = captured_total(&payments);
        let result = processor.capture(org, &order, &mut payments).await;
        let captured = captured_total(&payments) - before;
        self.settle(&mut order, &mut payments, captured, result).await
    }

    /// Authorizes a new order and captures it immediately.
    pub async fn charge(&self, org: &Organization, req: AuthorizationRequest) -> Result<CheckoutResult, CheckoutError> {
        let authorized = self.authorize(org, None, req).await?;
        self.capture(org, &authorized.order.id).await
    }

    /// Refunds `amount` of the order's captured payments.
    ///
    /// A partial refund leaves the order's payment status as it was. Refunding the whole total marks the order
    /// refunded and cancels it.
    pub async fn refund(
        &self,
        org: &Organization,
        order_id: &str,
        amount: Cents,
    ) -> Result<CheckoutResult, CheckoutError> {
        let mut order = self.fetch_order(order_id).await?;
        validate_refund(&order, amount)?;
        let mut payments = self.db.children::<Payment>(&order.id).await?;
        let processor = self.processors.resolve(order.payment_type)?;
        if let Some(p) = payments.iter().find(|p| p.payment_type != processor.payment_type()) {
            return Err(CheckoutError::new(
                ErrorKind::PaymentTypeMismatch,
                format!("Payment {} is a {} payment, but order {} is {}", p.id, p.payment_type, order.id, order.payment_type),
            ));
        }
        let refundable: Cents = payments.iter().map(Payment::refundable).sum();
        if refundable < amount {
            return Err(CheckoutError::new(
                ErrorKind::InsufficientPaid,
                format!("Only {refundable} of order {} can be refunded", order.id),
            ));
        }

        let before = refunded_total(&payments);
        let result = processor.refund(org, &order, &mut payments, amount).await;
        let refunded = refunded_total(&payments) - before;
        order.refunded += refunded;
        order.paid -= refunded;
        if order.refunded == order.total {
            order.payment_status = PaymentStatus::Refunded;
            order.cancel();
        }
        order.update_balance();
        self.save_order(&order, &payments).await?;
        if let Err(e) = result {
            error!("🛒️ Refund on order {} stopped after {refunded} of {amount}. {e}", order.id);
            return Err(e);
        }
        info!("🛒️ Refunded {refunded} on order {}", order.id);
        self.producers.publish_order_refunded(OrderRefundedEvent::new(order.clone(), refunded)).await;
        Ok(CheckoutResult::new(order, payments))
    }

    /// Completes a pending two-phase approval. Only supported by PayPal orders.
    pub async fn confirm(&self, org: &Organization, order_id: &str) -> Result<CheckoutResult, CheckoutError> {
        let mut order = self.fetch_order(order_id).await?;
        let mut payments = self.db.children::<Payment>(&order.id).await?;
        let processor = self.processors.resolve(order.payment_type)?;
        let before = captured_total(&payments);
        let result = processor.confirm(org, &mut order, &mut payments).await;
        if let Err(e) = &result {
            if e.kind() == ErrorKind::InvalidOrderType {
                return Err(e.clone());
            }
        }
        let captured = captured_total(&payments) - before;
        self.settle(&mut order, &mut payments, captured, result).await
    }

    /// Abandons a pending two-phase approval. Only supported by PayPal orders.
    pub async fn cancel(&self, org: &Organization, order_id: &str) -> Result<CheckoutResult, CheckoutError> {
        let mut order = self.fetch_order(order_id).await?;
        let mut payments = self.db.children::<Payment>(&order.id).await?;
        let processor = self.processors.resolve(order.payment_type)?;
        processor.cancel(org, &mut order, &mut payments).await?;
        if order.status != OrderStatus::Cancelled {
            order.cancel();
        }
        order.payment_status = PaymentStatus::Cancelled;
        self.save_order(&order, &payments).await?;
        info!("🛒️ Order {} cancelled", order.id);
        self.producers.publish_order_cancelled(OrderCancelledEvent::new(order.clone())).await;
        Ok(CheckoutResult::new(order, payments))
    }

    //------------------------------------------   Helpers   ------------------------------------------------------

    /// Merges the request's user into the stored one. Request fields win; everything unset is copied forward.
    async fn merge_user(&self, mut user: User) -> Result<User, CheckoutError> {
        user.normalize();
        let stored = if user.id.is_empty() {
            if user.email.is_empty() {
                None
            } else {
                self.db.children::<User>(&User::email_key(&user.email)).await?.into_iter().next()
            }
        } else {
            Some(self.db.get::<User>(&user.id).await?.ok_or_else(|| CheckoutError::user_not_found(&user.id))?)
        };
        if let Some(stored) = stored {
            trace!("🛒️ Merging request user into stored user {}", stored.id);
            user.copy_forward(&stored);
        }
        if user.email.is_empty() {
            return Err(CheckoutError::validation("An email address is required"));
        }
        if user.id.is_empty() {
            user.id = new_id("usr");
            debug!("🛒️ New user {} for {}", user.id, user.email);
        }
        Ok(user)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<Order, CheckoutError> {
        self.db.get::<Order>(order_id).await?.ok_or_else(|| CheckoutError::order_not_found(order_id))
    }

    /// An existing order that can still take a payment.
    async fn fetch_open_order(&self, order_id: &str) -> Result<Order, CheckoutError> {
        let order = self.fetch_order(order_id).await?;
        if order.status == OrderStatus::Cancelled {
            return Err(CheckoutError::validation(format!("Order {order_id} has been cancelled")));
        }
        if order.payment_status == PaymentStatus::Paid {
            return Err(CheckoutError::validation(format!("Order {order_id} has already been paid")));
        }
        Ok(order)
    }

    async fn provision_token_sale_wallet(
        &self,
        sale_id: &str,
        order: &mut Order,
        user: &mut User,
    ) -> Result<(), CheckoutError> {
        let sale = self.db.get::<TokenSale>(sale_id).await?.ok_or_else(|| {
            CheckoutError::new(ErrorKind::TokenSaleNotFound, format!("Token sale {sale_id} does not exist"))
        })?;
        let blockchain = if sale.currency.is_bitcoin() { "bitcoin" } else { "ethereum" };
        let wallet = self.wallets.create_wallet(&user.id, blockchain).await?;
        debug!("🛒️ Created {blockchain} wallet {} for token sale {}", wallet.id, sale.name);
        order.wallet_id = Some(wallet.id.clone());
        if !user.wallet_ids.contains(&wallet.id) {
            user.wallet_ids.push(wallet.id);
        }
        Ok(())
    }

    /// Books newly captured funds on the order and persists it with its payments. The processor's result is returned
    /// after the write, so partial progress is never lost.
    async fn settle(
        &self,
        order: &mut Order,
        payments: &mut [Payment],
        captured: Cents,
        result: Result<(), CheckoutError>,
    ) -> Result<CheckoutResult, CheckoutError> {
        order.paid += captured;
        let newly_paid = result.is_ok() && order.paid >= order.total && order.payment_status != PaymentStatus::Paid;
        if newly_paid {
            order.payment_status = PaymentStatus::Paid;
            info!("🛒️ Order {} is paid in full", order.id);
        }
        order.update_balance();
        self.save_order(order, payments).await?;
        if newly_paid && !order.test {
            self.record_redemptions(order).await;
        }
        result?;
        if captured.is_positive() {
            let event = OrderCapturedEvent::new(order.clone(), payments.to_vec(), captured);
            self.producers.publish_order_captured(event).await;
        }
        Ok(CheckoutResult::new(order.clone(), payments.to_vec()))
    }

    async fn record_redemptions(&self, order: &Order) {
        for coupon in &order.coupons {
            if let Err(e) = self.db.append_redemption(&coupon.code, &order.id).await {
                error!("🛒️ Could not record redemption of {} for order {}. {e}", coupon.code, order.id);
            }
        }
    }

    async fn save_order(&self, order: &Order, payments: &[Payment]) -> Result<(), CheckoutError> {
        let mut batch = EntityBatch::new();
        batch.add(order)?.add_all(payments)?;
        self.db.put_batch(batch).await?;
        Ok(())
    }
}

fn fill_addresses(order: &mut Order, user: &mut User) {
    if order.billing_address.is_empty() {
        order.billing_address = user.billing_address.clone();
    } else if user.billing_address.is_empty() {
        user.billing_address = order.billing_address.clone();
    }
    if order.shipping_address.is_empty() {
        order.shipping_address = user.shipping_address.clone();
    } else if user.shipping_address.is_empty() {
        user.shipping_address = order.shipping_address.clone();
    }
    // A buyer often gives only one address
    if order.shipping_address.is_empty() {
        order.shipping_address = order.billing_address.clone();
    }
    order.normalize_addresses();
    user.billing_address.normalize();
    user.shipping_address.normalize();
}

fn validate_refund(order: &Order, amount: Cents) -> Result<(), CheckoutError> {
    if amount.is_zero() {
        return Err(CheckoutError::new(ErrorKind::ZeroRefund, "Refund amount must be greater than zero"));
    }
    if amount.is_negative() {
        return Err(CheckoutError::new(ErrorKind::NegativeRefund, "Refund amount cannot be negative"));
    }
    if amount > order.total - order.refunded {
        return Err(CheckoutError::new(
            ErrorKind::RefundExceedsTotal,
            format!("Cannot refund {amount}. Only {} of order {} has not been refunded", order.total - order.refunded, order.id),
        ));
    }
    if order.paid < amount {
        return Err(CheckoutError::new(
            ErrorKind::InsufficientPaid,
            format!("Cannot refund {amount}. Only {} of order {} has been paid", order.paid, order.id),
        ));
    }
    Ok(())
}

fn captured_total(payments: &[Payment]) -> Cents {
    payments.iter().filter(|p| p.captured).map(|p| p.amount).sum()
}

fn refunded_total(payments: &[Payment]) -> Cents {
    payments.iter().map(|p| p.amount_refunded).sum()
}
