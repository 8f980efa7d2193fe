use checkout_common::Cents;

use crate::db_types::{Order, Payment};

/// A payment was authorized and the order, user and payment were stored.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAuthorizedEvent {
    pub order: Order,
    /// `None` for processors that settle asynchronously (Ethereum).
    pub payment: Option<Payment>,
}

impl OrderAuthorizedEvent {
    pub fn new(order: Order, payment: Option<Payment>) -> Self {
        Self { order, payment }
    }
}

/// Funds were captured on an order, either by a capture call or by a confirmed PayPal approval.
///
/// Referral redemption, cart status updates and sales counters hang off this event.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCapturedEvent {
    pub order: Order,
    pub payments: Vec<Payment>,
    /// The amount captured by this call.
    pub captured: Cents,
}

impl OrderCapturedEvent {
    pub fn new(order: Order, payments: Vec<Payment>, captured: Cents) -> Self {
        Self { order, payments, captured }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRefundedEvent {
    pub order: Order,
    pub amount: Cents,
}

impl OrderRefundedEvent {
    pub fn new(order: Order, amount: Cents) -> Self {
        Self { order, amount }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderCancelledEvent {
    pub order: Order,
}

impl OrderCancelledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
