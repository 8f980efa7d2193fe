use std::fmt::Display;

use gateway_tools::GatewayApiError;
use thiserror::Error;

use crate::traits::{DatabaseError, WalletError};

/// The closed set of checkout failure kinds. Callers (notably the HTTP layer) switch on this rather than on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or malformed input.
    Validation,
    InvalidCouponCode,
    CouponUnredeemable,
    MissingItemEntity,
    ItemUnavailable,
    InsufficientCredit,
    UnsupportedPaymentType,
    TokenSaleNotFound,
    FailedToCaptureCharge,
    /// A refund touched payments from more than one gateway, or a payment from the wrong gateway.
    PaymentTypeMismatch,
    ZeroRefund,
    NegativeRefund,
    RefundExceedsTotal,
    InsufficientPaid,
    /// Confirm and cancel are only supported by two-phase gateways.
    InvalidOrderType,
    OrderNotFound,
    UserNotFound,
    /// The gateway rejected the request or could not be reached.
    Gateway,
    Storage,
}

impl ErrorKind {
    /// True for errors caused by the request rather than by this system or its collaborators.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ErrorKind::Gateway | ErrorKind::Storage | ErrorKind::OrderNotFound | ErrorKind::UserNotFound)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CheckoutError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CheckoutError {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn gateway<S: Display>(gateway: &str, reason: S) -> Self {
        Self::new(ErrorKind::Gateway, format!("{gateway} error: {reason}"))
    }

    pub fn invalid_coupon_code(code: &str) -> Self {
        Self::new(ErrorKind::InvalidCouponCode, format!("Invalid coupon code: {code}"))
    }

    pub fn coupon_unredeemable(code: &str) -> Self {
        Self::new(ErrorKind::CouponUnredeemable, format!("Coupon {code} is no longer available"))
    }

    pub fn insufficient_credit() -> Self {
        Self::new(ErrorKind::InsufficientCredit, "Insufficient credit to complete this purchase")
    }

    pub fn invalid_order_type() -> Self {
        Self::new(ErrorKind::InvalidOrderType, "Invalid order type")
    }

    pub fn order_not_found(id: &str) -> Self {
        Self::new(ErrorKind::OrderNotFound, format!("Order {id} does not exist"))
    }

    pub fn user_not_found(id: &str) -> Self {
        Self::new(ErrorKind::UserNotFound, format!("User {id} does not exist"))
    }

    pub fn failed_to_capture(reason: &str) -> Self {
        Self::new(ErrorKind::FailedToCaptureCharge, format!("Failed to capture charge. {reason}"))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<DatabaseError> for CheckoutError {
    fn from(e: DatabaseError) -> Self {
        Self::new(ErrorKind::Storage, e.to_string())
    }
}

impl From<WalletError> for CheckoutError {
    fn from(e: WalletError) -> Self {
        Self::new(ErrorKind::Gateway, e.to_string())
    }
}

impl From<GatewayApiError> for CheckoutError {
    fn from(e: GatewayApiError) -> Self {
        Self::new(ErrorKind::Gateway, e.to_string())
    }
}
