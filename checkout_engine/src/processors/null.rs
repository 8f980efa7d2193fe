use async_trait::async_trait;
use checkout_common::Cents;
use log::*;

use super::PaymentProcessor;
use crate::{
    catalog_types::Organization,
    checkout_api::errors::CheckoutError,
    db_types::{Order, Payment, PaymentType, User},
};

/// Accepts everything. Used for zero-value orders and test flows. Null payments are never live.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProcessor;

#[async_trait]
impl PaymentProcessor for NullProcessor {
    fn payment_type(&self) -> PaymentType {
        PaymentType::Null
    }

    async fn authorize(
        &self,
        _org: &Organization,
        order: &mut Order,
        _user: &mut User,
        payment: &mut Payment,
    ) -> Result<(), CheckoutError> {
        debug!("💳️ Null authorization of {} for order {}", payment.amount, order.id);
        payment.live = false;
        Ok(())
    }

    async fn capture_payment(&self, _org: &Organization, _order: &Order, _payment: &mut Payment) -> Result<(), CheckoutError> {
        Ok(())
    }

    async fn refund_payment(
        &self,
        _org: &Organization,
        _order: &Order,
        _payment: &mut Payment,
        _amount: Cents,
    ) -> Result<(), CheckoutError> {
        Ok(())
    }
}
