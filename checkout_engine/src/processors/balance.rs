use async_trait::async_trait;
use checkout_common::Cents;
use log::*;

use super::PaymentProcessor;
use crate::{
    catalog_types::Organization,
    checkout_api::errors::CheckoutError,
    db_types::{Order, Payment, PaymentType, User},
};

/// Pays from the buyer's internal credit balance.
///
/// No gateway is involved. Authorization checks the user's cached balance in the order currency; moving the credit is
/// the ledger's job. Balance payments are always live, since the ledger has no sandbox.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceProcessor;

#[async_trait]
impl PaymentProcessor for BalanceProcessor {
    fn payment_type(&self) -> PaymentType {
        PaymentType::Balance
    }

    async fn authorize(
        &self,
        _org: &Organization,
        order: &mut Order,
        user: &mut User,
        payment: &mut Payment,
    ) -> Result<(), CheckoutError> {
        let available = user.balance_for(&order.currency);
        if available < order.total {
            info!(
                "💳️ User {} has {available} {} available, but order {} needs {}",
                user.id, order.currency, order.id, order.total
            );
            return Err(CheckoutError::insufficient_credit());
        }
        debug!("💳️ Balance authorization of {} for order {}", payment.amount, order.id);
        payment.live = true;
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

#[cfg(test)]
mod test {
    use checkout_common::Currency;

    use super::*;
    use crate::checkout_api::errors::ErrorKind;

    fn user(balance: i64) -> User {
        User { id: "u1".into(), balances: [(Currency::from("usd"), Cents::from(balance))].into(), ..Default::default() }
    }

    #[tokio::test]
    async fn checks_the_balance() {
        let org = Organization::default();
        let mut order = Order { total: Cents::from(500), currency: Currency::from("usd"), ..Default::default() };
        let mut payment = Payment { amount: Cents::from(500), ..Default::default() };

        BalanceProcessor.authorize(&org, &mut order, &mut user(1_000), &mut payment).await.unwrap();
        assert!(payment.live);

        let err = BalanceProcessor.authorize(&org, &mut order, &mut user(100), &mut payment).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientCredit);

        // Balances are per currency
        order.currency = Currency::from("eur");
        let err = BalanceProcessor.authorize(&org, &mut order, &mut user(1_000), &mut payment).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientCredit);
    }
}
