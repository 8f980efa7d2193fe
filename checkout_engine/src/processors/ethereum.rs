use std::sync::Arc;

use async_trait::async_trait;
use checkout_common::Cents;
use log::*;

use super::PaymentProcessor;
use crate::{
    catalog_types::Organization,
    checkout_api::errors::{CheckoutError, ErrorKind},
    db_types::{Order, Payment, PaymentType, User},
    traits::WalletManagement,
};

pub const ETHEREUM: &str = "ethereum";

/// Ethereum checkouts don't charge anything up front. Authorization provisions a deposit wallet for the order, and
/// an external chain watcher creates the payment once funds arrive.
pub struct EthereumProcessor {
    wallets: Arc<dyn WalletManagement>,
}

impl EthereumProcessor {
    pub fn new(wallets: Arc<dyn WalletManagement>) -> Self {
        Self { wallets }
    }

    fn settled_on_chain() -> CheckoutError {
        CheckoutError::new(ErrorKind::UnsupportedPaymentType, "Ethereum payments are settled on chain")
    }
}

#[async_trait]
impl PaymentProcessor for EthereumProcessor {
    fn payment_type(&self) -> PaymentType {
        PaymentType::Ethereum
    }

    fn persists_payment(&self) -> bool {
        false
    }

    async fn authorize(
        &self,
        org: &Organization,
        order: &mut Order,
        user: &mut User,
        payment: &mut Payment,
    ) -> Result<(), CheckoutError> {
        let wallet = self.wallets.create_wallet(&order.id, ETHEREUM).await?;
        info!("💳️ Created {ETHEREUM} wallet {} for order {}", wallet.id, order.id);
        order.wallet_id = Some(wallet.id.clone());
        if !user.wallet_ids.contains(&wallet.id) {
            user.wallet_ids.push(wallet.id.clone());
        }
        payment.account.wallet_id = Some(wallet.id);
        payment.account.address = Some(wallet.address);
        payment.live = org.live;
        Ok(())
    }

    async fn capture_payment(&self, _org: &Organization, _order: &Order, _payment: &mut Payment) -> Result<(), CheckoutError> {
        Err(Self::settled_on_chain())
    }

    async fn refund_payment(
        &self,
        _org: &Organization,
        _order: &Order,
        _payment: &mut Payment,
        _amount: Cents,
    ) -> Result<(), CheckoutError> {
        Err(Self::settled_on_chain())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::fixtures::StubWallets;

    #[tokio::test]
    async fn provisions_a_wallet() {
        let processor = EthereumProcessor::new(Arc::new(StubWallets::default()));
        assert!(!processor.persists_payment());
        let mut order = Order { id: "ord_1".into(), ..Default::default() };
        let mut user = User { id: "u1".into(), ..Default::default() };
        let mut payment = Payment::default();
        processor.authorize(&Organization::default(), &mut order, &mut user, &mut payment).await.unwrap();
        let wallet_id = order.wallet_id.clone().unwrap();
        assert_eq!(user.wallet_ids, vec![wallet_id.clone()]);
        assert_eq!(payment.account.wallet_id, Some(wallet_id));
        assert!(payment.account.address.as_deref().unwrap().starts_with("0x"));

        let err = processor.capture_payment(&Organization::default(), &order, &mut payment).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedPaymentType);
    }

    #[tokio::test]
    async fn wallet_failures_abort() {
        let processor = EthereumProcessor::new(Arc::new(StubWallets::failing()));
        let mut order = Order { id: "ord_1".into(), ..Default::default() };
        let err = processor
            .authorize(&Organization::default(), &mut order, &mut User::default(), &mut Payment::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Gateway);
        assert!(order.wallet_id.is_none());
    }
}
