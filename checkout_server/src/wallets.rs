use async_trait::async_trait;
use checkout_engine::traits::{Wallet, WalletError, WalletManagement};
use log::*;

/// Wallet provisioning is owned by the user service, which this server doesn't talk to yet. Ethereum checkouts and
/// token sales fail with a gateway error until one is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableWallets;

#[async_trait]
impl WalletManagement for UnavailableWallets {
    async fn create_wallet(&self, owner_id: &str, blockchain: &str) -> Result<Wallet, WalletError> {
        warn!("💻️ Cannot create a {blockchain} wallet for {owner_id}. No wallet service is configured.");
        Err(WalletError::Unavailable("no wallet service is configured".into()))
    }
}
