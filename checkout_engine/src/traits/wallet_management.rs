use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A blockchain wallet provisioned for a buyer. Settlement into the wallet is watched by an external process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    pub owner_id: String,
    pub blockchain: String,
    pub address: String,
}

#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("Could not create wallet. {0}")]
    CreationFailed(String),
    #[error("The wallet service is not available. {0}")]
    Unavailable(String),
}

/// Provisions wallets for Ethereum checkouts and token sales.
///
/// Implementations are shared between the orchestrator and the Ethereum processor, so this trait is object safe.
#[async_trait]
pub trait WalletManagement: Send + Sync {
    /// Creates a new wallet on `blockchain` owned by `owner_id` (a user or order id).
    async fn create_wallet(&self, owner_id: &str, blockchain: &str) -> Result<Wallet, WalletError>;
}
