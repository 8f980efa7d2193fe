use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use checkout_common::{Cents, Currency, Decimal};

use crate::{
    catalog_types::{FeeSchedule, Organization, Pricing},
    db_types::User,
    helpers::new_id,
    traits::{Wallet, WalletError, WalletManagement},
};

/// A wallet service that hands out fake addresses, or refuses to.
#[derive(Debug, Default)]
pub struct StubWallets {
    fail: bool,
    created: AtomicU64,
}

impl StubWallets {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletManagement for StubWallets {
    async fn create_wallet(&self, owner_id: &str, blockchain: &str) -> Result<Wallet, WalletError> {
        if self.fail {
            return Err(WalletError::Unavailable("stub wallets are offline".into()));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Wallet {
            id: new_id("wal"),
            owner_id: owner_id.to_string(),
            blockchain: blockchain.to_string(),
            address: format!("0x{n:040x}"),
        })
    }
}

/// A sandbox organization with card pricing of 30c + 2.9%.
pub fn organization() -> Organization {
    Organization {
        id: "org_test".into(),
        name: "Test Org".into(),
        live: false,
        fees: FeeSchedule {
            card: Pricing { flat: Cents::from(30), percent: Decimal::new(29, 3) },
            ethereum: Pricing { flat: Cents::ZERO, percent: Decimal::new(1, 2) },
            bitcoin: Pricing { flat: Cents::ZERO, percent: Decimal::new(1, 2) },
            affiliate: Pricing { flat: Cents::ZERO, percent: Decimal::new(1, 1) },
        },
        ..Default::default()
    }
}

/// A buyer with a cached ledger balance in USD.
pub fn user_with_balance(id: &str, email: &str, usd: i64) -> User {
    User {
        id: id.into(),
        email: email.into(),
        balances: [(Currency::from("usd"), Cents::from(usd))].into_iter().collect(),
        ..Default::default()
    }
}
