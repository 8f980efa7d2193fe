//! # Collaborator interfaces
//!
//! The checkout core owns the tally and payment state machine, but relies on the outside world for storage and for
//! wallet provisioning. This module defines those contracts.
//!
//! * [`CheckoutDatabase`] is the persistence port: a document store offering `get`, `put`, multi-entity `put_batch`
//!   and ancestor queries, plus the append-only coupon redemption log. Entities are written in an [`EntityBatch`],
//!   which backends that support transactions commit atomically.
//! * [`WalletManagement`] provisions blockchain wallets for Ethereum checkouts and token sales.
mod checkout_database;
mod wallet_management;

pub use checkout_database::{CheckoutDatabase, DatabaseError, Entity, EntityBatch, StoredEntity};
pub use wallet_management::{Wallet, WalletError, WalletManagement};
