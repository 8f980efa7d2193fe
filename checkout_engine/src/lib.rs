//! Checkout Engine
//!
//! The checkout engine turns a shopping cart into money moved. It owns the order tally (coupons, rule-based
//! discounts, shipping and tax), the platform fee split, and the payment state machine that drives each supported
//! gateway through authorize, capture, refund, confirm and cancel.
//!
//! The library is divided into these main sections:
//! 1. The data model ([`mod@db_types`] and [`mod@catalog_types`]). Orders, payments, fees and users are owned by the
//!    checkout; coupons, discounts, products, stores and organizations are read-only catalogue data.
//! 2. The tally ([`mod@tally`]) and fee calculation ([`mod@fees`]). These are pure functions of the order and the
//!    catalogue.
//! 3. Payment processors ([`mod@processors`]). One implementation of [`processors::PaymentProcessor`] per gateway,
//!    looked up by payment type in a [`processors::ProcessorRegistry`].
//! 4. The public API ([`CheckoutApi`]), which orchestrates the above and persists the results.
//! 5. Persistence. Backends implement [`traits::CheckoutDatabase`]. SQLite is the production backend;
//!    [`MemoryDatabase`] is used in tests and for ephemeral deployments.
//!
//! The engine also emits events after each state transition (see [`mod@events`]), which is how referral
//! redemptions, cart updates and analytics are hooked in without the checkout knowing about them.
pub mod catalog_types;
pub mod checkout_api;
pub mod db_types;
pub mod events;
pub mod fees;
pub mod helpers;
pub mod memory;
pub mod processors;
pub mod tally;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use checkout_api::{
    checkout_objects,
    errors::{CheckoutError, ErrorKind},
    CheckoutApi,
};
pub use memory::MemoryDatabase;
#[cfg(feature = "sqlite")]
pub use sqlite::{db::db_url, SqliteDatabase};
