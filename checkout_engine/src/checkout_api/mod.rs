//! # Checkout API
//!
//! [`CheckoutApi`] is the orchestrator and the only entry point callers need. It owns the persistence backend, the
//! processor registry and the event producers, and exposes the checkout state machine:
//!
//! * `authorize`: merge the user, normalize and tally the order, compute fees and authorize with the gateway. Nothing is
//!   stored unless the gateway accepts the payment.
//! * `capture` / `charge`: settle authorized payments and mark the order paid once `paid == total`.
//! * `refund`: return part or all of the paid amount. Every payment on the order must belong to the order's gateway.
//! * `confirm` / `cancel`: finish or abandon a two-phase (PayPal) approval.
pub mod checkout_objects;
pub mod errors;

#[allow(clippy::module_inception)]
mod checkout_api;

pub use checkout_api::{CheckoutApi, TEST_ORDER_TOTAL};
