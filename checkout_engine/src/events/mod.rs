//! Checkout events.
//!
//! The orchestrator publishes an event after each state transition has been persisted. Side effects that belong to
//! other subsystems (referral redemption, cart status, analytics counters, emails) subscribe through [`EventHooks`].
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
