mod checkout_world;
mod setups;
mod steps;

pub use checkout_world::{CheckoutSystem, CheckoutWorld};
