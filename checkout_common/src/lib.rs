//! Value types shared by every crate in the checkout workspace.
//!
//! Money is always carried as [`Cents`], an integer count of the currency's minor unit. Rates (tax, fees, discount
//! percentages) are carried as [`rust_decimal::Decimal`] fractions, so `0.075` means 7.5%.
mod cents;
mod currency;
pub mod helpers;
pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError};
pub use currency::Currency;
pub use rust_decimal::Decimal;
pub use secret::Secret;
