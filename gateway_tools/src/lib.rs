//! REST clients for the third-party payment gateways.
//!
//! These clients know nothing about orders or payments. They translate a handful of gateway calls into HTTP requests
//! and hand back the gateway's own response objects. All the checkout semantics live in the engine's processor
//! adapters.
mod authorize_net;
mod config;
mod error;
mod paypal;
mod rest;
mod square;
mod stripe;

pub use authorize_net::{AuthorizeNetApi, AuthorizeNetCard, AuthorizeNetConfig, TransactionResponse};
pub use config::GatewayEndpoints;
pub use error::GatewayApiError;
pub use paypal::{PaypalApi, PaypalCapture, PaypalConfig, PaypalLink, PaypalOrder, PaypalRefund};
pub use rest::{RestBody, RestClient};
pub use square::{Money, SquareApi, SquareConfig, SquarePayment, SquarePaymentRequest, SquareRefund};
pub use stripe::{StripeApi, StripeCard, StripeCharge, StripeChargeRequest, StripeConfig, StripeCustomer, StripeRefund};
