//! # Checkout server
//! The HTTP front end for the checkout engine. It is responsible for:
//! * Authenticating callers by API key and resolving the organization they act for.
//! * Decoding checkout requests and handing them to [`checkout_engine::CheckoutApi`].
//! * Mapping checkout errors onto HTTP statuses with a `{"error": "..."}` body.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/checkout/authorize[/{orderid}]`, `/checkout/capture/{orderid}`, `/checkout/charge`,
//!   `/checkout/confirm/{orderid}`, `/checkout/cancel/{orderid}` and `/checkout/refund/{orderid}`.

pub mod analytics;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod wallets;

#[cfg(test)]
mod endpoint_tests;
