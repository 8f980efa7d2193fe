use checkout_common::helpers::env_or_default;

pub const STRIPE_API_URL: &str = "https://api.stripe.com";
pub const SQUARE_API_URL: &str = "https://connect.squareup.com";
pub const SQUARE_SANDBOX_URL: &str = "https://connect.squareupsandbox.com";
pub const PAYPAL_API_URL: &str = "https://api-m.paypal.com";
pub const PAYPAL_SANDBOX_URL: &str = "https://api-m.sandbox.paypal.com";
pub const AUTHORIZE_NET_API_URL: &str = "https://api.authorize.net/xml/v1/request.api";
pub const AUTHORIZE_NET_SANDBOX_URL: &str = "https://apitest.authorize.net/xml/v1/request.api";

/// Base URLs for every gateway, for both live and sandbox accounts.
///
/// Credentials are per-organization and are not part of this struct; only the hosts are process-wide. Overriding the
/// URLs is mostly useful for pointing the engine at a local mock gateway.
#[derive(Debug, Clone)]
pub struct GatewayEndpoints {
    pub stripe: String,
    pub square: String,
    pub square_sandbox: String,
    pub paypal: String,
    pub paypal_sandbox: String,
    pub authorize_net: String,
    pub authorize_net_sandbox: String,
}

impl Default for GatewayEndpoints {
    fn default() -> Self {
        Self {
            stripe: STRIPE_API_URL.into(),
            square: SQUARE_API_URL.into(),
            square_sandbox: SQUARE_SANDBOX_URL.into(),
            paypal: PAYPAL_API_URL.into(),
            paypal_sandbox: PAYPAL_SANDBOX_URL.into(),
            authorize_net: AUTHORIZE_NET_API_URL.into(),
            authorize_net_sandbox: AUTHORIZE_NET_SANDBOX_URL.into(),
        }
    }
}

impl GatewayEndpoints {
    pub fn new_from_env_or_default() -> Self {
        Self {
            stripe: env_or_default("CHECKOUT_STRIPE_API_URL", STRIPE_API_URL),
            square: env_or_default("CHECKOUT_SQUARE_API_URL", SQUARE_API_URL),
            square_sandbox: env_or_default("CHECKOUT_SQUARE_SANDBOX_URL", SQUARE_SANDBOX_URL),
            paypal: env_or_default("CHECKOUT_PAYPAL_API_URL", PAYPAL_API_URL),
            paypal_sandbox: env_or_default("CHECKOUT_PAYPAL_SANDBOX_URL", PAYPAL_SANDBOX_URL),
            authorize_net: env_or_default("CHECKOUT_AUTHORIZENET_API_URL", AUTHORIZE_NET_API_URL),
            authorize_net_sandbox: env_or_default("CHECKOUT_AUTHORIZENET_SANDBOX_URL", AUTHORIZE_NET_SANDBOX_URL),
        }
    }

    pub fn square_for(&self, live: bool) -> &str {
        if live {
            &self.square
        } else {
            &self.square_sandbox
        }
    }

    pub fn paypal_for(&self, live: bool) -> &str {
        if live {
            &self.paypal
        } else {
            &self.paypal_sandbox
        }
    }

    pub fn authorize_net_for(&self, live: bool) -> &str {
        if live {
            &self.authorize_net
        } else {
            &self.authorize_net_sandbox
        }
    }
}
