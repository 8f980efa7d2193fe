//! Catalogue and tenant data the checkout reads but never writes: coupons, discount rules, products, stores and
//! organizations.
use std::collections::HashMap;

use checkout_common::{Cents, Currency, Decimal, Secret};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{db_types::Address, traits::Entity};

fn in_window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>, at: DateTime<Utc>) -> bool {
    start.map_or(true, |s| at >= s) && end.map_or(true, |e| at <= e)
}

//--------------------------------------        Coupon         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CouponType {
    /// `amount` is in cents.
    #[default]
    Flat,
    /// `amount` is a whole percentage.
    Percent,
    FreeShipping,
    FreeItem,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coupon {
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub coupon_type: CouponType,
    pub amount: i64,
    /// Item scope. When both are empty the coupon applies to the whole order.
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub free_product_id: Option<String>,
    pub free_variant_id: Option<String>,
    pub free_quantity: i64,
    /// Restricts an item-scoped coupon to the first matching line item.
    pub once: bool,
    pub enabled: bool,
    /// Maximum number of redemptions. Values below 1 mean unlimited.
    pub limit: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Coupon {
    pub fn is_redeemable(&self, redemptions: i64) -> bool {
        self.enabled && (self.limit < 1 || redemptions < self.limit)
    }

    pub fn valid_for(&self, at: DateTime<Utc>) -> bool {
        in_window(self.start_date, self.end_date, at)
    }

    /// The product or variant this coupon is scoped to, if any.
    pub fn item_id(&self) -> Option<&str> {
        self.variant_id.as_deref().or(self.product_id.as_deref()).filter(|s| !s.is_empty())
    }
}

//--------------------------------------       Discount        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DiscountScope {
    Organization,
    Store { store_id: String },
    Product { product_id: String },
    Variant { variant_id: String },
    Collection { collection_id: String },
}

impl Default for DiscountScope {
    fn default() -> Self {
        Self::Organization
    }
}

impl DiscountScope {
    /// The ancestor key discounts of this scope are stored under.
    pub fn key(&self) -> String {
        match self {
            DiscountScope::Organization => "organization".to_string(),
            DiscountScope::Store { store_id } => format!("store/{store_id}"),
            DiscountScope::Product { product_id } => format!("product/{product_id}"),
            DiscountScope::Variant { variant_id } => format!("variant/{variant_id}"),
            DiscountScope::Collection { collection_id } => format!("collection/{collection_id}"),
        }
    }
}

/// Which part of the order the discount's action reduces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DiscountTarget {
    Product { product_id: String },
    Variant { variant_id: String },
    Cart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trigger {
    Quantity { start: i64 },
    Price { start: Cents },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
    pub flat: Cents,
    pub percent: Decimal,
}

impl Action {
    /// A non-zero flat amount takes precedence over the percentage.
    pub fn discount_for(&self, price: Cents) -> Cents {
        if self.flat.is_zero() {
            price.mul_rate_floor(self.percent)
        } else {
            self.flat
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub trigger: Trigger,
    #[serde(default)]
    pub action: Action,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Discount {
    pub id: String,
    pub name: String,
    pub scope: DiscountScope,
    pub target: Option<DiscountTarget>,
    pub rules: Vec<DiscountRule>,
    pub enabled: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Discount {
    pub fn valid_for(&self, at: DateTime<Utc>) -> bool {
        self.enabled && in_window(self.start_date, self.end_date, at)
    }
}

//--------------------------------------   Product / Variant   ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub price: Cents,
    pub taxable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub price: Cents,
    pub taxable: bool,
}

//--------------------------------------         Store         ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Listing {
    pub price: Option<Cents>,
    pub available: bool,
}

/// A location filter. Empty fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLocation {
    pub country: String,
    pub state: String,
    pub city: String,
    pub postal_code: String,
}

impl RateLocation {
    /// `None` if the location does not cover `address`, otherwise a specificity score where a postal code match beats
    /// a city match, which beats a state match, which beats a country match.
    fn specificity(&self, address: &Address) -> Option<u8> {
        let fields = [
            (&self.postal_code, &address.postal_code, 8),
            (&self.city, &address.city, 4),
            (&self.state, &address.state, 2),
            (&self.country, &address.country, 1),
        ];
        let mut score = 0;
        for (want, have, weight) in fields {
            if want.is_empty() {
                continue;
            }
            if !want.trim().eq_ignore_ascii_case(have.trim()) {
                return None;
            }
            score += weight;
        }
        Some(score)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingRate {
    pub location: RateLocation,
    pub cost: Cents,
    pub percent: Decimal,
}

impl ShippingRate {
    pub fn shipping_for(&self, subtotal: Cents) -> Cents {
        self.cost + subtotal.mul_rate_floor(self.percent)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxRate {
    pub location: RateLocation,
    pub cost: Cents,
    pub percent: Decimal,
    /// Tax the shipping amount as well as the subtotal.
    pub tax_shipping: bool,
}

impl TaxRate {
    pub fn tax_for(&self, subtotal: Cents, shipping: Cents) -> Cents {
        let base = if self.tax_shipping { subtotal + shipping } else { subtotal };
        self.cost + base.mul_rate_floor(self.percent)
    }
}

fn best_match<'a, T>(rates: &'a [T], address: &Address, location: impl Fn(&T) -> &RateLocation) -> Option<&'a T> {
    rates
        .iter()
        .filter_map(|r| location(r).specificity(address).map(|score| (score, r)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, r)| r)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub currency: Currency,
    /// Per-product or per-variant overrides, keyed by catalogue id.
    pub listings: HashMap<String, Listing>,
    pub shipping_rates: Vec<ShippingRate>,
    pub tax_rates: Vec<TaxRate>,
}

impl Store {
    pub fn match_shipping_rate(&self, address: &Address) -> Option<&ShippingRate> {
        best_match(&self.shipping_rates, address, |r| &r.location)
    }

    pub fn match_tax_rate(&self, address: &Address) -> Option<&TaxRate> {
        best_match(&self.tax_rates, address, |r| &r.location)
    }
}

//--------------------------------------     Organization      ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    pub flat: Cents,
    pub percent: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub card: Pricing,
    pub ethereum: Pricing,
    pub bitcoin: Pricing,
    /// The platform's cut of affiliate commissions.
    pub affiliate: Pricing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Partner {
    pub id: String,
    pub name: String,
    pub fee: Pricing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripeCredentials {
    pub live_secret_key: Secret<String>,
    pub test_secret_key: Secret<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquareCredentials {
    pub access_token: Secret<String>,
    pub location_id: String,
    pub sandbox_access_token: Secret<String>,
    pub sandbox_location_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaypalCredentials {
    pub client_id: String,
    pub secret: Secret<String>,
    pub sandbox_client_id: String,
    pub sandbox_secret: Secret<String>,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizeNetCredentials {
    pub login_id: String,
    pub transaction_key: Secret<String>,
    pub sandbox_login_id: String,
    pub sandbox_transaction_key: Secret<String>,
}

/// A tenant. Organizations are created by the admin surface; the checkout only reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub id: String,
    pub name: String,
    /// Use live gateway accounts. When false, every gateway call goes to the sandbox.
    pub live: bool,
    /// Comma-separated glob patterns. Buyers matching any of them get test-mode checkouts.
    pub email_whitelist: String,
    pub fees: FeeSchedule,
    pub partners: Vec<Partner>,
    pub stripe: StripeCredentials,
    pub square: SquareCredentials,
    pub paypal: PaypalCredentials,
    pub authorize_net: AuthorizeNetCredentials,
}

//--------------------------------------  Referrals / sales    ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Affiliate {
    pub id: String,
    pub name: String,
    pub commission: Pricing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Referrer {
    pub id: String,
    pub user_id: String,
    pub affiliate_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSale {
    pub id: String,
    pub name: String,
    pub currency: Currency,
}

macro_rules! entity {
    ($type:ty, $kind:literal, $id:ident) => {
        impl Entity for $type {
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.$id
            }
        }
    };
}

entity!(Coupon, "coupon", code);
entity!(Product, "product", id);
entity!(Variant, "variant", id);
entity!(Store, "store", id);
entity!(Affiliate, "affiliate", id);
entity!(Referrer, "referrer", id);
entity!(TokenSale, "tokensale", id);
entity!(Organization, "organization", id);

impl Entity for Discount {
    const KIND: &'static str = "discount";

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<String> {
        Some(self.scope.key())
    }
}
