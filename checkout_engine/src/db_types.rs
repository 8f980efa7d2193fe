//! The checkout aggregate: orders, payments, fees and the users that own them.
//!
//! All of these are persisted as documents through [`crate::traits::CheckoutDatabase`]; see the [`Entity`] impls at the
//! bottom of the module for the kind names and parent keys.
use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use checkout_common::{Cents, Currency};
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog_types::{Coupon, Discount},
    traits::Entity,
};

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------     OrderStatus       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The order is being built or is awaiting payment.
    #[default]
    Open,
    /// The order has been fulfilled.
    Completed,
    /// The order may no longer be modified.
    Locked,
    /// The order is held for manual review.
    #[serde(rename = "on-hold")]
    OnHold,
    /// The order was cancelled, by a failed authorization, a full refund or an explicit cancel.
    Cancelled,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Locked => write!(f, "locked"),
            OrderStatus::OnHold => write!(f, "on-hold"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "completed" => Ok(Self::Completed),
            "locked" => Ok(Self::Locked),
            "on-hold" | "onhold" => Ok(Self::OnHold),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
/// Shared by orders (`payment_status`) and individual payments (`status`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
    Disputed,
    Failed,
    Fraudulent,
    Cancelled,
    Credit,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Disputed => "disputed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Fraudulent => "fraudulent",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Credit => "credit",
        };
        f.write_str(s)
    }
}

//--------------------------------------     PaymentType       ---------------------------------------------------------
/// The gateway tag carried by orders and payments. Unrecognised tags deserialize to `Unknown` and are routed to the
/// registry's default processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Balance,
    Null,
    Ethereum,
    Paypal,
    #[default]
    Stripe,
    Square,
    #[serde(rename = "authorizenet")]
    AuthorizeNet,
    #[serde(other)]
    Unknown,
}

impl Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentType::Balance => "balance",
            PaymentType::Null => "null",
            PaymentType::Ethereum => "ethereum",
            PaymentType::Paypal => "paypal",
            PaymentType::Stripe => "stripe",
            PaymentType::Square => "square",
            PaymentType::AuthorizeNet => "authorizenet",
            PaymentType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl From<String> for PaymentType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "balance" => Self::Balance,
            "null" => Self::Null,
            "ethereum" => Self::Ethereum,
            "paypal" => Self::Paypal,
            "stripe" => Self::Stripe,
            "square" => Self::Square,
            "authorizenet" => Self::AuthorizeNet,
            other => {
                error!("Unrecognised payment type: {other}");
                Self::Unknown
            },
        }
    }
}

//--------------------------------------       Address         ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.line1.is_empty() && self.city.is_empty() && self.postal_code.is_empty() && self.country.is_empty()
    }

    /// Country codes are always stored upper case.
    pub fn normalize(&mut self) {
        self.country = self.country.trim().to_ascii_uppercase();
        self.state = self.state.trim().to_string();
        self.postal_code = self.postal_code.trim().to_string();
    }
}

//--------------------------------------        Buyer          ---------------------------------------------------------
/// An immutable snapshot of who paid, taken at authorization time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Buyer {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub phone: String,
    pub billing_address: Address,
    pub shipping_address: Address,
}

//--------------------------------------       LineItem        ---------------------------------------------------------
pub const ADDED_BY_COUPON: &str = "coupon";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub name: String,
    pub sku: String,
    pub price: Cents,
    pub quantity: i64,
    pub taxable: bool,
    /// Free items keep their catalogue price for display, but contribute nothing to the line total.
    pub free: bool,
    pub added_by: Option<String>,
}

impl LineItem {
    pub fn total_price(&self) -> Cents {
        if self.free {
            Cents::ZERO
        } else {
            self.price * self.quantity
        }
    }

    /// Like [`LineItem::total_price`], but `None` if the amount does not fit in [`Cents`].
    pub fn checked_total_price(&self) -> Option<Cents> {
        if self.free {
            Some(Cents::ZERO)
        } else {
            self.price.checked_mul(self.quantity)
        }
    }

    /// The most specific catalogue id for this item: the variant if there is one, otherwise the product.
    pub fn item_id(&self) -> Option<&str> {
        self.variant_id.as_deref().or(self.product_id.as_deref())
    }

    /// True if either the product or the variant id matches `id`.
    pub fn refers_to(&self, id: &str) -> bool {
        self.product_id.as_deref() == Some(id) || self.variant_id.as_deref() == Some(id)
    }

    pub fn is_coupon_item(&self) -> bool {
        self.added_by.as_deref() == Some(ADDED_BY_COUPON)
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub id: String,
    pub number: i64,
    pub user_id: String,
    pub store_id: Option<String>,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub currency: Currency,
    pub items: Vec<LineItem>,
    pub billing_address: Address,
    pub shipping_address: Address,
    pub line_total: Cents,
    pub discount: Cents,
    pub subtotal: Cents,
    pub shipping: Cents,
    pub tax: Cents,
    pub adjustment: Cents,
    pub total: Cents,
    pub paid: Cents,
    pub refunded: Cents,
    pub balance: Cents,
    pub coupon_codes: Vec<String>,
    pub coupons: Vec<Coupon>,
    pub discounts: Vec<Discount>,
    pub payment_ids: Vec<String>,
    /// Contributions and token sales carry no physical items. Their amount is the client-supplied line total.
    pub contribution: bool,
    pub token_sale_id: Option<String>,
    pub wallet_id: Option<String>,
    pub referrer_id: Option<String>,
    pub cart_id: Option<String>,
    pub description: String,
    pub test: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Default for Order {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: String::default(),
            number: 0,
            user_id: String::default(),
            store_id: None,
            payment_type: PaymentType::default(),
            status: OrderStatus::default(),
            payment_status: PaymentStatus::default(),
            currency: Currency::default(),
            items: vec![],
            billing_address: Address::default(),
            shipping_address: Address::default(),
            line_total: Cents::ZERO,
            discount: Cents::ZERO,
            subtotal: Cents::ZERO,
            shipping: Cents::ZERO,
            tax: Cents::ZERO,
            adjustment: Cents::ZERO,
            total: Cents::ZERO,
            paid: Cents::ZERO,
            refunded: Cents::ZERO,
            balance: Cents::ZERO,
            coupon_codes: vec![],
            coupons: vec![],
            discounts: vec![],
            payment_ids: vec![],
            contribution: false,
            token_sale_id: None,
            wallet_id: None,
            referrer_id: None,
            cart_id: None,
            description: String::default(),
            test: false,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        }
    }
}

impl Order {
    /// Contributions and token sales have nothing to ship, fetch or discount. Their line total is what the buyer
    /// chose to pay.
    pub fn is_contribution(&self) -> bool {
        self.contribution || self.token_sale_id.is_some()
    }

    /// Recomputes `balance` from `total` and `paid`. Never negative.
    pub fn update_balance(&mut self) {
        let balance = self.total - self.paid;
        self.balance = if balance.is_negative() { Cents::ZERO } else { balance };
    }

    pub fn cancel(&mut self) {
        self.status = OrderStatus::Cancelled;
        self.cancelled_at = Some(Utc::now());
    }

    pub fn normalize_addresses(&mut self) {
        self.billing_address.normalize();
        self.shipping_address.normalize();
    }
}

//--------------------------------------        Account        ---------------------------------------------------------
/// Gateway-specific payment account data. Only the fields relevant to the payment's gateway are populated.
///
/// The raw card number and CVC are accepted from requests but never serialized, so they can't reach storage or logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    /// Client-side token (Stripe), nonce (Square) or source id supplied by the browser.
    pub token: Option<String>,
    #[serde(skip_serializing)]
    pub number: String,
    #[serde(skip_serializing)]
    pub cvc: String,
    pub month: u32,
    pub year: u32,
    pub last_four: String,
    pub brand: String,
    pub customer_id: Option<String>,
    pub card_id: Option<String>,
    pub charge_id: Option<String>,
    pub balance_transaction_id: Option<String>,
    pub payment_id: Option<String>,
    pub capture_id: Option<String>,
    pub transaction_id: Option<String>,
    pub auth_code: Option<String>,
    pub pay_key: Option<String>,
    pub approval_url: Option<String>,
    pub idempotency_key: Option<String>,
    pub wallet_id: Option<String>,
    pub address: Option<String>,
    pub error: Option<String>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("last_four", &self.last_four)
            .field("brand", &self.brand)
            .field("customer_id", &self.customer_id)
            .field("charge_id", &self.charge_id)
            .field("payment_id", &self.payment_id)
            .field("transaction_id", &self.transaction_id)
            .field("pay_key", &self.pay_key)
            .field("wallet_id", &self.wallet_id)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl Account {
    /// Strips whitespace from the card number and records its last four digits.
    pub fn normalize(&mut self) {
        self.number.retain(|c| !c.is_whitespace() && c != '-');
        let digits = self.number.chars().rev().take(4).collect::<Vec<_>>();
        if digits.len() == 4 {
            self.last_four = digits.into_iter().rev().collect();
        }
        self.cvc = self.cvc.trim().to_string();
    }
}

//--------------------------------------        Payment        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    /// Monotonic. Once a payment is captured it is never acted on by a capture again.
    pub captured: bool,
    pub live: bool,
    pub test: bool,
    pub amount: Cents,
    pub amount_refunded: Cents,
    pub fee: Cents,
    pub fee_ids: Vec<String>,
    pub currency: Currency,
    pub description: String,
    pub account: Account,
    pub buyer: Buyer,
    pub client_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Payment {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: String::default(),
            order_id: String::default(),
            user_id: String::default(),
            payment_type: PaymentType::default(),
            status: PaymentStatus::default(),
            captured: false,
            live: false,
            test: false,
            amount: Cents::ZERO,
            amount_refunded: Cents::ZERO,
            fee: Cents::ZERO,
            fee_ids: vec![],
            currency: Currency::default(),
            description: String::default(),
            account: Account::default(),
            buyer: Buyer::default(),
            client_ip: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Payment {
    /// How much of this payment can still be handed back to the buyer.
    pub fn refundable(&self) -> Cents {
        if self.captured && self.status != PaymentStatus::Cancelled {
            self.amount - self.amount_refunded
        } else {
            Cents::ZERO
        }
    }

    pub fn mark_captured(&mut self) {
        self.captured = true;
        self.status = PaymentStatus::Paid;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, reason: &str) {
        self.status = PaymentStatus::Failed;
        self.account.error = Some(reason.to_string());
        self.updated_at = Utc::now();
    }
}

//--------------------------------------          Fee          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeType {
    #[default]
    Platform,
    Partner,
    Affiliate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fee {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub fee_type: FeeType,
    pub payment_id: String,
    pub order_id: String,
    /// The partner or affiliate that receives this fee. Empty for platform fees.
    pub beneficiary_id: Option<String>,
    pub currency: Currency,
    pub amount: Cents,
    pub test: bool,
}

//--------------------------------------         User          ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub phone: String,
    pub billing_address: Address,
    pub shipping_address: Address,
    pub stripe_customer_id: Option<String>,
    /// Cached per-currency balance of the user's internal ledger account.
    pub balances: BTreeMap<Currency, Cents>,
    pub wallet_ids: Vec<String>,
}

impl User {
    /// Lower-cases and trims the email address and username.
    pub fn normalize(&mut self) {
        self.email = self.email.trim().to_ascii_lowercase();
        self.username = self.username.trim().to_ascii_lowercase();
    }

    pub fn buyer(&self) -> Buyer {
        Buyer {
            user_id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            company: self.company.clone(),
            phone: self.phone.clone(),
            billing_address: self.billing_address.clone(),
            shipping_address: self.shipping_address.clone(),
        }
    }

    pub fn balance_for(&self, currency: &Currency) -> Cents {
        self.balances.get(currency).copied().unwrap_or_default()
    }

    /// Fills every field that is unset on `self` from `stored`. Fields present on `self` win.
    pub fn copy_forward(&mut self, stored: &User) {
        fn fill(target: &mut String, source: &str) {
            if target.trim().is_empty() {
                *target = source.to_string();
            }
        }
        fill(&mut self.id, &stored.id);
        fill(&mut self.email, &stored.email);
        fill(&mut self.username, &stored.username);
        fill(&mut self.first_name, &stored.first_name);
        fill(&mut self.last_name, &stored.last_name);
        fill(&mut self.company, &stored.company);
        fill(&mut self.phone, &stored.phone);
        if self.billing_address.is_empty() {
            self.billing_address = stored.billing_address.clone();
        }
        if self.shipping_address.is_empty() {
            self.shipping_address = stored.shipping_address.clone();
        }
        if self.stripe_customer_id.is_none() {
            self.stripe_customer_id = stored.stripe_customer_id.clone();
        }
        // Balances are owned by the ledger; the stored copy is authoritative.
        self.balances = stored.balances.clone();
        for id in &stored.wallet_ids {
            if !self.wallet_ids.contains(id) {
                self.wallet_ids.push(id.clone());
            }
        }
    }

    /// The parent key that indexes users by email address.
    pub fn email_key(email: &str) -> String {
        format!("email/{}", email.trim().to_ascii_lowercase())
    }
}

//--------------------------------------    Entity impls       ---------------------------------------------------------
impl Entity for Order {
    const KIND: &'static str = "order";

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<String> {
        (!self.user_id.is_empty()).then(|| self.user_id.clone())
    }
}

impl Entity for Payment {
    const KIND: &'static str = "payment";

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<String> {
        Some(self.order_id.clone())
    }
}

impl Entity for Fee {
    const KIND: &'static str = "fee";

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<String> {
        Some(self.payment_id.clone())
    }
}

impl Entity for User {
    const KIND: &'static str = "user";

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<String> {
        (!self.email.is_empty()).then(|| User::email_key(&self.email))
    }
}
