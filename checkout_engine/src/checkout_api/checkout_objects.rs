use checkout_common::{Cents, Currency};
use serde::{Deserialize, Serialize};

use crate::db_types::{Account, Address, LineItem, Order, Payment, PaymentType, User};

/// The body of an authorize or charge call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationRequest {
    pub user: User,
    pub order: OrderRequest,
    pub payment: PaymentRequest,
}

/// Client-supplied order fields. Only the fields that are present overwrite the order; everything the tally derives
/// (line totals, discounts, and in non-fallback mode shipping and tax) is recomputed regardless.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderRequest {
    pub store_id: Option<String>,
    #[serde(rename = "type")]
    pub payment_type: Option<PaymentType>,
    pub currency: Option<Currency>,
    pub items: Option<Vec<LineItem>>,
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
    pub line_total: Option<Cents>,
    pub shipping: Option<Cents>,
    pub tax: Option<Cents>,
    pub coupon_codes: Option<Vec<String>>,
    pub contribution: Option<bool>,
    pub token_sale_id: Option<String>,
    pub referrer_id: Option<String>,
    pub cart_id: Option<String>,
    pub description: Option<String>,
}

impl OrderRequest {
    pub fn apply_to(self, order: &mut Order) {
        fn set<T>(target: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *target = v;
            }
        }
        set(&mut order.payment_type, self.payment_type);
        set(&mut order.currency, self.currency);
        set(&mut order.items, self.items);
        set(&mut order.billing_address, self.billing_address);
        set(&mut order.shipping_address, self.shipping_address);
        set(&mut order.line_total, self.line_total);
        set(&mut order.shipping, self.shipping);
        set(&mut order.tax, self.tax);
        set(&mut order.coupon_codes, self.coupon_codes);
        set(&mut order.contribution, self.contribution);
        set(&mut order.description, self.description);
        if self.store_id.is_some() {
            order.store_id = self.store_id;
        }
        if self.token_sale_id.is_some() {
            order.token_sale_id = self.token_sale_id;
        }
        if self.referrer_id.is_some() {
            order.referrer_id = self.referrer_id;
        }
        if self.cart_id.is_some() {
            order.cart_id = self.cart_id;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentRequest {
    /// Overrides the order's payment type.
    #[serde(rename = "type")]
    pub payment_type: Option<PaymentType>,
    pub account: Account,
    pub description: Option<String>,
    pub client_ip: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RefundRequest {
    pub amount: Cents,
}

/// The order and its payments after a checkout operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order: Order,
    pub payments: Vec<Payment>,
}

impl CheckoutResult {
    pub fn new(order: Order, payments: Vec<Payment>) -> Self {
        Self { order, payments }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_present_fields_are_applied() {
        let json = r#"{
            "user": {"email": "Buyer@Example.com "},
            "order": {"type": "balance", "items": [{"product_id": "tee", "quantity": 2}], "coupon_codes": ["A", "A"]},
            "payment": {"account": {"number": "4242 4242 4242 4242", "cvc": "123"}}
        }"#;
        let req: AuthorizationRequest = serde_json::from_str(json).unwrap();
        let mut order = Order { description: "keep me".into(), shipping: Cents::from(300), ..Default::default() };
        req.order.apply_to(&mut order);
        assert_eq!(order.payment_type, PaymentType::Balance);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.coupon_codes, vec!["A", "A"]);
        assert_eq!(order.description, "keep me");
        assert_eq!(order.shipping, Cents::from(300));
        assert_eq!(req.payment.account.number, "4242 4242 4242 4242");
        assert!(req.payment.payment_type.is_none());
    }
}
