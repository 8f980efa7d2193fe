use checkout_common::Cents;
use futures_util::future::try_join_all;
use log::*;

use crate::{
    catalog_types::{Action, Discount, DiscountScope, DiscountTarget, Trigger},
    checkout_api::errors::CheckoutError,
    db_types::{LineItem, Order},
    traits::CheckoutDatabase,
};

/// The keys discounts are stored under for this order: the organization, the store (if any), and every distinct
/// product and variant on the order.
pub fn scope_keys(order: &Order, store_id: Option<&str>) -> Vec<String> {
    let mut keys = vec![DiscountScope::Organization.key()];
    if let Some(store_id) = store_id {
        keys.push(DiscountScope::Store { store_id: store_id.to_string() }.key());
    }
    for item in &order.items {
        let item_keys = [
            item.product_id.clone().map(|product_id| DiscountScope::Product { product_id }.key()),
            item.variant_id.clone().map(|variant_id| DiscountScope::Variant { variant_id }.key()),
        ];
        for key in item_keys.into_iter().flatten() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

fn paid_items(items: &[LineItem]) -> impl Iterator<Item = &LineItem> {
    items.iter().filter(|i| !i.free)
}

/// Quantity and price of the items matching `pred`.
fn measure<F: Fn(&LineItem) -> bool>(items: &[LineItem], pred: F) -> (i64, Cents) {
    paid_items(items)
        .filter(|i| pred(i))
        .fold((0, Cents::ZERO), |(q, p), i| (q.saturating_add(i.quantity), p + i.total_price()))
}

/// Picks the rule whose threshold is the highest one still exceeded. Quantity and price triggers are evaluated
/// separately; a quantity win takes precedence.
pub fn winning_action(discount: &Discount, quantity: i64, price: Cents) -> Option<&Action> {
    let by_quantity = discount
        .rules
        .iter()
        .filter_map(|r| match r.trigger {
            Trigger::Quantity { start } if quantity > start => Some((start, &r.action)),
            _ => None,
        })
        .max_by_key(|(start, _)| *start);
    let by_price = discount
        .rules
        .iter()
        .filter_map(|r| match r.trigger {
            Trigger::Price { start } if price > start => Some((start, &r.action)),
            _ => None,
        })
        .max_by_key(|(start, _)| *start);
    by_quantity.map(|(_, a)| a).or(by_price.map(|(_, a)| a))
}

/// Resolves rule-based discounts for an order.
pub struct DiscountRuleResolver<'a, B> {
    db: &'a B,
}

impl<'a, B: CheckoutDatabase> DiscountRuleResolver<'a, B> {
    pub fn new(db: &'a B) -> Self {
        Self { db }
    }

    /// Fetches the candidate discounts for every scope concurrently. The first fetch error aborts the whole lookup.
    pub async fn candidates(&self, order: &Order, store_id: Option<&str>) -> Result<Vec<Discount>, CheckoutError> {
        let keys = scope_keys(order, store_id);
        trace!("🏷️ Fetching discounts for {} scopes", keys.len());
        let fetched = try_join_all(keys.iter().map(|k| self.db.children::<Discount>(k))).await?;
        let mut result: Vec<Discount> = vec![];
        for discount in fetched.into_iter().flatten() {
            if discount.valid_for(order.created_at) && !result.iter().any(|d| d.id == discount.id) {
                result.push(discount);
            }
        }
        Ok(result)
    }

    /// Returns the discounts that applied, and their combined amount.
    pub async fn resolve(&self, order: &Order, store_id: Option<&str>) -> Result<(Vec<Discount>, Cents), CheckoutError> {
        let candidates = self.candidates(order, store_id).await?;
        let (applied, total) = apply_discounts(candidates, &order.items);
        debug!("🏷️ {} discount(s) applied to order {}, worth {total}", applied.len(), order.id);
        Ok((applied, total))
    }
}

/// Evaluates each discount's rules against the items and sums the winning actions.
pub fn apply_discounts(candidates: Vec<Discount>, items: &[LineItem]) -> (Vec<Discount>, Cents) {
    let cart = measure(items, |_| true);
    let mut applied = vec![];
    let mut total = Cents::ZERO;
    for discount in candidates {
        let (quantity, price) = match &discount.scope {
            DiscountScope::Organization | DiscountScope::Store { .. } => cart,
            DiscountScope::Product { product_id } => measure(items, |i| i.product_id.as_ref() == Some(product_id)),
            DiscountScope::Variant { variant_id } => measure(items, |i| i.variant_id.as_ref() == Some(variant_id)),
            DiscountScope::Collection { collection_id } => {
                debug!("🏷️ Collection discounts are not supported. Ignoring {} on {collection_id}", discount.id);
                continue;
            },
        };
        let Some(action) = winning_action(&discount, quantity, price) else {
            continue;
        };
        let target_price = match &discount.target {
            None => price,
            Some(DiscountTarget::Cart) => cart.1,
            Some(DiscountTarget::Product { product_id }) => {
                measure(items, |i| i.product_id.as_ref() == Some(product_id)).1
            },
            Some(DiscountTarget::Variant { variant_id }) => {
                measure(items, |i| i.variant_id.as_ref() == Some(variant_id)).1
            },
        };
        let amount = action.discount_for(target_price).min(target_price);
        if amount.is_zero() {
            continue;
        }
        trace!("🏷️ Discount {} gives {amount}", discount.id);
        total += amount;
        applied.push(discount);
    }
    (applied, total)
}

#[cfg(test)]
mod test {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{catalog_types::DiscountRule, checkout_api::errors::ErrorKind, memory::MemoryDatabase};

    fn item(product: &str, variant: Option<&str>, price: i64, quantity: i64) -> LineItem {
        LineItem {
            product_id: Some(product.into()),
            variant_id: variant.map(String::from),
            price: Cents::from(price),
            quantity,
            ..Default::default()
        }
    }

    fn rule(trigger: Trigger, flat: i64, percent: rust_decimal::Decimal) -> DiscountRule {
        DiscountRule { trigger, action: Action { flat: Cents::from(flat), percent } }
    }

    fn discount(id: &str, scope: DiscountScope, rules: Vec<DiscountRule>) -> Discount {
        Discount { id: id.into(), scope, rules, enabled: true, ..Default::default() }
    }

    #[test]
    fn scope_keys_are_distinct() {
        let order = Order {
            items: vec![item("p1", Some("v1"), 100, 1), item("p1", Some("v2"), 100, 1), item("p2", None, 1, 1)],
            ..Default::default()
        };
        let keys = scope_keys(&order, Some("s1"));
        assert_eq!(keys, vec!["organization", "store/s1", "product/p1", "variant/v1", "variant/v2", "product/p2"]);
        assert_eq!(scope_keys(&Order::default(), None), vec!["organization"]);
    }

    #[test]
    fn highest_satisfied_threshold_wins() {
        let d = discount("d", DiscountScope::Organization, vec![
            rule(Trigger::Quantity { start: 1 }, 100, dec!(0)),
            rule(Trigger::Quantity { start: 5 }, 500, dec!(0)),
            rule(Trigger::Quantity { start: 3 }, 300, dec!(0)),
            rule(Trigger::Price { start: Cents::from(1_000) }, 50, dec!(0)),
        ]);
        assert_eq!(winning_action(&d, 4, Cents::ZERO).map(|a| a.flat), Some(Cents::from(300)));
        // Strictly greater than
        assert_eq!(winning_action(&d, 5, Cents::ZERO).map(|a| a.flat), Some(Cents::from(300)));
        assert_eq!(winning_action(&d, 6, Cents::ZERO).map(|a| a.flat), Some(Cents::from(500)));
        // Quantity beats price
        assert_eq!(winning_action(&d, 2, Cents::from(5_000)).map(|a| a.flat), Some(Cents::from(100)));
        assert_eq!(winning_action(&d, 1, Cents::from(5_000)).map(|a| a.flat), Some(Cents::from(50)));
        assert!(winning_action(&d, 1, Cents::from(1_000)).is_none());
    }

    #[test]
    fn targets_can_differ_from_scope() {
        let items = vec![item("p1", None, 1_000, 2), item("p2", None, 3_000, 1)];
        // Buying more than one p1 takes 10% off the whole cart
        let mut d = discount("d1", DiscountScope::Product { product_id: "p1".into() }, vec![rule(
            Trigger::Quantity { start: 1 },
            0,
            dec!(0.1),
        )]);
        d.target = Some(DiscountTarget::Cart);
        let (applied, total) = apply_discounts(vec![d.clone()], &items);
        assert_eq!(applied.len(), 1);
        assert_eq!(total, Cents::from(500));
        // Without a target, only the p1 lines are discounted
        d.target = None;
        assert_eq!(apply_discounts(vec![d], &items).1, Cents::from(200));
        // Collection discounts do nothing
        let c = discount("c", DiscountScope::Collection { collection_id: "x".into() }, vec![rule(
            Trigger::Quantity { start: 0 },
            100,
            dec!(0),
        )]);
        assert_eq!(apply_discounts(vec![c], &items).1, Cents::ZERO);
    }

    #[tokio::test]
    async fn resolve_fetches_all_scopes() {
        let _ = env_logger::try_init();
        let db = MemoryDatabase::new();
        let org = discount("org10", DiscountScope::Organization, vec![rule(
            Trigger::Price { start: Cents::ZERO },
            0,
            dec!(0.1),
        )]);
        let var = discount("v1off", DiscountScope::Variant { variant_id: "v1".into() }, vec![rule(
            Trigger::Quantity { start: 0 },
            150,
            dec!(0),
        )]);
        let disabled = Discount { enabled: false, ..discount("off", DiscountScope::Organization, org.rules.clone()) };
        let other_store = discount("s2", DiscountScope::Store { store_id: "s2".into() }, org.rules.clone());
        for d in [&org, &var, &disabled, &other_store] {
            db.put(d).await.unwrap();
        }
        let order = Order {
            id: "o1".into(),
            items: vec![item("p1", Some("v1"), 1_000, 1), item("p2", None, 2_000, 1)],
            ..Default::default()
        };
        let resolver = DiscountRuleResolver::new(&db);
        let (applied, total) = resolver.resolve(&order, Some("s1")).await.unwrap();
        let ids = applied.iter().map(|d| d.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["org10", "v1off"]);
        assert_eq!(total, Cents::from(300 + 150));
    }

    #[tokio::test]
    async fn a_failed_scope_fetch_aborts_the_lookup() {
        let mut db = MemoryDatabase::new();
        db.put(&discount("org10", DiscountScope::Organization, vec![rule(
            Trigger::Price { start: Cents::ZERO },
            0,
            dec!(0.1),
        )]))
        .await
        .unwrap();
        db.close().await.unwrap();
        let order = Order { id: "o1".into(), items: vec![item("p1", None, 1_000, 1)], ..Default::default() };
        let err = DiscountRuleResolver::new(&db).resolve(&order, Some("s1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
