use checkout_common::{Cents, Decimal};
use log::*;

use crate::{
    catalog_types::{Coupon, CouponType},
    checkout_api::errors::CheckoutError,
    db_types::{LineItem, Order, ADDED_BY_COUPON},
    traits::CheckoutDatabase,
};

/// Trims the codes, drops empty ones and removes duplicates, keeping the first occurrence of each.
pub fn dedupe_codes(codes: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        if !result.iter().any(|c| c == code) {
            result.push(code.to_string());
        }
    }
    result
}

/// Looks up and validates the coupon codes on an order.
pub struct CouponResolver<'a, B> {
    db: &'a B,
}

impl<'a, B: CheckoutDatabase> CouponResolver<'a, B> {
    pub fn new(db: &'a B) -> Self {
        Self { db }
    }

    /// Fetches every distinct coupon code on the order.
    ///
    /// An unknown code fails with `InvalidCouponCode`, and a coupon that is disabled or has used up its redemptions
    /// fails with `CouponUnredeemable`. Coupons outside their validity window are skipped.
    pub async fn resolve(&self, order: &Order) -> Result<Vec<Coupon>, CheckoutError> {
        let mut coupons = vec![];
        for code in dedupe_codes(&order.coupon_codes) {
            let coupon =
                self.db.get::<Coupon>(&code).await?.ok_or_else(|| CheckoutError::invalid_coupon_code(&code))?;
            if !coupon.valid_for(order.created_at) {
                debug!("🎟️ Coupon {code} is outside its validity window. Skipping it.");
                continue;
            }
            let redemptions = self.db.redemption_count(&code).await?;
            if !coupon.is_redeemable(redemptions) {
                info!("🎟️ Coupon {code} cannot be redeemed ({redemptions} redemptions, limit {})", coupon.limit);
                return Err(CheckoutError::coupon_unredeemable(&code));
            }
            coupons.push(coupon);
        }
        Ok(coupons)
    }
}

fn percent_of(total: Cents, percent: i64) -> Cents {
    total.mul_rate_floor(Decimal::new(percent, 2))
}

fn matching_items<'i>(coupon: &Coupon, items: &'i [LineItem]) -> impl Iterator<Item = &'i LineItem> {
    let scope = coupon.item_id().map(str::to_string);
    items.iter().filter(move |i| !i.is_coupon_item() && scope.as_deref().map_or(true, |id| i.refers_to(id)))
}

/// The discount the coupons give on the items, excluding free shipping (which depends on the shipping amount and is
/// applied by the tally) and free items (which are injected by [`update_coupon_items`]).
pub fn calc_coupon_discount(coupons: &[Coupon], items: &[LineItem]) -> Cents {
    let mut discount = Cents::ZERO;
    for coupon in coupons {
        if coupon.item_id().is_none() {
            discount += match coupon.coupon_type {
                CouponType::Flat => Cents::from(coupon.amount),
                CouponType::Percent => items.iter().map(|i| percent_of(i.total_price(), coupon.amount)).sum(),
                CouponType::FreeShipping | CouponType::FreeItem => Cents::ZERO,
            };
            continue;
        }
        for item in matching_items(coupon, items) {
            discount += match coupon.coupon_type {
                CouponType::Flat if coupon.once => Cents::from(coupon.amount),
                CouponType::Flat => Cents::from(coupon.amount) * item.quantity,
                CouponType::Percent => percent_of(item.total_price(), coupon.amount),
                CouponType::FreeShipping | CouponType::FreeItem => Cents::ZERO,
            };
            if coupon.once {
                break;
            }
        }
    }
    trace!("🎟️ Coupon discount on {} items: {discount}", items.len());
    discount
}

/// True if any coupon waives shipping for this order. Item-scoped free shipping needs a matching item.
pub fn has_free_shipping(coupons: &[Coupon], items: &[LineItem]) -> bool {
    coupons
        .iter()
        .filter(|c| c.coupon_type == CouponType::FreeShipping)
        .any(|c| c.item_id().is_none() || matching_items(c, items).next().is_some())
}

/// Replaces the free items injected by earlier tallies with a fresh set for the current coupons. Calling this
/// repeatedly leaves the items unchanged.
pub fn update_coupon_items(order: &mut Order, coupons: &[Coupon]) {
    order.items.retain(|i| !i.is_coupon_item());
    for coupon in coupons.iter().filter(|c| c.coupon_type == CouponType::FreeItem) {
        if coupon.item_id().is_some() && matching_items(coupon, &order.items).next().is_none() {
            continue;
        }
        if coupon.free_product_id.is_none() && coupon.free_variant_id.is_none() {
            warn!("🎟️ Free item coupon {} does not name an item. Ignoring it.", coupon.code);
            continue;
        }
        debug!("🎟️ Adding free item for coupon {}", coupon.code);
        order.items.push(LineItem {
            product_id: coupon.free_product_id.clone(),
            variant_id: coupon.free_variant_id.clone(),
            name: coupon.name.clone(),
            quantity: coupon.free_quantity.max(1),
            free: true,
            added_by: Some(ADDED_BY_COUPON.to_string()),
            ..Default::default()
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::MemoryDatabase;

    fn item(product: &str, price: i64, quantity: i64) -> LineItem {
        LineItem { product_id: Some(product.into()), price: Cents::from(price), quantity, ..Default::default() }
    }

    fn coupon(code: &str, coupon_type: CouponType, amount: i64) -> Coupon {
        Coupon { code: code.into(), coupon_type, amount, enabled: true, ..Default::default() }
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let codes = ["A", "A", "B", " ", "B ", "C"].map(String::from);
        assert_eq!(dedupe_codes(&codes), vec!["A", "B", "C"]);
    }

    #[test]
    fn order_wide_coupons() {
        let items = vec![item("p1", 1_999, 1), item("p2", 501, 2)];
        assert_eq!(calc_coupon_discount(&[coupon("F", CouponType::Flat, 500)], &items), Cents::from(500));
        // floor(1999 * 0.1) + floor(1002 * 0.1) = 199 + 100
        assert_eq!(calc_coupon_discount(&[coupon("P", CouponType::Percent, 10)], &items), Cents::from(299));
        assert_eq!(calc_coupon_discount(&[coupon("S", CouponType::FreeShipping, 0)], &items), Cents::ZERO);
    }

    #[test]
    fn item_scoped_coupons() {
        let items = vec![item("p1", 1_000, 3), item("p2", 500, 1), item("p1", 1_000, 2)];
        let mut c = Coupon { product_id: Some("p1".into()), ..coupon("F", CouponType::Flat, 100) };
        assert_eq!(calc_coupon_discount(&[c.clone()], &items), Cents::from(500));
        c.once = true;
        assert_eq!(calc_coupon_discount(&[c], &items), Cents::from(100));
        let p = Coupon { product_id: Some("p2".into()), ..coupon("P", CouponType::Percent, 25) };
        assert_eq!(calc_coupon_discount(&[p], &items), Cents::from(125));
        let none = Coupon { product_id: Some("p9".into()), ..coupon("N", CouponType::Flat, 100) };
        assert_eq!(calc_coupon_discount(&[none], &items), Cents::ZERO);
    }

    #[test]
    fn free_items_are_idempotent() {
        let mut order = Order { items: vec![item("p1", 1_000, 1)], ..Default::default() };
        let c = Coupon {
            free_product_id: Some("gift".into()),
            free_quantity: 2,
            product_id: Some("p1".into()),
            ..coupon("GIFT", CouponType::FreeItem, 0)
        };
        update_coupon_items(&mut order, &[c.clone()]);
        update_coupon_items(&mut order, &[c.clone()]);
        assert_eq!(order.items.len(), 2);
        assert!(order.items[1].free);
        assert_eq!(order.items[1].quantity, 2);
        assert!(order.items[1].is_coupon_item());
        // Coupon removed, free item goes too
        update_coupon_items(&mut order, &[]);
        assert_eq!(order.items.len(), 1);
        // Scoped to an item that isn't in the cart
        let c = Coupon { product_id: Some("p9".into()), ..c };
        update_coupon_items(&mut order, &[c]);
        assert_eq!(order.items.len(), 1);
    }

    #[tokio::test]
    async fn resolve_validates_codes() {
        let db = MemoryDatabase::new();
        db.put(&coupon("SAVE5", CouponType::Flat, 500)).await.unwrap();
        db.put(&Coupon { limit: 1, ..coupon("ONCE", CouponType::Flat, 100) }).await.unwrap();
        db.append_redemption("ONCE", "o0").await.unwrap();
        let resolver = CouponResolver::new(&db);

        let order = Order { coupon_codes: vec!["SAVE5".into(), "SAVE5".into()], ..Default::default() };
        let coupons = resolver.resolve(&order).await.unwrap();
        assert_eq!(coupons.len(), 1);

        let order = Order { coupon_codes: vec!["MISSING".into()], ..Default::default() };
        let err = resolver.resolve(&order).await.unwrap_err();
        assert_eq!(err.kind(), crate::checkout_api::errors::ErrorKind::InvalidCouponCode);

        let order = Order { coupon_codes: vec!["ONCE".into()], ..Default::default() };
        let err = resolver.resolve(&order).await.unwrap_err();
        assert_eq!(err.kind(), crate::checkout_api::errors::ErrorKind::CouponUnredeemable);
        assert!(err.message.contains("ONCE"));
    }
}
