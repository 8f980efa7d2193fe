//! # Order tally
//!
//! The tally turns an order's items, coupons and discount rules into its final monetary fields. It is deterministic
//! and idempotent: every derived field is recomputed from the items and the catalogue on each call, so tallying the
//! same order twice gives the same result.
//!
//! The steps, in order:
//! 1. Resolve the coupon codes ([`CouponResolver`]). An unknown or exhausted coupon aborts the tally.
//! 2. Rebuild the free items that `FreeItem` coupons add ([`update_coupon_items`]).
//! 3. For orders with physical items, refresh each item's price, name, SKU and taxability from its product or variant.
//! 4. If a store is given, apply its listings (availability and price overrides). Without a store the tally runs in
//!    *fallback mode* and trusts the shipping and tax figures the client supplied.
//! 5. Compute the line total.
//! 6. Sum the rule-based discounts ([`DiscountRuleResolver`]) and the coupon discount into `discount`.
//! 7. With a store, match the shipping and tax rate tables against the shipping address. An unmatched rate leaves the
//!    field as it was. A free-shipping coupon then adds the shipping amount to the discount.
//! 8. `total = subtotal + shipping + tax + adjustment`.
//!
//! Contributions and token sales skip steps 3 to 6: their line total is what the buyer chose to pay. Any other order
//! without items tallies to a zero line total. Quantities below one and negative client amounts are rejected up front.
mod coupons;
mod discounts;

use checkout_common::Cents;
pub use coupons::{calc_coupon_discount, dedupe_codes, has_free_shipping, update_coupon_items, CouponResolver};
pub use discounts::{apply_discounts, scope_keys, winning_action, DiscountRuleResolver};
use log::*;

use crate::{
    catalog_types::{Product, Store, Variant},
    checkout_api::errors::{CheckoutError, ErrorKind},
    db_types::{LineItem, Order},
    traits::CheckoutDatabase,
};

pub struct OrderTally<'a, B> {
    db: &'a B,
}

impl<'a, B: CheckoutDatabase> OrderTally<'a, B> {
    pub fn new(db: &'a B) -> Self {
        Self { db }
    }

    pub async fn tally(&self, order: &mut Order, store: Option<&Store>) -> Result<(), CheckoutError> {
        let physical = !order.is_contribution();
        check_client_amounts(order)?;
        let coupons = CouponResolver::new(self.db).resolve(order).await?;
        update_coupon_items(order, &coupons);

        if physical {
            for item in order.items.iter_mut() {
                self.refresh_item(item).await?;
            }
            match store {
                Some(store) => apply_listings(&mut order.items, store)?,
                None => warn!("🧮️ No store for order {}. Tallying in fallback mode with client shipping and tax.", order.id),
            }
            order.line_total = line_sum(&order.items)?;

            let (discounts, rule_discount) =
                DiscountRuleResolver::new(self.db).resolve(order, store.map(|s| s.id.as_str())).await?;
            let coupon_discount = calc_coupon_discount(&coupons, &order.items);
            order.discount = (rule_discount + coupon_discount).min(order.line_total);
            order.discounts = discounts;
        }
        order.subtotal = order.line_total - order.discount;

        if let Some(store) = store {
            if let Some(rate) = store.match_shipping_rate(&order.shipping_address) {
                order.shipping = rate.shipping_for(order.subtotal);
            }
            if let Some(rate) = store.match_tax_rate(&order.shipping_address) {
                let taxable = taxable_subtotal(order);
                order.tax = rate.tax_for(taxable, order.shipping);
            }
        }
        // Tax is charged on the goods before waived shipping comes off as a discount
        if physical && has_free_shipping(&coupons, &order.items) {
            debug!("🧮️ Free shipping on order {}", order.id);
            order.discount = order.discount.checked_add(order.shipping).ok_or_else(too_large)?;
            order.subtotal = order.line_total - order.discount;
        }

        order.total = [order.shipping, order.tax, order.adjustment]
            .into_iter()
            .try_fold(order.subtotal, Cents::checked_add)
            .ok_or_else(too_large)?;
        order.coupons = coupons;
        order.update_balance();
        debug!(
            "🧮️ Order {} tallied. Lines: {}, discount: {}, shipping: {}, tax: {}, total: {}",
            order.id, order.line_total, order.discount, order.shipping, order.tax, order.total
        );
        Ok(())
    }

    /// Copies the catalogue fields onto a line item. Variants take precedence over products.
    async fn refresh_item(&self, item: &mut LineItem) -> Result<(), CheckoutError> {
        if let Some(id) = item.variant_id.as_deref() {
            let variant = self.db.get::<Variant>(id).await?.ok_or_else(|| missing_item("variant", id))?;
            update_item(item, variant.price, variant.name, variant.sku, variant.taxable);
            if item.product_id.is_none() {
                item.product_id = Some(variant.product_id);
            }
        } else if let Some(id) = item.product_id.as_deref() {
            let product = self.db.get::<Product>(id).await?.ok_or_else(|| missing_item("product", id))?;
            update_item(item, product.price, product.name, product.sku, product.taxable);
        } else {
            return Err(CheckoutError::new(
                ErrorKind::MissingItemEntity,
                format!("Line item '{}' does not refer to a product", item.name),
            ));
        }
        Ok(())
    }
}

/// Rejects the figures a client could use to lower its own charge: item quantities below one, and negative
/// contribution amounts, shipping or tax.
fn check_client_amounts(order: &Order) -> Result<(), CheckoutError> {
    if let Some(item) = order.items.iter().find(|i| !i.is_coupon_item() && i.quantity < 1) {
        return Err(CheckoutError::validation(format!(
            "Line item '{}' has quantity {}. Quantities must be at least 1",
            item.item_id().unwrap_or(item.name.as_str()),
            item.quantity
        )));
    }
    if order.is_contribution() && order.line_total.is_negative() {
        return Err(CheckoutError::validation(format!("The order amount cannot be negative ({})", order.line_total)));
    }
    if order.shipping.is_negative() || order.tax.is_negative() {
        return Err(CheckoutError::validation("Shipping and tax cannot be negative"));
    }
    Ok(())
}

fn line_sum(items: &[LineItem]) -> Result<Cents, CheckoutError> {
    items.iter().try_fold(Cents::ZERO, |sum, item| {
        item.checked_total_price()
            .and_then(|price| sum.checked_add(price))
            .ok_or_else(|| CheckoutError::validation(format!("The total for '{}' is too large", item.name)))
    })
}

fn too_large() -> CheckoutError {
    CheckoutError::validation("The order total is too large")
}

fn missing_item(kind: &str, id: &str) -> CheckoutError {
    CheckoutError::new(ErrorKind::MissingItemEntity, format!("The {kind} {id} does not exist"))
}

fn update_item(item: &mut LineItem, price: Cents, name: String, sku: String, taxable: bool) {
    item.price = price;
    if !name.is_empty() {
        item.name = name;
    }
    item.sku = sku;
    item.taxable = taxable;
}

fn apply_listings(items: &mut [LineItem], store: &Store) -> Result<(), CheckoutError> {
    for item in items.iter_mut() {
        let listing = [item.variant_id.as_deref(), item.product_id.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|id| store.listings.get(id));
        let Some(listing) = listing else {
            continue;
        };
        if !listing.available {
            return Err(CheckoutError::new(
                ErrorKind::ItemUnavailable,
                format!("'{}' is not available in {}", item.name, store.name),
            ));
        }
        if let Some(price) = listing.price {
            item.price = price;
        }
    }
    Ok(())
}

/// The part of the subtotal that tax applies to. The whole discount comes off the taxable lines first.
fn taxable_subtotal(order: &Order) -> Cents {
    let taxable_lines: Cents = order.items.iter().filter(|i| i.taxable).map(LineItem::total_price).sum();
    if taxable_lines == order.line_total {
        return order.subtotal;
    }
    let taxable = taxable_lines - order.discount;
    if taxable.is_negative() {
        Cents::ZERO
    } else {
        taxable
    }
}
