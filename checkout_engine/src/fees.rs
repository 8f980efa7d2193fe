//! Platform, partner and affiliate fees.
//!
//! Fees are computed from the final (post test-override) amount of a payment and persisted alongside it. They record
//! how the charged amount is split; nothing here moves money.
use checkout_common::{Cents, Currency};
use log::*;

use crate::{
    catalog_types::{Affiliate, FeeSchedule, Organization, Pricing, Referrer},
    checkout_api::errors::CheckoutError,
    db_types::{Fee, FeeType, Order, Payment},
    helpers::new_id,
    traits::CheckoutDatabase,
};

/// The platform pricing tier for the currency: ETH and BTC have their own, everything else is a card payment.
pub fn platform_pricing<'a>(fees: &'a FeeSchedule, currency: &Currency) -> &'a Pricing {
    if currency.is_ethereum() {
        &fees.ethereum
    } else if currency.is_bitcoin() {
        &fees.bitcoin
    } else {
        &fees.card
    }
}

/// `flat + ceil(amount * percent)`. Platform and partner fees round in the platform's favour.
pub fn fee_for(pricing: &Pricing, amount: Cents) -> Cents {
    pricing.flat + amount.mul_rate_ceil(pricing.percent)
}

/// `floor(amount * percent) + flat`. Commissions round in the merchant's favour.
pub fn commission_for(pricing: &Pricing, amount: Cents) -> Cents {
    amount.mul_rate_floor(pricing.percent) + pricing.flat
}

pub struct FeeCalculator<'a, B> {
    db: &'a B,
}

impl<'a, B: CheckoutDatabase> FeeCalculator<'a, B> {
    pub fn new(db: &'a B) -> Self {
        Self { db }
    }

    /// Computes the fees for `payment`. Zero fees are omitted.
    pub async fn calculate(
        &self,
        org: &Organization,
        order: &Order,
        payment: &Payment,
    ) -> Result<Vec<Fee>, CheckoutError> {
        let amount = payment.amount;
        let new_fee = |name: &str, fee_type: FeeType, beneficiary_id: Option<String>, fee: Cents| Fee {
            id: new_id("fee"),
            name: name.to_string(),
            fee_type,
            payment_id: payment.id.clone(),
            order_id: order.id.clone(),
            beneficiary_id,
            currency: payment.currency.clone(),
            amount: fee,
            test: payment.test,
        };

        let mut fees = vec![];
        let platform = fee_for(platform_pricing(&org.fees, &payment.currency), amount);
        fees.push(new_fee("Platform fee", FeeType::Platform, None, platform));
        for partner in &org.partners {
            let fee = fee_for(&partner.fee, amount);
            fees.push(new_fee(&format!("{} fee", partner.name), FeeType::Partner, Some(partner.id.clone()), fee));
        }
        if let Some(affiliate) = self.affiliate_for(order).await? {
            let commission = commission_for(&affiliate.commission, amount);
            let cut = fee_for(&org.fees.affiliate, commission);
            fees.push(new_fee(
                &format!("{} commission", affiliate.name),
                FeeType::Affiliate,
                Some(affiliate.id.clone()),
                commission,
            ));
            fees.push(new_fee("Platform affiliate fee", FeeType::Platform, None, cut));
        }
        fees.retain(|f| !f.amount.is_zero());
        trace!("💳️ {} fees for payment {} on order {}", fees.len(), payment.id, order.id);
        Ok(fees)
    }

    async fn affiliate_for(&self, order: &Order) -> Result<Option<Affiliate>, CheckoutError> {
        let Some(referrer_id) = order.referrer_id.as_deref() else {
            return Ok(None);
        };
        let Some(referrer) = self.db.get::<Referrer>(referrer_id).await? else {
            warn!("💳️ Order {} names referrer {referrer_id}, which does not exist", order.id);
            return Ok(None);
        };
        match referrer.affiliate_id.as_deref() {
            Some(id) => Ok(self.db.get::<Affiliate>(id).await?),
            None => Ok(None),
        }
    }
}
