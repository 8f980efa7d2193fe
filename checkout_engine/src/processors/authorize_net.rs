use async_trait::async_trait;
use checkout_common::Cents;
use gateway_tools::{AuthorizeNetApi, AuthorizeNetCard, AuthorizeNetConfig, GatewayEndpoints};
use log::*;

use super::{gateway_err, required, PaymentProcessor};
use crate::{
    catalog_types::Organization,
    checkout_api::errors::CheckoutError,
    db_types::{Order, Payment, PaymentType, User},
};

const AUTHORIZE_NET: &str = "Authorize.Net";

/// Card payments through Authorize.Net: auth-only on authorize, prior-auth capture on capture.
pub struct AuthorizeNetProcessor {
    endpoints: GatewayEndpoints,
}

impl AuthorizeNetProcessor {
    pub fn new(endpoints: GatewayEndpoints) -> Self {
        Self { endpoints }
    }

    fn api(&self, org: &Organization) -> Result<AuthorizeNetApi, CheckoutError> {
        let creds = &org.authorize_net;
        let (login_id, transaction_key) = if org.live {
            (creds.login_id.clone(), creds.transaction_key.clone())
        } else {
            (creds.sandbox_login_id.clone(), creds.sandbox_transaction_key.clone())
        };
        if login_id.is_empty() || transaction_key.is_empty() {
            return Err(CheckoutError::validation(format!("Authorize.Net is not configured for {}", org.name)));
        }
        let url = self.endpoints.authorize_net_for(org.live).to_string();
        AuthorizeNetApi::new(AuthorizeNetConfig { url, login_id, transaction_key }).map_err(gateway_err(AUTHORIZE_NET))
    }
}

fn card_for(payment: &Payment) -> Result<AuthorizeNetCard, CheckoutError> {
    let account = &payment.account;
    if account.number.is_empty() {
        return Err(CheckoutError::validation("A card number is required"));
    }
    if !(1..=12).contains(&account.month) || account.year < 2000 {
        return Err(CheckoutError::validation("A valid card expiry date is required"));
    }
    Ok(AuthorizeNetCard {
        number: account.number.clone(),
        expiration_date: format!("{:04}-{:02}", account.year, account.month),
        code: account.cvc.clone(),
    })
}

#[async_trait]
impl PaymentProcessor for AuthorizeNetProcessor {
    fn payment_type(&self) -> PaymentType {
        PaymentType::AuthorizeNet
    }

    async fn authorize(
        &self,
        org: &Organization,
        order: &mut Order,
        _user: &mut User,
        payment: &mut Payment,
    ) -> Result<(), CheckoutError> {
        let api = self.api(org)?;
        let card = card_for(payment)?;
        let invoice = order.number.to_string();
        let response = api.authorize(payment.amount, &card, &invoice).await.map_err(gateway_err(AUTHORIZE_NET))?;
        info!("💳️ Authorize.Net transaction {} authorized for order {}", response.trans_id, order.id);
        let digits = response.account_number.trim_start_matches('X');
        if !digits.is_empty() {
            payment.account.last_four = digits.to_string();
        }
        payment.account.brand = response.account_type;
        payment.account.transaction_id = Some(response.trans_id);
        payment.account.auth_code = Some(response.auth_code);
        payment.live = org.live;
        Ok(())
    }

    async fn capture_payment(&self, org: &Organization, _order: &Order, payment: &mut Payment) -> Result<(), CheckoutError> {
        let trans_id = required(&payment.account.transaction_id, "An Authorize.Net transaction id")?;
        self.api(org)?.capture(trans_id, payment.amount).await.map_err(|e| {
            if e.is_decline() {
                CheckoutError::failed_to_capture(&e.to_string())
            } else {
                CheckoutError::gateway(AUTHORIZE_NET, e)
            }
        })?;
        Ok(())
    }

    async fn refund_payment(
        &self,
        org: &Organization,
        _order: &Order,
        payment: &mut Payment,
        amount: Cents,
    ) -> Result<(), CheckoutError> {
        let trans_id = required(&payment.account.transaction_id, "An Authorize.Net transaction id")?;
        let response = self
            .api(org)?
            .refund(trans_id, amount, &payment.account.last_four)
            .await
            .map_err(gateway_err(AUTHORIZE_NET))?;
        debug!("💳️ Authorize.Net refund transaction {}", response.trans_id);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn card_expiry_format() {
        let mut payment = Payment::default();
        assert!(card_for(&payment).is_err());
        payment.account.number = "4111111111111111".into();
        payment.account.month = 3;
        payment.account.year = 2031;
        payment.account.cvc = "123".into();
        let card = card_for(&payment).unwrap();
        assert_eq!(card.expiration_date, "2031-03");
        payment.account.month = 13;
        assert!(card_for(&payment).is_err());
    }
}
