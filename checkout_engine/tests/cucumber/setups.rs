use checkout_common::{Cents, Currency};
use checkout_engine::{
    catalog_types::{Coupon, CouponType, Product},
    checkout_objects::{OrderRequest, PaymentRequest},
    db_types::{LineItem, Order, Payment, PaymentStatus, PaymentType, User},
    test_utils::fixtures::{organization, user_with_balance},
    traits::{CheckoutDatabase, EntityBatch},
};
use cucumber::given;

use crate::cucumber::{CheckoutSystem, CheckoutWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut CheckoutWorld) {
    let system = CheckoutSystem::new().await;
    world.system = Some(system);
    world.org = organization();
}

#[given(expr = "a user {word} with {word} and a balance of {int} USD cents")]
async fn user_with_credit(world: &mut CheckoutWorld, id: String, email: String, balance: i64) {
    let user = user_with_balance(&id, &email, balance);
    world.db().put(&user).await.expect("Error storing user");
}

#[given(expr = "a product {word} priced at {int} cents")]
async fn product(world: &mut CheckoutWorld, id: String, price: i64) {
    let product = Product { id: id.clone(), name: id, price: Cents::from(price), taxable: true, ..Default::default() };
    world.db().put(&product).await.expect("Error storing product");
}

#[given(expr = "a flat coupon {word} worth {int} cents")]
async fn flat_coupon(world: &mut CheckoutWorld, code: String, amount: i64) {
    let coupon = Coupon { code, coupon_type: CouponType::Flat, amount, enabled: true, ..Default::default() };
    world.db().put(&coupon).await.expect("Error storing coupon");
}

#[given(expr = "test buyers match {string}")]
async fn whitelist(world: &mut CheckoutWorld, patterns: String) {
    world.org.email_whitelist = patterns;
}

#[given(expr = "a {word} contribution of {int} cents from {word}")]
async fn contribution(world: &mut CheckoutWorld, payment_type: String, amount: i64, email: String) {
    world.request.user = User { email, ..Default::default() };
    world.request.order = OrderRequest {
        payment_type: Some(PaymentType::from(payment_type)),
        currency: Some(Currency::from("usd")),
        contribution: Some(true),
        line_total: Some(Cents::from(amount)),
        ..Default::default()
    };
    world.request.payment = PaymentRequest::default();
}

#[given(expr = "a {word} order for {int} x {word} from {word}")]
async fn item_order(world: &mut CheckoutWorld, payment_type: String, quantity: i64, product: String, email: String) {
    world.request.user = User { email, ..Default::default() };
    world.request.order = OrderRequest {
        payment_type: Some(PaymentType::from(payment_type)),
        currency: Some(Currency::from("usd")),
        items: Some(vec![LineItem { product_id: Some(product), quantity, ..Default::default() }]),
        ..Default::default()
    };
}

#[given(expr = "the order uses coupon codes {string}")]
async fn coupon_codes(world: &mut CheckoutWorld, codes: String) {
    let codes = codes.split(',').map(|c| c.trim().to_string()).collect();
    world.request.order.coupon_codes = Some(codes);
}

/// Seeds a paid order directly, one captured test payment per entry in `payments` (e.g. "stripe:3000, square:2000").
#[given(expr = "a paid order {word} with payments {string}")]
async fn paid_order(world: &mut CheckoutWorld, order_id: String, payments: String) {
    let payments = payments
        .split(',')
        .enumerate()
        .map(|(i, p)| {
            let (payment_type, amount) = p.trim().split_once(':').expect("Payments look like type:amount");
            Payment {
                id: format!("{order_id}_pay{i}"),
                order_id: order_id.clone(),
                payment_type: PaymentType::from(payment_type.to_string()),
                amount: Cents::from(amount.parse::<i64>().expect("Amount is not a number")),
                captured: true,
                status: PaymentStatus::Paid,
                test: true,
                ..Default::default()
            }
        })
        .collect::<Vec<_>>();
    let total = payments.iter().map(|p| p.amount).sum();
    let order = Order {
        id: order_id.clone(),
        payment_type: payments[0].payment_type,
        total,
        paid: total,
        payment_status: PaymentStatus::Paid,
        payment_ids: payments.iter().map(|p| p.id.clone()).collect(),
        ..Default::default()
    };
    let mut batch = EntityBatch::new();
    batch.add(&order).unwrap().add_all(&payments).unwrap();
    world.db().put_batch(batch).await.expect("Error storing order");
    world.order_id = Some(order_id);
}
