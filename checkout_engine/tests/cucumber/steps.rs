use checkout_common::Cents;
use checkout_engine::{
    db_types::{Order, Payment},
    traits::CheckoutDatabase,
};
use cucumber::{then, when};

use crate::cucumber::CheckoutWorld;

#[when("the buyer checks out")]
async fn authorize(world: &mut CheckoutWorld) {
    let request = std::mem::take(&mut world.request);
    let result = world.api().authorize(&world.org, None, request).await;
    world.record(result);
}

#[when("the buyer is charged")]
async fn charge(world: &mut CheckoutWorld) {
    let request = std::mem::take(&mut world.request);
    let result = world.api().charge(&world.org, request).await;
    world.record(result);
}

#[when("the order is captured")]
async fn capture(world: &mut CheckoutWorld) {
    let result = world.api().capture(&world.org, &world.order_id()).await;
    world.record(result);
}

#[when(expr = "I refund {int} cents")]
async fn refund(world: &mut CheckoutWorld, amount: i64) {
    let result = world.api().refund(&world.org, &world.order_id(), Cents::from(amount)).await;
    world.record(result);
}

#[then(expr = "the checkout fails with {word}")]
async fn fails_with(world: &mut CheckoutWorld, kind: String) {
    match world.last_result.as_ref().expect("No checkout call has been made") {
        Ok(r) => panic!("Expected {kind}, but order {} succeeded", r.order.id),
        Err(e) => assert_eq!(format!("{:?}", e.kind()), kind, "{e}"),
    }
}

#[then("no orders are stored")]
async fn no_orders(world: &mut CheckoutWorld) {
    assert_eq!(world.db().count("order").await.unwrap(), 0);
    assert_eq!(world.db().count("payment").await.unwrap(), 0);
}

#[then(expr = "the order {word} is {int} cents")]
async fn order_amount(world: &mut CheckoutWorld, field: String, amount: i64) {
    let order = &world.result().order;
    let value = match field.as_str() {
        "line_total" => order.line_total,
        "discount" => order.discount,
        "subtotal" => order.subtotal,
        "shipping" => order.shipping,
        "tax" => order.tax,
        "adjustment" => order.adjustment,
        "total" => order.total,
        "paid" => order.paid,
        "refunded" => order.refunded,
        "balance" => order.balance,
        other => panic!("Unknown order field: {other}"),
    };
    assert_eq!(value, Cents::from(amount), "order.{field}");
}

#[then(expr = "the order status is {word} and its payment status is {word}")]
async fn order_statuses(world: &mut CheckoutWorld, status: String, payment_status: String) {
    let order = &world.result().order;
    assert_eq!(order.status.to_string(), status);
    assert_eq!(order.payment_status.to_string(), payment_status);
}

#[then("the stored order matches the result")]
async fn stored_order(world: &mut CheckoutWorld) {
    let result = world.result().clone();
    let stored = world.db().get::<Order>(&result.order.id).await.unwrap().expect("Order was not stored");
    assert_eq!(stored, result.order);
    let payments = world.db().children::<Payment>(&result.order.id).await.unwrap();
    assert_eq!(payments, result.payments);
}

#[then(expr = "the payment is live: {word}, test: {word}")]
async fn payment_flags(world: &mut CheckoutWorld, live: String, test: String) {
    let payment = world.result().payments.first().expect("No payment on the order");
    assert_eq!(payment.live.to_string(), live);
    assert_eq!(payment.test.to_string(), test);
}

#[then(expr = "the order has {int} stored payments with {int} cents refunded")]
async fn refunded_payments(world: &mut CheckoutWorld, count: usize, refunded: i64) {
    let payments = world.db().children::<Payment>(&world.order_id()).await.unwrap();
    assert_eq!(payments.len(), count);
    let total: Cents = payments.iter().map(|p| p.amount_refunded).sum();
    assert_eq!(total, Cents::from(refunded));
}
