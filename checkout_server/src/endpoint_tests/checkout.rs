use actix_web::{http::StatusCode, test::TestRequest};
use checkout_common::Cents;
use checkout_engine::{
    catalog_types::Organization,
    checkout_objects::CheckoutResult,
    db_types::{Order, OrderStatus, PaymentStatus},
    test_utils::fixtures::{organization, user_with_balance},
    traits::{CheckoutDatabase, DatabaseError, Entity},
    MemoryDatabase,
};
use serde_json::{json, Value};

use super::{
    helpers::{checkout_api, post_request, seeded_database, send_request, ADMIN_KEY, PUBLISHED_KEY, UNPUBLISHED_KEY},
    mocks::MockCheckoutDb,
};
use crate::auth::{ApiKey, Permission};

fn contribution(email: &str, payment_type: &str, amount: i64) -> String {
    json!({
        "user": {"email": email},
        "order": {"type": payment_type, "currency": "usd", "contribution": true, "line_total": amount},
    })
    .to_string()
}

fn error_message(body: &str) -> String {
    let value: Value = serde_json::from_str(body).expect("Error body was not JSON");
    value["error"].as_str().expect("No error field").to_string()
}

fn checkout_result(body: &str) -> CheckoutResult {
    serde_json::from_str(body).expect("Could not parse checkout result")
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init();
    let api = checkout_api(MemoryDatabase::new());
    let (status, body) = send_request(api, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn requests_need_an_api_key() {
    let _ = env_logger::try_init();
    let api = checkout_api(seeded_database().await);
    let body = contribution("alice@example.com", "null", 500);
    let (status, body) = post_request(api, "", "/checkout/authorize", &body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(error_message(&body).contains("No API key"));
}

#[actix_web::test]
async fn unknown_and_unpublished_keys_are_forbidden() {
    let _ = env_logger::try_init();
    let db = seeded_database().await;
    let body = contribution("alice@example.com", "null", 500);
    let (status, _) = post_request(checkout_api(db.clone()), "key_nope", "/checkout/authorize", &body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = post_request(checkout_api(db.clone()), UNPUBLISHED_KEY, "/checkout/charge", &body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(error_message(&body).contains("Insufficient Permissions"));
    assert_eq!(db.count(Order::KIND).await, 0);
}

#[actix_web::test]
async fn balance_authorize() {
    let _ = env_logger::try_init();
    let db = seeded_database().await;
    db.put(&user_with_balance("usr_alice", "alice@example.com", 1_000)).await.unwrap();
    let body = contribution("alice@example.com", "balance", 500);
    let (status, body) = post_request(checkout_api(db.clone()), PUBLISHED_KEY, "/checkout/authorize", &body).await;
    assert_eq!(status, StatusCode::OK);
    let result = checkout_result(&body);
    assert_eq!(result.order.user_id, "usr_alice");
    assert_eq!(result.order.total, Cents::from(500));
    assert_eq!(result.payments.len(), 1);
    assert!(result.payments[0].live);
    let stored = db.get::<Order>(&result.order.id).await.unwrap().unwrap();
    assert_eq!(stored, result.order);
}

#[actix_web::test]
async fn insufficient_credit_is_a_bad_request() {
    let _ = env_logger::try_init();
    let db = seeded_database().await;
    db.put(&user_with_balance("usr_alice", "alice@example.com", 100)).await.unwrap();
    let body = contribution("alice@example.com", "balance", 500);
    let (status, body) = post_request(checkout_api(db.clone()), ADMIN_KEY, "/checkout/authorize", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Insufficient credit to complete this purchase");
    assert_eq!(db.count(Order::KIND).await, 0);
}

#[actix_web::test]
async fn malformed_bodies_are_rejected() {
    let _ = env_logger::try_init();
    let api = checkout_api(seeded_database().await);
    let (status, body) = post_request(api, ADMIN_KEY, "/checkout/authorize", r#"{"order": {"line_total": "lots"}}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).starts_with("Could not read request body"));
}

#[actix_web::test]
async fn authorize_then_capture() {
    let _ = env_logger::try_init();
    let db = seeded_database().await;
    let body = contribution("bob@example.com", "null", 2_500);
    let (status, body) = post_request(checkout_api(db.clone()), ADMIN_KEY, "/checkout/authorize", &body).await;
    assert_eq!(status, StatusCode::OK);
    let order_id = checkout_result(&body).order.id;

    let path = format!("/checkout/capture/{order_id}");
    let (status, body) = post_request(checkout_api(db.clone()), ADMIN_KEY, &path, "").await;
    assert_eq!(status, StatusCode::OK);
    let result = checkout_result(&body);
    assert_eq!(result.order.paid, Cents::from(2_500));
    assert_eq!(result.order.payment_status, PaymentStatus::Paid);

    // Paid orders can't take another authorization
    let path = format!("/checkout/authorize/{order_id}");
    let body = contribution("bob@example.com", "null", 2_500);
    let (status, _) = post_request(checkout_api(db.clone()), ADMIN_KEY, &path, &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_request(checkout_api(db), ADMIN_KEY, "/checkout/capture/ord_missing", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn charge_and_refund() {
    let _ = env_logger::try_init();
    let db = seeded_database().await;
    let body = contribution("carol@example.com", "null", 5_000);
    let (status, body) = post_request(checkout_api(db.clone()), PUBLISHED_KEY, "/checkout/charge", &body).await;
    assert_eq!(status, StatusCode::OK);
    let order_id = checkout_result(&body).order.id;
    let path = format!("/checkout/refund/{order_id}");

    let (status, body) = post_request(checkout_api(db.clone()), ADMIN_KEY, &path, r#"{"amount": 2000}"#).await;
    assert_eq!(status, StatusCode::OK);
    let order = checkout_result(&body).order;
    assert_eq!(order.refunded, Cents::from(2_000));
    assert_eq!(order.paid, Cents::from(3_000));
    assert_eq!(order.payment_status, PaymentStatus::Paid);

    let (status, body) = post_request(checkout_api(db.clone()), ADMIN_KEY, &path, r#"{"amount": 4000}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!error_message(&body).is_empty());
    let (status, _) = post_request(checkout_api(db.clone()), ADMIN_KEY, &path, r#"{"amount": 0}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_request(checkout_api(db.clone()), ADMIN_KEY, &path, r#"{"amount": 3000}"#).await;
    assert_eq!(status, StatusCode::OK);
    let order = checkout_result(&body).order;
    assert_eq!(order.payment_status, PaymentStatus::Refunded);
    assert_eq!(order.status, OrderStatus::Cancelled);
}

#[actix_web::test]
async fn confirm_and_cancel_need_a_two_phase_gateway() {
    let _ = env_logger::try_init();
    let db = seeded_database().await;
    let body = contribution("dave@example.com", "null", 700);
    let (_, body) = post_request(checkout_api(db.clone()), ADMIN_KEY, "/checkout/authorize", &body).await;
    let order_id = checkout_result(&body).order.id;
    for action in ["confirm", "cancel"] {
        let path = format!("/checkout/{action}/{order_id}");
        let (status, body) = post_request(checkout_api(db.clone()), ADMIN_KEY, &path, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(&body), "Invalid order type");
    }
}

#[actix_web::test]
async fn storage_failures_are_server_errors() {
    let _ = env_logger::try_init();
    let mut db = MockCheckoutDb::new();
    db.expect_get_raw().returning(|kind, id| match kind {
        "apikey" => {
            let key = ApiKey { id: id.into(), organization_id: "org_test".into(), permission: Permission::Admin };
            Ok(Some(serde_json::to_value(key).unwrap()))
        },
        "organization" => Ok(Some(serde_json::to_value(organization()).unwrap())),
        _ => Ok(None),
    });
    db.expect_children_raw().returning(|_, _| Ok(vec![]));
    db.expect_put_batch().times(1).returning(|_| Err(DatabaseError::DriverError("disk full".into())));
    let body = contribution("erin@example.com", "null", 500);
    let (status, body) = post_request(checkout_api(db), ADMIN_KEY, "/checkout/authorize", &body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_message(&body).contains("disk full"));
}

#[actix_web::test]
async fn missing_organizations_are_forbidden() {
    let _ = env_logger::try_init();
    let db = MemoryDatabase::new();
    let key = ApiKey { id: ADMIN_KEY.into(), organization_id: "org_gone".into(), permission: Permission::Admin };
    db.put(&key).await.unwrap();
    assert!(db.get::<Organization>("org_gone").await.unwrap().is_none());
    let body = contribution("frank@example.com", "null", 500);
    let (status, _) = post_request(checkout_api(db), ADMIN_KEY, "/checkout/charge", &body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn negative_quantities_are_rejected() {
    let _ = env_logger::try_init();
    let db = seeded_database().await;
    let body = json!({
        "user": {"email": "gail@example.com"},
        "order": {"type": "null", "currency": "usd", "items": [{"product_id": "tee", "quantity": -3}]},
    })
    .to_string();
    let (status, body) = post_request(checkout_api(db.clone()), ADMIN_KEY, "/checkout/authorize", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("quantity -3"));
    assert_eq!(db.count(Order::KIND).await, 0);
}
