use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use checkout_common::{Cents, Currency};
use checkout_engine::{
    checkout_objects::{AuthorizationRequest, OrderRequest},
    db_types::{PaymentType, User},
    events::{EventHandlers, EventHooks},
    processors::ProcessorRegistry,
    test_utils::{
        fixtures::{organization, StubWallets},
        prepare_env::{prepare_test_env, random_db_path},
    },
    traits::CheckoutDatabase,
    CheckoutApi,
    SqliteDatabase,
};
use gateway_tools::GatewayEndpoints;
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tokio::runtime::Runtime;

async fn setup(handlers: &EventHandlers) -> CheckoutApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let wallets = Arc::new(StubWallets::default());
    let registry = ProcessorRegistry::with_gateways(GatewayEndpoints::default(), wallets.clone());
    CheckoutApi::new(db, registry, wallets, handlers.producers())
}

async fn tear_down(mut api: CheckoutApi<SqliteDatabase>) {
    let url = api.db().url().to_string();
    if let Err(e) = api.db_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI64>,
    captured: Arc<AtomicI64>,
}

impl HookCalled {
    pub fn called(&self, captured: Cents) {
        self.called.fetch_add(1, Ordering::Relaxed);
        self.captured.fetch_add(captured.value(), Ordering::Relaxed);
    }

    pub fn count(&self) -> i64 {
        self.called.load(Ordering::Relaxed)
    }

    pub fn captured(&self) -> i64 {
        self.captured.load(Ordering::Relaxed)
    }
}

fn contribution(email: &str, amount: i64) -> AuthorizationRequest {
    AuthorizationRequest {
        user: User { email: email.into(), ..Default::default() },
        order: OrderRequest {
            payment_type: Some(PaymentType::Null),
            currency: Some(Currency::from("usd")),
            contribution: Some(true),
            line_total: Some(Cents::from(amount)),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn on_order_captured() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let event = HookCalled::default();
    let event_copy = event.clone();
    rt.block_on(async move {
        let mut hooks = EventHooks::default();
        hooks.on_order_captured(move |ev| {
            info!("🪝️ {} captured on order {}", ev.captured, ev.order.id);
            event_copy.called(ev.captured);
            Box::pin(async {})
        });
        let handlers = EventHandlers::new(10, hooks);
        let api = setup(&handlers).await;
        handlers.start_handlers();
        let org = organization();
        for (email, amount) in [("alice@example.com", 1_000), ("bob@example.com", 2_500)] {
            let result = api.charge(&org, contribution(email, amount)).await.expect("Error charging order");
            // Nothing left to capture, so no second event
            api.capture(&org, &result.order.id).await.expect("Error capturing order");
        }
        tear_down(api).await;
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    });
    assert_eq!(event.count(), 2);
    assert_eq!(event.captured(), 3_500);
    info!("🪝️ test complete");
}
