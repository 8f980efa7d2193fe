use std::sync::Arc;

use checkout_engine::{
    catalog_types::Organization,
    checkout_objects::{AuthorizationRequest, CheckoutResult},
    processors::ProcessorRegistry,
    test_utils::{
        fixtures::StubWallets,
        prepare_env::{create_database, random_db_path, run_migrations},
    },
    CheckoutApi,
    CheckoutError,
    SqliteDatabase,
};
use cucumber::World;
use gateway_tools::GatewayEndpoints;
use log::*;

#[derive(Default, Debug, World)]
pub struct CheckoutWorld {
    pub system: Option<CheckoutSystem>,
    pub org: Organization,
    /// The request being built up by the `Given` steps.
    pub request: AuthorizationRequest,
    pub last_result: Option<Result<CheckoutResult, CheckoutError>>,
    pub order_id: Option<String>,
}

#[derive(Debug)]
pub struct CheckoutSystem {
    pub db_path: String,
    pub api: CheckoutApi<SqliteDatabase>,
}

impl CheckoutWorld {
    pub fn api(&self) -> &CheckoutApi<SqliteDatabase> {
        &self.system.as_ref().expect("CheckoutApi not initialised").api
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.api().db()
    }

    pub fn order_id(&self) -> String {
        self.order_id.clone().expect("No order has been placed")
    }

    pub fn result(&self) -> &CheckoutResult {
        match self.last_result.as_ref().expect("No checkout call has been made") {
            Ok(result) => result,
            Err(e) => panic!("The last checkout call failed: {e}"),
        }
    }

    pub fn record(&mut self, result: Result<CheckoutResult, CheckoutError>) {
        if let Ok(r) = &result {
            self.order_id = Some(r.order.id.clone());
        }
        self.last_result = Some(result);
    }
}

impl CheckoutSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let wallets = Arc::new(StubWallets::default());
        let registry = ProcessorRegistry::with_gateways(GatewayEndpoints::default(), wallets.clone());
        let api = CheckoutApi::new(db, registry, wallets, Default::default());
        Self { db_path: url, api }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}

