use std::sync::Arc;

use actix_web::{
    body,
    http::{
        header::{ContentType, AUTHORIZATION},
        StatusCode,
    },
    test,
    test::TestRequest,
    web,
    App,
};
use checkout_engine::{
    events::EventProducers,
    processors::ProcessorRegistry,
    test_utils::fixtures::{organization, StubWallets},
    traits::CheckoutDatabase,
    CheckoutApi,
    MemoryDatabase,
};
use gateway_tools::GatewayEndpoints;
use log::debug;

use crate::{
    auth::{ApiKey, Permission},
    routes::configure_routes,
};

pub const ADMIN_KEY: &str = "key_admin";
pub const PUBLISHED_KEY: &str = "key_published";
pub const UNPUBLISHED_KEY: &str = "key_unpublished";

pub fn checkout_api<B: CheckoutDatabase>(db: B) -> web::Data<CheckoutApi<B>> {
    let wallets = Arc::new(StubWallets::default());
    let processors = ProcessorRegistry::with_gateways(GatewayEndpoints::default(), wallets.clone());
    web::Data::new(CheckoutApi::new(db, processors, wallets, EventProducers::default()))
}

/// An in-memory database holding the test organization and one API key per permission.
pub async fn seeded_database() -> MemoryDatabase {
    let db = MemoryDatabase::new();
    db.put(&organization()).await.unwrap();
    for (id, permission) in
        [(ADMIN_KEY, Permission::Admin), (PUBLISHED_KEY, Permission::Published), (UNPUBLISHED_KEY, Permission::Unpublished)]
    {
        let key = ApiKey { id: id.into(), organization_id: "org_test".into(), permission };
        db.put(&key).await.unwrap();
    }
    db
}

/// Sends a request through the full app and returns the status and body. Rejections from the ACL middleware are
/// rendered the same way the server would render them.
pub async fn send_request<B: CheckoutDatabase + 'static>(
    api: web::Data<CheckoutApi<B>>,
    req: TestRequest,
) -> (StatusCode, String) {
    let app = App::new().app_data(api).configure(configure_routes::<B>);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res.into_parts().1,
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = body::to_bytes(res.into_body()).await.map(|b| String::from_utf8_lossy(&b).into_owned());
    (status, body.unwrap_or_default())
}

pub async fn post_request<B: CheckoutDatabase + 'static>(
    api: web::Data<CheckoutApi<B>>,
    api_key: &str,
    path: &str,
    body: &str,
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri(path).insert_header(ContentType::json()).set_payload(body.to_string());
    if !api_key.is_empty() {
        req = req.insert_header((AUTHORIZATION, format!("Bearer {api_key}")));
    }
    send_request(api, req).await
}
