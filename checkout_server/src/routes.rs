//! Request handler definitions
//!
//! Define each route and its handler here. Handlers are thin: they pull the tenant and the request apart, call the
//! [`CheckoutApi`] and serialize the result. Anything longer belongs in the engine.
//!
//! Every `/checkout` route is guarded by the ACL middleware, which resolves the bearer API key to a [`Tenant`] before
//! the handler runs.
use actix_web::{get, web, web::ServiceConfig, HttpResponse, Responder};
use checkout_engine::{
    checkout_objects::{AuthorizationRequest, CheckoutResult, RefundRequest},
    traits::CheckoutDatabase,
    CheckoutApi,
};
use log::*;

use crate::{
    auth::{Permission, Tenant},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($perms:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::<A>::new(&[$($perms),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// Registers every route, plus a JSON extractor config that reports malformed bodies in the usual error format.
pub fn configure_routes<B: CheckoutDatabase + 'static>(cfg: &mut ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        debug!("💻️ Rejecting malformed request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    });
    cfg.app_data(json_config)
        .service(health)
        .service(AuthorizeRoute::<B>::new())
        .service(AuthorizeOrderRoute::<B>::new())
        .service(CaptureRoute::<B>::new())
        .service(ChargeRoute::<B>::new())
        .service(ConfirmRoute::<B>::new())
        .service(CancelRoute::<B>::new())
        .service(RefundRoute::<B>::new());
}

fn checkout_response(result: CheckoutResult) -> HttpResponse {
    HttpResponse::Ok().json(result)
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Authorize  ----------------------------------------------------
route!(authorize => Post "/checkout/authorize" impl CheckoutDatabase where requires [Permission::Admin, Permission::Published]);
/// Starts a new order and authorizes its first payment.
///
/// The body is an [`AuthorizationRequest`]: the buyer, the order fields the client controls, and the payment
/// account details for the order's gateway. The response is the stored order and its payments.
pub async fn authorize<B: CheckoutDatabase>(
    tenant: web::ReqData<Tenant>,
    body: web::Json<AuthorizationRequest>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST authorize for {}", tenant.organization.id);
    let result = api.authorize(&tenant.organization, None, body.into_inner()).await?;
    Ok(checkout_response(result))
}

route!(authorize_order => Post "/checkout/authorize/{orderid}" impl CheckoutDatabase where requires [Permission::Admin, Permission::Published]);
/// Authorizes another payment against an existing open order.
pub async fn authorize_order<B: CheckoutDatabase>(
    tenant: web::ReqData<Tenant>,
    path: web::Path<String>,
    body: web::Json<AuthorizationRequest>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST authorize for order {order_id}");
    let result = api.authorize(&tenant.organization, Some(&order_id), body.into_inner()).await?;
    Ok(checkout_response(result))
}

//----------------------------------------------   Capture  ----------------------------------------------------
route!(capture => Post "/checkout/capture/{orderid}" impl CheckoutDatabase where requires [Permission::Admin, Permission::Published]);
pub async fn capture<B: CheckoutDatabase>(
    tenant: web::ReqData<Tenant>,
    path: web::Path<String>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST capture for order {order_id}");
    let result = api.capture(&tenant.organization, &order_id).await?;
    Ok(checkout_response(result))
}

route!(charge => Post "/checkout/charge" impl CheckoutDatabase where requires [Permission::Admin, Permission::Published]);
/// Authorize and capture in one call.
pub async fn charge<B: CheckoutDatabase>(
    tenant: web::ReqData<Tenant>,
    body: web::Json<AuthorizationRequest>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST charge for {}", tenant.organization.id);
    let result = api.charge(&tenant.organization, body.into_inner()).await?;
    Ok(checkout_response(result))
}

//--------------------------------------------   Confirm / Cancel  ---------------------------------------------------
route!(confirm => Post "/checkout/confirm/{orderid}" impl CheckoutDatabase where requires [Permission::Admin, Permission::Published]);
pub async fn confirm<B: CheckoutDatabase>(
    tenant: web::ReqData<Tenant>,
    path: web::Path<String>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST confirm for order {order_id}");
    let result = api.confirm(&tenant.organization, &order_id).await?;
    Ok(checkout_response(result))
}

route!(cancel => Post "/checkout/cancel/{orderid}" impl CheckoutDatabase where requires [Permission::Admin, Permission::Published]);
pub async fn cancel<B: CheckoutDatabase>(
    tenant: web::ReqData<Tenant>,
    path: web::Path<String>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST cancel for order {order_id}");
    let result = api.cancel(&tenant.organization, &order_id).await?;
    Ok(checkout_response(result))
}

//----------------------------------------------   Refund  ----------------------------------------------------
route!(refund => Post "/checkout/refund/{orderid}" impl CheckoutDatabase where requires [Permission::Admin, Permission::Published]);
/// Refunds `{"amount": <cents>}` of the order's captured payments.
pub async fn refund<B: CheckoutDatabase>(
    tenant: web::ReqData<Tenant>,
    path: web::Path<String>,
    body: web::Json<RefundRequest>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let RefundRequest { amount } = body.into_inner();
    info!("💻️ POST refund of {amount} for order {order_id}");
    let result = api.refund(&tenant.organization, &order_id, amount).await?;
    Ok(checkout_response(result))
}
