//! Access control middleware for the checkout routes.
//!
//! It reads the bearer API key from the request, resolves it to a [`Tenant`] and checks the key's permission against
//! the ones allowed on the route. On success the tenant is stored in the request extensions for the handler to pick
//! up with `web::ReqData<Tenant>`. Otherwise the request is rejected with a 401 or 403.
//!
//! The middleware finds the database through the `web::Data<CheckoutApi<B>>` registered on the app, so it is generic
//! over the same backend as the handlers it guards.
use std::{marker::PhantomData, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpMessage,
};
use checkout_engine::{traits::CheckoutDatabase, CheckoutApi};
use futures::{
    future::{ok, Ready},
    Future,
};

use crate::{
    auth::{authenticate, bearer_token, Permission},
    errors::ServerError,
};

pub struct AclMiddlewareFactory<B> {
    allowed: Vec<Permission>,
    _db: PhantomData<fn() -> B>,
}

impl<B> AclMiddlewareFactory<B> {
    pub fn new(allowed: &[Permission]) -> Self {
        AclMiddlewareFactory { allowed: allowed.to_vec(), _db: PhantomData }
    }
}

impl<S, Body, B> Transform<S, ServiceRequest> for AclMiddlewareFactory<B>
where
    S: Service<ServiceRequest, Response = ServiceResponse<Body>, Error = Error> + 'static,
    S::Future: 'static,
    Body: 'static,
    B: CheckoutDatabase + 'static,
{
    type Response = ServiceResponse<Body>;
    type Error = Error;
    type Transform = AclMiddlewareService<S, B>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed: self.allowed.clone(), service: Rc::new(service), _db: PhantomData })
    }
}

pub struct AclMiddlewareService<S, B> {
    allowed: Vec<Permission>,
    service: Rc<S>,
    _db: PhantomData<fn() -> B>,
}

impl<S, Body, B> Service<ServiceRequest> for AclMiddlewareService<S, B>
where
    S: Service<ServiceRequest, Response = ServiceResponse<Body>, Error = Error> + 'static,
    S::Future: 'static,
    Body: 'static,
    B: CheckoutDatabase + 'static,
{
    type Response = ServiceResponse<Body>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed = self.allowed.clone();
        Box::pin(async move {
            let token = bearer_token(req.headers()).map_err(ServerError::from)?;
            let api = req.app_data::<web::Data<CheckoutApi<B>>>().cloned().ok_or_else(|| {
                log::error!("💻️ No checkout API is registered on the app. Cannot authenticate requests.");
                ServerError::InitializeError("The checkout API is not configured".into())
            })?;
            let tenant = authenticate(api.db(), &token, &allowed).await?;
            req.extensions_mut().insert(tenant);
            service.call(req).await
        })
    }
}
