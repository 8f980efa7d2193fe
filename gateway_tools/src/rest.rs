use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::GatewayApiError;

/// Request payloads. Stripe and the PayPal token endpoint want form encoding, everyone else speaks JSON.
#[derive(Debug, Clone)]
pub enum RestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// A `reqwest` client bound to one gateway host and one set of credentials.
#[derive(Clone)]
pub struct RestClient {
    base_url: String,
    client: Arc<Client>,
}

impl RestClient {
    /// Creates a client that sends `Authorization: Bearer <token>` on every request. Pass `None` for APIs that
    /// authenticate in the body (Authorize.Net) or per-request (PayPal's token endpoint).
    pub fn new(base_url: &str, bearer_token: Option<&str>) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        if let Some(token) = bearer_token {
            let val = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
            headers.insert(AUTHORIZATION, val);
        }
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        headers: &[(&'static str, String)],
        body: Option<RestBody>,
    ) -> Result<T, GatewayApiError> {
        let text = self.send(method, path, headers, body).await?;
        serde_json::from_str::<T>(&text).map_err(|e| GatewayApiError::JsonError(e.to_string()))
    }

    /// Sends the request and returns the raw body of a successful response.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        headers: &[(&'static str, String)],
        body: Option<RestBody>,
    ) -> Result<String, GatewayApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        for (name, value) in headers {
            req = req.header(*name, value);
        }
        req = match body {
            Some(RestBody::Json(v)) => req.json(&v),
            Some(RestBody::Form(params)) => req.form(&params),
            None => req,
        };
        let response = req.send().await.map_err(|e| GatewayApiError::RestRequestError(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
        if status.is_success() {
            trace!("REST query successful. {status}");
            Ok(text)
        } else {
            debug!("REST query failed. {status}: {text}");
            Err(GatewayApiError::QueryError { status: status.as_u16(), message: text })
        }
    }
}
