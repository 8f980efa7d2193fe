//! API key authentication.
//!
//! Callers present `Authorization: Bearer <key>`. The key is the id of an [`ApiKey`] entity, which names the
//! organization the request acts for and the permission it was issued with. The organization is loaded here so that
//! handlers receive a ready-to-use [`Tenant`].
use std::fmt::Display;

use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use checkout_engine::{
    catalog_types::Organization,
    traits::{CheckoutDatabase, Entity},
};
use log::*;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Admin,
    Published,
    /// Keys for organizations that have not gone public yet. They cannot check out.
    #[default]
    Unpublished,
}

impl Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Admin => write!(f, "admin"),
            Permission::Published => write!(f, "published"),
            Permission::Unpublished => write!(f, "unpublished"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKey {
    /// The bearer token itself.
    pub id: String,
    pub organization_id: String,
    pub permission: Permission,
}

impl Entity for ApiKey {
    const KIND: &'static str = "apikey";

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<String> {
        Some(self.organization_id.clone())
    }
}

/// The authenticated caller, attached to the request by the ACL middleware.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub api_key: ApiKey,
    pub organization: Organization,
}

/// Extracts the key from an `Authorization: Bearer <key>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingApiKey)?;
    let value = value.to_str().map_err(|e| AuthError::PoorlyFormattedKey(e.to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::PoorlyFormattedKey("Expected a Bearer token".into()))?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MissingApiKey);
    }
    Ok(token.to_string())
}

/// Looks up the key and its organization, and checks that the key carries one of the `allowed` permissions.
pub async fn authenticate<B: CheckoutDatabase>(
    db: &B,
    token: &str,
    allowed: &[Permission],
) -> Result<Tenant, ServerError> {
    let api_key = db.get::<ApiKey>(token).await?.ok_or_else(|| {
        debug!("💻️ Rejecting unknown API key");
        AuthError::UnknownApiKey
    })?;
    if !allowed.contains(&api_key.permission) {
        debug!("💻️ API key for {} has {} permission. Rejecting.", api_key.organization_id, api_key.permission);
        let msg = format!("This route needs one of {allowed:?}");
        return Err(AuthError::InsufficientPermissions(msg).into());
    }
    let organization = db
        .get::<Organization>(&api_key.organization_id)
        .await?
        .ok_or_else(|| AuthError::OrganizationNotFound(api_key.organization_id.clone()))?;
    trace!("💻️ Authenticated request for organization {}", organization.id);
    Ok(Tenant { api_key, organization })
}
