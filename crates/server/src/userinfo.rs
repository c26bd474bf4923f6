//! OpenID Connect userinfo resolution.

use crate::error::UserinfoError;
use crate::hydra::AuthorizationBackend;
use crate::identity::{IdentityRecord, IdentitySource};
use axum::http::{HeaderMap, header};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Upstream identity fields plus `email`.
///
/// `email` always carries the token subject and replaces any `email` field the upstream
/// record may have.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserinfoResponse {
    #[serde(flatten)]
    pub identity: IdentityRecord,
    pub email: String,
}

impl UserinfoResponse {
    pub fn new(mut identity: IdentityRecord, email: String) -> Self {
        identity.remove("email");
        Self { identity, email }
    }
}

/// Token carried by the `Authorization` header.
///
/// The first occurrence of `"Bearer "` is removed wherever it appears, so a bare token
/// without the scheme is accepted as-is. A missing or non UTF-8 header yields `""`.
pub fn extract_bearer_token(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .replacen("Bearer ", "", 1)
}

pub struct UserinfoService {
    backend: Arc<dyn AuthorizationBackend>,
    identities: Arc<dyn IdentitySource>,
}

impl UserinfoService {
    pub fn new(backend: Arc<dyn AuthorizationBackend>, identities: Arc<dyn IdentitySource>) -> Self {
        Self {
            backend,
            identities,
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn resolve(&self, access_token: &str) -> Result<UserinfoResponse, UserinfoError> {
        if access_token.is_empty() {
            return Err(UserinfoError::MissingToken);
        }

        debug!("Retrieving access token info...");
        let introspection = self
            .backend
            .introspect_token(access_token)
            .await
            .map_err(UserinfoError::Introspection)?;

        if !introspection.active {
            return Err(UserinfoError::InactiveToken);
        }
        let subject = introspection
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or(UserinfoError::MissingSubject)?;

        debug!("Retrieving identity record...");
        let identity = self
            .identities
            .get_identity(&subject)
            .await
            .map_err(UserinfoError::Lookup)?;

        Ok(UserinfoResponse::new(identity, subject))
    }
}
