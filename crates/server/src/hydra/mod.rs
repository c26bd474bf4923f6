//! Authorization backend.
//!
//! The authorization server owns consent challenges, grants and tokens. This module is the
//! narrow slice of its admin API the service consumes:
//! - fetch a consent request by challenge
//! - accept or reject it, receiving the URL the browser continues at
//! - introspect bearer tokens

mod client;

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::HydraAdminClient;

/// Error code reported to the client application when the user declines.
pub const REJECTED_BY_USER: &str = "rejected_by_user";
pub const REJECTED_BY_USER_DESCRIPTION: &str = "The resource owner rejected the request";

/// Relying party the consent is requested for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsentClient {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
}

/// Pending consent request as held by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRequest {
    pub challenge: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub requested_scope: Vec<String>,
    #[serde(default)]
    pub requested_access_token_audience: Vec<String>,
    /// Set when the subject already granted this client and asked to be remembered.
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub client: Option<ConsentClient>,
}

impl ConsentRequest {
    pub fn client_display_name(&self) -> &str {
        self.client
            .as_ref()
            .and_then(|c| {
                c.client_name
                    .as_deref()
                    .filter(|name| !name.is_empty())
                    .or(c.client_id.as_deref())
            })
            .unwrap_or("Unknown application")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptConsent {
    pub grant_scope: Vec<String>,
    pub grant_access_token_audience: Vec<String>,
    pub remember: bool,
    /// Seconds the backend should remember this decision for.
    pub remember_for: i64,
}

impl AcceptConsent {
    /// Grant exactly what was requested.
    pub fn full_grant(request: &ConsentRequest, remember: bool, remember_for: i64) -> Self {
        Self {
            grant_scope: request.requested_scope.clone(),
            grant_access_token_audience: request.requested_access_token_audience.clone(),
            remember,
            remember_for,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectConsent {
    pub error: String,
    pub error_description: String,
}

impl RejectConsent {
    pub fn by_user() -> Self {
        Self {
            error: REJECTED_BY_USER.to_string(),
            error_description: REJECTED_BY_USER_DESCRIPTION.to_string(),
        }
    }
}

/// Where the browser goes once the backend has recorded a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRequest {
    pub redirect_to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenIntrospection {
    pub active: bool,
    #[serde(default)]
    pub sub: Option<String>,
}

#[async_trait]
pub trait AuthorizationBackend: Send + Sync + 'static {
    async fn get_consent_request(&self, challenge: &str) -> Result<ConsentRequest, BackendError>;

    async fn accept_consent_request(
        &self,
        challenge: &str,
        body: &AcceptConsent,
    ) -> Result<CompletedRequest, BackendError>;

    async fn reject_consent_request(
        &self,
        challenge: &str,
        body: &RejectConsent,
    ) -> Result<CompletedRequest, BackendError>;

    async fn introspect_token(&self, token: &str) -> Result<TokenIntrospection, BackendError>;
}
