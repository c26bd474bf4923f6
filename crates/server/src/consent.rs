//! Consent decision protocol.
//!
//! A confirmation walks `Received -> CsrfValidated -> ChallengeResolved -> Accepting |
//! Rejecting -> Redirected`. Any failing step ends the request; nothing is retried.
//!
//! The CSRF entry binding a rendered form to its challenge is consumed with an atomic
//! take before anything else happens, so a token resolves at most once even when the rest
//! of the flow fails.

use crate::error::ConsentError;
use crate::hydra::{AcceptConsent, AuthorizationBackend, ConsentRequest, RejectConsent};
use crate::session::{SessionKeys, SessionStore};
use base64::Engine;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// User decision posted by the consent form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentAction {
    Accept,
    Reject,
    /// Anything else. Rejected by [`ConsentService::confirm`] without a backend call.
    Undefined(String),
}

impl Default for ConsentAction {
    fn default() -> Self {
        Self::Undefined(String::new())
    }
}

impl From<String> for ConsentAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "accept" => Self::Accept,
            "reject" => Self::Reject,
            _ => Self::Undefined(value),
        }
    }
}

impl fmt::Display for ConsentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Reject => write!(f, "reject"),
            Self::Undefined(other) => write!(f, "{other}"),
        }
    }
}

impl<'de> Deserialize<'de> for ConsentAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// Form body of `POST /consent/confirm`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConfirmationRequest {
    /// CSRF token issued with the consent form. Absent reads as empty and fails the lookup.
    #[serde(rename = "_csrf", default)]
    pub csrf_token: String,
    /// Whether the authorization server should skip this prompt next time.
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub remember: bool,
    /// `accept` or `reject`. Absent reads as an undefined action.
    #[serde(default)]
    #[schema(value_type = String, example = "accept")]
    pub action: ConsentAction,
}

/// HTML checkboxes post `on`; programmatic clients tend to post `true`/`1`.
fn deserialize_checkbox<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean value: {other}"
        ))),
    }
}

/// Session payload the login step leaves for the subject.
///
/// Only its presence and well-formedness gate acceptance. The fields are not folded into
/// the grant. A JSON `null` reads as an empty context; any other non-object is malformed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShareContext(pub Map<String, Value>);

impl<'de> Deserialize<'de> for ShareContext {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<Map<String, Value>>::deserialize(deserializer)
            .map(|fields| Self(fields.unwrap_or_default()))
    }
}

/// Outcome of opening the consent page.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsentPrompt {
    /// The backend already holds a remembered grant; continue without asking.
    Redirect(String),
    /// Ask the user.
    Form(ConsentForm),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsentForm {
    pub csrf_token: String,
    pub request: ConsentRequest,
}

pub struct ConsentService {
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn AuthorizationBackend>,
    keys: SessionKeys,
    remember_for: i64,
    csrf_ttl: Duration,
}

impl ConsentService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn AuthorizationBackend>,
        keys: SessionKeys,
        remember_for: i64,
        csrf_ttl: Duration,
    ) -> Self {
        Self {
            store,
            backend,
            keys,
            remember_for,
            csrf_ttl,
        }
    }

    /// Resolve a posted decision and report it to the authorization backend.
    ///
    /// Returns the URL the browser must be sent to.
    #[tracing::instrument(skip_all, fields(action = %request.action))]
    pub async fn confirm(&self, request: ConfirmationRequest) -> Result<String, ConsentError> {
        debug!("Validating CSRF...");
        let challenge = self.consume_csrf(&request.csrf_token).await?;

        debug!("Getting OAuth2 consent request...");
        let consent = self
            .backend
            .get_consent_request(&challenge)
            .await
            .map_err(ConsentError::ChallengeFetch)?;

        match request.action {
            ConsentAction::Reject => {
                debug!("User rejected the request, reporting back to the backend...");
                let completed = self
                    .backend
                    .reject_consent_request(&challenge, &RejectConsent::by_user())
                    .await
                    .map_err(ConsentError::Rejection)?;

                info!(subject = %consent.subject, "User rejected consent");
                Ok(completed.redirect_to)
            }
            ConsentAction::Accept => {
                debug!("User accepted the request, reporting back to the backend...");
                self.load_share_context(&consent.subject).await?;

                let grant =
                    AcceptConsent::full_grant(&consent, request.remember, self.remember_for);
                let completed = self
                    .backend
                    .accept_consent_request(&challenge, &grant)
                    .await
                    .map_err(ConsentError::Acceptance)?;

                info!(
                    subject = %consent.subject,
                    scopes = ?grant.grant_scope,
                    remember = grant.remember,
                    "User granted consent"
                );
                Ok(completed.redirect_to)
            }
            ConsentAction::Undefined(action) => Err(ConsentError::UndefinedAction(action)),
        }
    }

    /// Look up a challenge for the consent page and bind a fresh CSRF token to it.
    #[tracing::instrument(skip(self))]
    pub async fn prepare(&self, challenge: &str) -> Result<ConsentPrompt, ConsentError> {
        if challenge.is_empty() {
            return Err(ConsentError::MissingChallenge);
        }

        let request = self
            .backend
            .get_consent_request(challenge)
            .await
            .map_err(ConsentError::ChallengeFetch)?;

        if request.skip {
            debug!("Consent previously remembered, accepting without prompt...");
            let grant = AcceptConsent::full_grant(&request, false, self.remember_for);
            let completed = self
                .backend
                .accept_consent_request(challenge, &grant)
                .await
                .map_err(ConsentError::Acceptance)?;
            return Ok(ConsentPrompt::Redirect(completed.redirect_to));
        }

        let csrf_token = generate_csrf_token()?;
        self.store
            .set(
                &self.keys.csrf(&csrf_token),
                challenge.as_bytes(),
                Some(self.csrf_ttl),
            )
            .await
            .map_err(|e| ConsentError::CsrfIssue(e.to_string()))?;

        Ok(ConsentPrompt::Form(ConsentForm {
            csrf_token,
            request,
        }))
    }

    async fn consume_csrf(&self, token: &str) -> Result<String, ConsentError> {
        match self.store.take(&self.keys.csrf(token)).await {
            Ok(Some(bytes)) => String::from_utf8(bytes).map_err(|_| {
                warn!("CSRF session holds a non UTF-8 challenge");
                ConsentError::SessionLookup(None)
            }),
            Ok(None) => {
                warn!("CSRF session missing or expired");
                Err(ConsentError::SessionLookup(None))
            }
            Err(e) => Err(ConsentError::SessionLookup(Some(e))),
        }
    }

    async fn load_share_context(&self, subject: &str) -> Result<ShareContext, ConsentError> {
        debug!("Retrieving context...");
        let bytes = self
            .store
            .get(&self.keys.share_context(subject))
            .await
            .map_err(|e| ConsentError::ContextRetrieval(Some(e)))?
            .ok_or(ConsentError::ContextRetrieval(None))?;

        debug!("Decoding context...");
        serde_json::from_slice(&bytes).map_err(|e| ConsentError::ContextDecode(e.to_string()))
    }
}

/// 32 random bytes, URL-safe base64 without padding.
fn generate_csrf_token() -> Result<String, ConsentError> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes)
        .map_err(|e| ConsentError::CsrfIssue(format!("random source failed: {e}")))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}
