//! Fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::StatusCode;
use consent_bridge::AppState;
use consent_bridge::config::{AppConfig, HydraConfig, SessionBackend, SessionConfig};
use consent_bridge::error::{BackendError, IdentityError};
use consent_bridge::hydra::{
    AcceptConsent, AuthorizationBackend, CompletedRequest, ConsentClient, ConsentRequest,
    RejectConsent, TokenIntrospection,
};
use consent_bridge::identity::{IdentityRecord, IdentitySource};
use consent_bridge::session::MemorySessionStore;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const REMEMBER_FOR: i64 = 3600;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    GetConsent(String),
    Accept(String, AcceptConsent),
    Reject(String, RejectConsent),
    Introspect(String),
}

/// In-memory authorization backend recording every call.
#[derive(Default)]
pub struct FakeBackend {
    consent_requests: Mutex<HashMap<String, ConsentRequest>>,
    introspections: Mutex<HashMap<String, TokenIntrospection>>,
    calls: Mutex<Vec<BackendCall>>,
    pub fail_accept: AtomicBool,
    pub fail_reject: AtomicBool,
    pub fail_introspect: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_consent_request(&self, request: ConsentRequest) {
        self.consent_requests
            .lock()
            .unwrap()
            .insert(request.challenge.clone(), request);
    }

    pub fn add_token(&self, token: &str, active: bool, sub: Option<&str>) {
        self.introspections.lock().unwrap().insert(
            token.to_string(),
            TokenIntrospection {
                active,
                sub: sub.map(String::from),
            },
        );
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutation_calls(&self) -> Vec<BackendCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, BackendCall::Accept(..) | BackendCall::Reject(..)))
            .collect()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn unavailable() -> BackendError {
        BackendError::Http {
            status: StatusCode::SERVICE_UNAVAILABLE,
            context: "fake backend failure".into(),
        }
    }
}

pub fn accepted_url(challenge: &str) -> String {
    format!("https://auth.example.org/oauth2/auth?consent_verifier=accepted-{challenge}")
}

pub fn rejected_url(challenge: &str) -> String {
    format!("https://auth.example.org/oauth2/auth?consent_verifier=rejected-{challenge}")
}

#[async_trait]
impl AuthorizationBackend for FakeBackend {
    async fn get_consent_request(&self, challenge: &str) -> Result<ConsentRequest, BackendError> {
        self.record(BackendCall::GetConsent(challenge.to_string()));
        self.consent_requests
            .lock()
            .unwrap()
            .get(challenge)
            .cloned()
            .ok_or_else(|| BackendError::Http {
                status: StatusCode::NOT_FOUND,
                context: format!("unknown challenge {challenge}"),
            })
    }

    async fn accept_consent_request(
        &self,
        challenge: &str,
        body: &AcceptConsent,
    ) -> Result<CompletedRequest, BackendError> {
        self.record(BackendCall::Accept(challenge.to_string(), body.clone()));
        if self.fail_accept.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(CompletedRequest {
            redirect_to: accepted_url(challenge),
        })
    }

    async fn reject_consent_request(
        &self,
        challenge: &str,
        body: &RejectConsent,
    ) -> Result<CompletedRequest, BackendError> {
        self.record(BackendCall::Reject(challenge.to_string(), body.clone()));
        if self.fail_reject.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(CompletedRequest {
            redirect_to: rejected_url(challenge),
        })
    }

    async fn introspect_token(&self, token: &str) -> Result<TokenIntrospection, BackendError> {
        self.record(BackendCall::Introspect(token.to_string()));
        if self.fail_introspect.load(Ordering::SeqCst) {
            return Err(BackendError::Network("connection refused".into()));
        }
        Ok(self
            .introspections
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .unwrap_or_default())
    }
}

/// Identity source counting lookups.
#[derive(Default)]
pub struct FakeIdentities {
    records: Mutex<HashMap<String, IdentityRecord>>,
    lookups: AtomicUsize,
}

impl FakeIdentities {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, subject: &str, record: serde_json::Value) {
        let serde_json::Value::Object(record) = record else {
            panic!("identity fixtures must be objects");
        };
        self.records
            .lock()
            .unwrap()
            .insert(subject.to_string(), record);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentitySource for FakeIdentities {
    async fn get_identity(&self, subject: &str) -> Result<IdentityRecord, IdentityError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .get(subject)
            .cloned()
            .ok_or_else(|| IdentityError::NotFound(subject.to_string()))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: None,
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        site_name: "Test IdP".into(),
        hydra: HydraConfig {
            admin_url: "http://127.0.0.1:4445".into(),
            request_timeout_secs: 5,
        },
        session: SessionConfig {
            backend: SessionBackend::Memory,
            consent_remember_for_secs: REMEMBER_FOR,
            ..SessionConfig::default()
        },
    }
}

pub fn consent_request(challenge: &str, subject: &str, scopes: &[&str]) -> ConsentRequest {
    ConsentRequest {
        challenge: challenge.to_string(),
        subject: subject.to_string(),
        requested_scope: scopes.iter().map(|s| s.to_string()).collect(),
        requested_access_token_audience: vec!["https://api.example.org".to_string()],
        skip: false,
        client: Some(ConsentClient {
            client_id: Some("client-1".into()),
            client_name: Some("Example App".into()),
        }),
    }
}

pub struct Harness {
    pub store: MemorySessionStore,
    pub backend: Arc<FakeBackend>,
    pub identities: Arc<FakeIdentities>,
    pub state: AppState,
}

pub fn harness() -> Harness {
    let store = MemorySessionStore::new();
    let backend = FakeBackend::new();
    let identities = FakeIdentities::new();
    let state = AppState::with_identity_source(
        &test_config(),
        Arc::new(store.clone()),
        backend.clone(),
        identities.clone(),
    );
    Harness {
        store,
        backend,
        identities,
        state,
    }
}
