//! OpenID Connect consent confirmation and userinfo front-end.
//!
//! The service sits between the browser, an OAuth2 authorization server's admin API and a
//! session store shared with the login component. It confirms or rejects consent
//! challenges on behalf of the user and answers userinfo requests from cached upstream
//! profiles.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::consent::ConsentService;
use crate::hydra::AuthorizationBackend;
use crate::identity::{IdentitySource, StoredIdentitySource};
use crate::session::{SessionKeys, SessionStore};
use crate::userinfo::UserinfoService;

pub mod api;
pub mod config;
pub mod consent;
pub mod entity;
pub mod error;
pub mod hydra;
pub mod identity;
pub mod response;
pub mod session;
pub mod userinfo;

/// Shared handler state. Every collaborator is injected so tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub consent: Arc<ConsentService>,
    pub userinfo: Arc<UserinfoService>,
    pub site_name: String,
}

impl AppState {
    /// Wire the services from configuration, reading identities from the session store.
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn AuthorizationBackend>,
    ) -> Self {
        let keys = SessionKeys::from_config(&config.session);
        let identities: Arc<dyn IdentitySource> =
            Arc::new(StoredIdentitySource::new(store.clone(), keys.clone()));
        Self::with_identity_source(config, store, backend, identities)
    }

    pub fn with_identity_source(
        config: &AppConfig,
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn AuthorizationBackend>,
        identities: Arc<dyn IdentitySource>,
    ) -> Self {
        let consent = ConsentService::new(
            store,
            backend.clone(),
            SessionKeys::from_config(&config.session),
            config.session.consent_remember_for_secs,
            Duration::from_secs(config.session.csrf_ttl_secs),
        );
        Self {
            consent: Arc::new(consent),
            userinfo: Arc::new(UserinfoService::new(backend, identities)),
            site_name: config.site_name.clone(),
        }
    }
}
