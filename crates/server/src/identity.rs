//! Upstream identity lookup.
//!
//! The login step caches the upstream user record for each subject it signs in. Userinfo
//! answers from that cache instead of calling the upstream instance again.

use crate::error::IdentityError;
use crate::session::{SessionKeys, SessionStore};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Upstream user record. The shape belongs to the upstream software and is passed through.
pub type IdentityRecord = Map<String, Value>;

#[async_trait]
pub trait IdentitySource: Send + Sync + 'static {
    async fn get_identity(&self, subject: &str) -> Result<IdentityRecord, IdentityError>;
}

/// Reads user records cached in the session store.
#[derive(Clone)]
pub struct StoredIdentitySource {
    store: Arc<dyn SessionStore>,
    keys: SessionKeys,
}

impl StoredIdentitySource {
    pub fn new(store: Arc<dyn SessionStore>, keys: SessionKeys) -> Self {
        Self { store, keys }
    }
}

#[async_trait]
impl IdentitySource for StoredIdentitySource {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_identity(&self, subject: &str) -> Result<IdentityRecord, IdentityError> {
        let bytes = self
            .store
            .get(&self.keys.userinfo(subject))
            .await?
            .ok_or_else(|| IdentityError::NotFound(subject.to_string()))?;

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(record)) => Ok(record),
            Ok(other) => Err(IdentityError::Decode(format!(
                "expected object, found {}",
                json_kind(&other)
            ))),
            Err(e) => Err(IdentityError::Decode(e.to_string())),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
