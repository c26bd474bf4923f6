use super::{
    AcceptConsent, AuthorizationBackend, CompletedRequest, ConsentRequest, RejectConsent,
    TokenIntrospection,
};
use crate::error::BackendError;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, header};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!("consent-bridge/", env!("CARGO_PKG_VERSION"));
const CONSENT_PATH: &str = "admin/oauth2/auth/requests/consent";
const CONSENT_ACCEPT_PATH: &str = "admin/oauth2/auth/requests/consent/accept";
const CONSENT_REJECT_PATH: &str = "admin/oauth2/auth/requests/consent/reject";
const INTROSPECT_PATH: &str = "admin/oauth2/introspect";

/// Longest slice of an error body kept for logging.
const ERROR_CONTEXT_LIMIT: usize = 512;

/// Client for the authorization server's admin API.
#[derive(Clone)]
pub struct HydraAdminClient {
    base_url: Url,
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    request_timeout: Duration,
}

impl HydraAdminClient {
    pub fn new(admin_url: &str, request_timeout: Duration) -> Result<Self, BackendError> {
        let mut base_url = Url::parse(admin_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{admin_url}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| BackendError::Network(format!("TLS setup failed: {e}")))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(https);

        Ok(Self {
            base_url,
            client,
            request_timeout,
        })
    }

    fn endpoint(&self, path: &str, challenge: Option<&str>) -> Result<Url, BackendError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        if let Some(challenge) = challenge {
            url.query_pairs_mut()
                .append_pair("consent_challenge", challenge);
        }
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        content_type: Option<&'static str>,
        body: Bytes,
    ) -> Result<T, BackendError> {
        debug!("[hydra] {method} {}", url.path());

        let mut builder = Request::builder()
            .method(method)
            .uri(url.as_str())
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let req = builder
            .body(Full::new(body))
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let exchange = async {
            let res = self
                .client
                .request(req)
                .await
                .map_err(|e| BackendError::Network(e.to_string()))?;
            let status = res.status();
            let bytes = res
                .into_body()
                .collect()
                .await
                .map_err(|e| BackendError::Network(e.to_string()))?
                .to_bytes();
            Ok::<_, BackendError>((status, bytes))
        };
        let (status, bytes) = timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| BackendError::Timeout(self.request_timeout))??;

        if !status.is_success() {
            let context: String = String::from_utf8_lossy(&bytes)
                .chars()
                .take(ERROR_CONTEXT_LIMIT)
                .collect();
            return Err(BackendError::Http { status, context });
        }

        serde_json::from_slice(&bytes).map_err(|e| BackendError::Json(e.to_string()))
    }

    async fn send_json<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<T, BackendError> {
        let body = serde_json::to_vec(body).map_err(|e| BackendError::Json(e.to_string()))?;
        self.send(method, url, Some("application/json"), Bytes::from(body))
            .await
    }
}

#[async_trait]
impl AuthorizationBackend for HydraAdminClient {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_consent_request(&self, challenge: &str) -> Result<ConsentRequest, BackendError> {
        let url = self.endpoint(CONSENT_PATH, Some(challenge))?;
        self.send(Method::GET, url, None, Bytes::new()).await
    }

    #[tracing::instrument(level = "debug", skip(self, body))]
    async fn accept_consent_request(
        &self,
        challenge: &str,
        body: &AcceptConsent,
    ) -> Result<CompletedRequest, BackendError> {
        let url = self.endpoint(CONSENT_ACCEPT_PATH, Some(challenge))?;
        self.send_json(Method::PUT, url, body).await
    }

    #[tracing::instrument(level = "debug", skip(self, body))]
    async fn reject_consent_request(
        &self,
        challenge: &str,
        body: &RejectConsent,
    ) -> Result<CompletedRequest, BackendError> {
        let url = self.endpoint(CONSENT_REJECT_PATH, Some(challenge))?;
        self.send_json(Method::PUT, url, body).await
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn introspect_token(&self, token: &str) -> Result<TokenIntrospection, BackendError> {
        let url = self.endpoint(INTROSPECT_PATH, None)?;
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("token", token)
            .finish();
        self.send(
            Method::POST,
            url,
            Some("application/x-www-form-urlencoded"),
            Bytes::from(form),
        )
        .await
    }
}
