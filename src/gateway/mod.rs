pub mod classify;

use std::sync::Arc;
use std::time::Instant;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::notify::{Notification, Notifier};
use crate::storage::CredentialStore;

pub use classify::{classify_status, classify_transport, normalize_login_message};

/// Receives the forced sign-out when the backend reports an expired session
pub trait SessionExpiry: Send + Sync {
    fn session_expired(&self);
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    /// Skip the gateway notification; the caller reports the failure itself
    pub silent: bool,
}

impl RequestOptions {
    pub fn with_query(query: Vec<(String, String)>) -> Self {
        Self { query, silent: false }
    }

    pub fn silent() -> Self {
        Self { query: Vec::new(), silent: true }
    }
}

/// Single outbound channel to the backend
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    http: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    expiry: Arc<dyn SessionExpiry>,
}

impl Gateway {
    pub fn new(
        config: &ApiConfig,
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        expiry: Arc<dyn SessionExpiry>,
    ) -> Result<Self, ApiError> {
        Url::parse(&config.base_url)
            .map_err(|e| ApiError::unknown(format!("Invalid API base URL '{}': {}", config.base_url, e)))?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::unknown(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                http,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                credentials,
                notifier,
                expiry,
            }),
        })
    }

    /// Issue a request and return the raw JSON body.
    ///
    /// Every failure is classified here. `SessionExpired` triggers the forced
    /// sign-out and comes back only as a cancellation marker; every other kind
    /// is notified once unless `opts.silent` is set.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        opts: RequestOptions,
    ) -> Result<Value, ApiError> {
        let outcome = self.send(method.clone(), path, body, &opts.query).await;
        outcome.map_err(|err| self.settle(err, &method, path, opts.silent))
    }

    /// Issue a request and decode the `data` member of the response envelope
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        opts: RequestOptions,
    ) -> Result<T, ApiError> {
        let silent = opts.silent;
        let payload = self.request(method.clone(), path, body, opts).await?;
        let data = payload.get("data").cloned().unwrap_or(Value::Null);

        serde_json::from_value(data).map_err(|e| {
            warn!("Failed to decode response from {} {}: {}", method, path, e);
            let err = ApiError::unknown("Unexpected response from server");
            self.settle(err, &method, path, silent)
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: Vec<(String, String)>) -> Result<T, ApiError> {
        self.fetch(Method::GET, path, None, RequestOptions::with_query(query)).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: Option<Value>) -> Result<T, ApiError> {
        self.fetch(Method::POST, path, body, RequestOptions::default()).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: Option<Value>) -> Result<T, ApiError> {
        self.fetch(Method::PUT, path, body, RequestOptions::default()).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str, body: Option<Value>) -> Result<T, ApiError> {
        self.fetch(Method::DELETE, path, body, RequestOptions::default()).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: &[(String, String)],
    ) -> Result<Value, ApiError> {
        let url = self.endpoint(path, query)?;
        let request_id = Uuid::new_v4();

        let mut request = self
            .inner
            .http
            .request(method.clone(), url)
            .header("x-request-id", request_id.to_string());

        // Absence of a token is not an error here
        if let Some(token) = self.inner.credentials.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|e| classify_transport(&e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| classify_transport(&e))?;

        debug!(
            %request_id,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{} {}",
            method,
            path
        );

        let payload: Option<Value> = serde_json::from_slice(&bytes).ok();

        if status.is_success() {
            Ok(payload.unwrap_or(Value::Null))
        } else {
            if let Some(ref body) = payload {
                debug!(%request_id, "Error payload: {}", body);
            }
            Err(classify_status(status.as_u16(), path, payload.as_ref()))
        }
    }

    fn endpoint(&self, path: &str, query: &[(String, String)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.inner.base_url, path))
            .map_err(|e| ApiError::unknown(format!("Invalid request path '{}': {}", path, e)))?;

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }

    fn settle(&self, err: ApiError, method: &Method, path: &str, silent: bool) -> ApiError {
        if err.is_session_expired() {
            warn!("Session expired on {} {}; signing out", method, path);
            self.inner.expiry.session_expired();
        } else if !silent {
            self.inner.notifier.notify(Notification::error(err.message()));
        }
        err
    }
}

/// Serialize a request payload
pub fn json_body<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::unknown(format!("Failed to encode request: {}", e)))
}
