//! The single outbound-request path.
//!
//! Every call the client makes - auth, catalog, cart, orders - goes through
//! one [`RequestGateway`]. Before send it attaches the stored credential in
//! the service's fixed header scheme; on response it classifies failures
//! into the [`ApiError`] taxonomy. A credential rejection triggers forced
//! session teardown here, centrally and at most once per rejection storm,
//! regardless of which call saw it - individual callers never handle it.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, FieldErrors};
use crate::session::{SessionContext, SessionStore};

/// Fixed authorization scheme of the commerce service:
/// `Authorization: Token <credential>`.
pub const AUTH_SCHEME: &str = "Token";

/// Capacity of the auth event channel.
const AUTH_EVENT_CAPACITY: usize = 8;

/// Session-level events published by the gateway. Long-lived screens
/// subscribe and treat [`AuthEvent::SessionRevoked`] as "navigate to the
/// login screen".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// The service rejected the credential; the session has been cleared.
    SessionRevoked,
}

/// Attaches credentials to every outbound request and intercepts
/// unauthorized responses to force session teardown.
#[derive(Clone)]
pub struct RequestGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    http: reqwest::Client,
    base_url: Url,
    store: SessionStore,
    context: SessionContext,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl RequestGateway {
    /// Create a gateway over the shared store and this context.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        store: SessionStore,
        context: SessionContext,
    ) -> Result<Self, ApiError> {
        let (auth_events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            inner: Arc::new(GatewayInner {
                http,
                base_url: config.api_base_url.clone(),
                store,
                context,
                auth_events,
            }),
        })
    }

    /// Subscribe to session-level events (forced teardowns).
    #[must_use]
    pub fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.auth_events.subscribe()
    }

    // =========================================================================
    // Typed request helpers
    // =========================================================================

    /// `GET` a JSON response of a known shape.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` for transport, service, or decode failures.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, Body::Empty).await?;
        Self::decode(response).await
    }

    /// `GET` a JSON response whose shape is inspected by the caller (used
    /// for shape-tolerant listings).
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` for transport, service, or decode failures.
    pub async fn get_value(&self, path: &str) -> Result<serde_json::Value, ApiError> {
        self.get_json(path).await
    }

    /// `POST` a JSON body and decode a JSON response.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` for transport, service, or decode failures.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
        let response = self.send(Method::POST, path, Body::Json(body)).await?;
        Self::decode(response).await
    }

    /// `POST` a JSON body, ignoring the response body.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` for transport or service failures.
    pub async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
        self.send(Method::POST, path, Body::Json(body)).await?;
        Ok(())
    }

    /// `PATCH` a JSON body, ignoring the response body.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` for transport or service failures.
    pub async fn patch_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
        self.send(Method::PATCH, path, Body::Json(body)).await?;
        Ok(())
    }

    /// `DELETE`, ignoring the response body.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` for transport or service failures.
    pub async fn delete_unit(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, Body::Empty).await?;
        Ok(())
    }

    /// `POST` a multipart form (catalog uploads) and decode a JSON
    /// response.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` for transport, service, or decode failures.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::POST, path, Body::Multipart(form)).await?;
        Self::decode(response).await
    }

    // =========================================================================
    // The interception point
    // =========================================================================

    /// Build, authorize, send, and classify one request.
    #[instrument(skip(self, body), fields(method = %method, path = %path))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Body,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self
            .inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::Url(format!("{path}: {e}")))?;

        let mut request = self.inner.http.request(method, url);

        // Attach the stored credential, if any; anonymous calls go out bare
        if let Some(session) = self.inner.store.load() {
            request = request.header(
                AUTHORIZATION,
                format!("{AUTH_SCHEME} {}", session.credential()),
            );
        }

        request = match body {
            Body::Empty => request,
            Body::Json(value) => request.json(&value),
            Body::Multipart(form) => request.multipart(form),
        };

        let response = request.send().await?;
        self.check(response).await
    }

    /// Classify the response status. Success passes through; a credential
    /// rejection tears the session down before returning.
    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.force_teardown();
            return Err(ApiError::Unauthorized);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, retry_after, &body))
    }

    /// Atomically clear the persisted session and this context's identity,
    /// and publish the revocation. `clear_if_present` resolves concurrent
    /// rejections to a single winner, so the clear and the event fire at
    /// most once per rejection storm.
    fn force_teardown(&self) {
        if self.inner.store.clear_if_present() {
            self.inner.context.set(None);
            let _ = self.inner.auth_events.send(AuthEvent::SessionRevoked);
            tracing::warn!("credential rejected; session cleared");
        } else {
            debug!("credential rejected on an already-cleared session");
        }
    }

    /// Read and decode a successful response, reading text first for
    /// better diagnostics on shape mismatches.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "failed to decode response"
            );
            ApiError::Malformed(e.to_string())
        })
    }
}

/// Outbound request body variants.
enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(reqwest::multipart::Form),
}

/// Map a non-success, non-401 status and its body to an error class.
/// Pure so the taxonomy is testable without I/O.
fn classify_failure(status: StatusCode, retry_after: Option<u64>, body: &str) -> ApiError {
    match status {
        StatusCode::BAD_REQUEST => {
            let errors = FieldErrors::from_body(body);
            if errors.is_empty() {
                let mut fallback = FieldErrors::default();
                fallback.push_general("Invalid request");
                ApiError::Validation(fallback)
            } else {
                ApiError::Validation(errors)
            }
        }
        StatusCode::FORBIDDEN => {
            let detail = FieldErrors::from_body(body)
                .general
                .first()
                .cloned()
                .unwrap_or_else(|| "permission denied".to_string());
            ApiError::PermissionDenied(detail)
        }
        StatusCode::NOT_FOUND => ApiError::NotFound(
            FieldErrors::from_body(body)
                .general
                .first()
                .cloned()
                .unwrap_or_else(|| "resource not found".to_string()),
        ),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited(retry_after.unwrap_or(1)),
        status => ApiError::Server(status.as_u16()),
    }
}
