//! Request gateway: the only path from the client to the backend.
//!
//! Every request picks up the current access credential from the
//! `SessionStore`. When the backend answers 401 the gateway renews the
//! credential with the refresh token and replays the request exactly once.
//! Renewal is single-flight: concurrent requests that hit the same expired
//! credential wait for one renewal and then reuse its result.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::SessionStore;
use crate::config::Config;

use super::request::{build_form, RequestBody};
use super::{ApiError, PendingRequest};

/// Renewal endpoint, relative to the API base URL
const REFRESH_PATH: &str = "users/refresh/";

#[derive(Debug, Deserialize)]
struct RenewalResponse {
    access: String,
    /// Present only when the backend rotates refresh tokens
    refresh: Option<String>,
}

/// Clone is cheap - the connection pool, session store and renewal guard
/// are all shared.
#[derive(Clone)]
pub struct Gateway {
    client: Client,
    base_url: Url,
    session: Arc<SessionStore>,
    renewal: Arc<Mutex<()>>,
}

impl Gateway {
    pub fn new(config: &Config, session: Arc<SessionStore>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            session,
            renewal: Arc::new(Mutex::new(())),
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send a request, renewing the access credential once if it has expired.
    ///
    /// Any non-401 success is returned untouched; other failures are mapped to
    /// `ApiError` and never retried.
    pub async fn send(&self, mut request: PendingRequest) -> Result<Response, ApiError> {
        let attached = if request.authenticated {
            self.session.access_credential()
        } else {
            None
        };

        let response = self.dispatch(&request, attached.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check_response(response).await;
        }

        if !request.authenticated || request.retried {
            debug!(path = %request.path, retried = request.retried, "401 not eligible for renewal");
            return Err(ApiError::Unauthorized);
        }

        let Some(rejected) = attached else {
            debug!(path = %request.path, "401 without a session");
            return Err(ApiError::Unauthorized);
        };

        request.retried = true;
        let renewed = self.renew(&rejected).await?;

        let response = self.dispatch(&request, Some(&renewed)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(path = %request.path, "Rejected again after renewal");
            return Err(ApiError::Unauthorized);
        }
        Self::check_response(response).await
    }

    /// Send and decode a JSON body
    pub async fn send_json<T: DeserializeOwned>(&self, request: PendingRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", path, e)))
    }

    /// Send and discard the body (e.g. 204 from a delete)
    pub async fn send_empty(&self, request: PendingRequest) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {}", path, e)))
    }

    async fn dispatch(&self, request: &PendingRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let url = self.url(&request.path)?;
        debug!(method = %request.method, %url, authenticated = token.is_some(), retried = request.retried, "Dispatching");

        let mut builder = self.client.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            Some(RequestBody::Json(ref body)) => builder.json(body),
            Some(RequestBody::Form(ref parts)) => builder.multipart(
                build_form(parts).map_err(|e| ApiError::InvalidRequest(format!("{}: {}", request.path, e)))?,
            ),
            None => builder,
        };
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        Ok(builder.send().await?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Obtain a fresh access credential to replace `rejected`.
    ///
    /// Only one renewal runs at a time. A caller that waited behind another
    /// renewal finds the store already holding a different credential and
    /// uses it without asking the backend again.
    async fn renew(&self, rejected: &str) -> Result<String, ApiError> {
        let _guard = self.renewal.lock().await;

        let Some(current) = self.session.snapshot() else {
            debug!("Session ended while waiting for renewal");
            return Err(ApiError::SessionInvalidated);
        };

        if current.access != rejected {
            debug!("Credential already renewed by a concurrent request");
            return Ok(current.access);
        }

        match self.request_renewal(&current.refresh).await {
            Ok(renewal) => {
                let rotated = renewal.refresh.is_some();
                if !self
                    .session
                    .replace_credentials(renewal.access.clone(), renewal.refresh)
                {
                    return Err(ApiError::SessionInvalidated);
                }
                info!(rotated, "Access credential renewed");
                Ok(renewal.access)
            }
            Err(e) => {
                warn!(error = %e, "Credential renewal failed");
                self.session.invalidate();
                Err(ApiError::SessionInvalidated)
            }
        }
    }

    async fn request_renewal(&self, refresh: &str) -> Result<RenewalResponse, ApiError> {
        let url = self.url(REFRESH_PATH)?;
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "refresh": refresh }))
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse renewal response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStorage;

    fn gateway(base: &str) -> Gateway {
        let config = Config {
            api_base_url: base.to_string(),
            ..Config::default()
        };
        Gateway::new(&config, Arc::new(SessionStore::open(MemoryStorage::new()))).unwrap()
    }

    #[test]
    fn test_url_joins_under_base() {
        let gateway = gateway("http://localhost:8000/api");
        assert_eq!(
            gateway.url("products/categories/").unwrap().as_str(),
            "http://localhost:8000/api/products/categories/"
        );
        // A leading slash stays under the API prefix
        assert_eq!(
            gateway.url("/orders/my/").unwrap().as_str(),
            "http://localhost:8000/api/orders/my/"
        );
    }

    #[test]
    fn test_renewal_response_without_rotation() {
        let renewal: RenewalResponse = serde_json::from_str(r#"{"access": "A2"}"#).unwrap();
        assert_eq!(renewal.access, "A2");
        assert!(renewal.refresh.is_none());
    }
}
