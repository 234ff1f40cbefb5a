//! Authenticated request pipeline
//!
//! `ApiClient::request` is the single entry point every call goes through:
//! 1. Read the stored access token and attach it as `Authorization: Bearer`
//! 2. Dispatch and normalize the outcome into a `ResponseEnvelope`
//! 3. On a 401 for a request not yet retried, refresh the token pair once
//!    and re-dispatch with the new access token
//! 4. If the refresh fails, wipe the stored tokens and invoke the login redirect
//!
//! Refreshes are coalesced: a tokio Mutex serializes them, and a request that
//! finds the store already holding a different access token than the one it
//! was rejected with reuses that pair instead of calling the refresh endpoint.

use std::sync::Arc;
use std::time::Duration;

use fleet_auth::{DEFAULT_TIMEOUT_SECS, REFRESH_PATH, RefreshRequest, TokenPair, TokenStore};
use reqwest::header::{
    ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
};
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::envelope::ResponseEnvelope;
use crate::error::{ApiError, Error, Result};
use crate::metrics::{self, RefreshResult};
use crate::redirect::LoginRedirect;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Connection settings for an `ApiClient`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin of the backend, e.g. `https://fleet.example.com`
    pub base_url: String,
    /// Applied to both connect and the whole request
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Per-call knobs for `ApiClient::request`.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Extra headers. Content-Type is always overwritten, and Authorization
    /// is overwritten whenever a stored token is attached.
    pub headers: HeaderMap,
    /// Attach the stored access token
    pub authenticate: bool,
    /// Run the refresh protocol on 401. Ignored when `authenticate` is false.
    pub refresh_on_denied: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            authenticate: true,
            refresh_on_denied: true,
        }
    }
}

impl RequestOptions {
    /// No stored token and no refresh, for login and refresh themselves.
    pub fn unauthenticated() -> Self {
        Self {
            authenticate: false,
            refresh_on_denied: false,
            ..Self::default()
        }
    }

    /// Attach the token but treat a 401 as final.
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_denied = false;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// One logical call. `retried` flips to true at most once.
#[derive(Debug)]
struct ApiRequest {
    method: Method,
    url: Url,
    body: Option<Value>,
    headers: HeaderMap,
    retried: bool,
}

/// HTTP client for the fleet dashboard backend.
///
/// Share it behind an `Arc`; all methods take `&self`.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    redirect: Arc<dyn LoginRedirect>,
    refresh_gate: Mutex<()>,
}

impl ApiClient {
    /// Build a client over the given token store.
    ///
    /// Fails if the base URL is not an absolute `http(s)` URL.
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_owned();
        let parsed = Url::parse(&base_url)
            .map_err(|e| Error::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::InvalidBaseUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        info!(
            base_url = %base_url,
            timeout_ms = config.timeout.as_millis() as u64,
            store = store.backend(),
            "API client ready"
        );

        Ok(Self {
            http,
            base_url,
            store,
            redirect,
            refresh_gate: Mutex::new(()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Currently stored token pair.
    pub async fn tokens(&self) -> fleet_auth::Result<Option<TokenPair>> {
        self.store.load().await
    }

    /// Issue a call and resolve it to an envelope.
    ///
    /// `path` is appended to the base URL unless it already is an absolute
    /// `http(s)` URL. Never returns an `Err`: transport and server failures
    /// come back as `success: false`.
    #[instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> ResponseEnvelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let method_label = method.as_str().to_owned();
        let refresh = options.authenticate && options.refresh_on_denied;

        let envelope = match self.build_request(method, path, body, options.headers) {
            Ok(mut request) => self.execute(&mut request, options.authenticate, refresh).await,
            Err(err) => ResponseEnvelope::failure(err),
        };

        metrics::record_request(&method_label, envelope.outcome());
        envelope
    }

    /// Refresh the token pair now, outside of any failed request.
    ///
    /// Shares the coalescing and failure handling of the automatic refresh,
    /// so a rejected refresh token also clears the session.
    pub async fn refresh(&self) -> ResponseEnvelope<()> {
        let current = match self.store.load().await {
            Ok(pair) => pair.map(|p| p.access_token),
            Err(e) => {
                return ResponseEnvelope::failure(ApiError::unknown(format!(
                    "reading token store: {e}"
                )));
            }
        };
        let envelope = match self.refresh_tokens(current.as_deref()).await {
            Ok(_) => ResponseEnvelope::local(()),
            Err(err) => ResponseEnvelope::failure(err),
        };
        metrics::record_request("POST", envelope.outcome());
        envelope
    }

    fn build_request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        headers: HeaderMap,
    ) -> std::result::Result<ApiRequest, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = resolve_url(&self.base_url, path)?;
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| ApiError::unknown(format!("serializing request body: {e}")))?;
        Ok(ApiRequest {
            method,
            url,
            body,
            headers,
            retried: false,
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: &mut ApiRequest,
        authenticate: bool,
        refresh_on_denied: bool,
    ) -> ResponseEnvelope<T> {
        let access_token = if authenticate {
            match self.store.load().await {
                Ok(pair) => pair.map(|p| p.access_token),
                Err(e) => {
                    return ResponseEnvelope::failure(ApiError::unknown(format!(
                        "reading token store: {e}"
                    )));
                }
            }
        } else {
            None
        };

        let denied = match self.dispatch::<T>(request, access_token.as_deref()).await {
            Err(err) if err.is_auth_denied() && refresh_on_denied && !request.retried => err,
            other => return other.into(),
        };

        request.retried = true;
        debug!(
            url = %request.url,
            message = %denied.message,
            "access token rejected, refreshing"
        );

        match self.refresh_tokens(access_token.as_deref()).await {
            Ok(pair) => self
                .dispatch::<T>(request, Some(&pair.access_token))
                .await
                .into(),
            Err(err) => ResponseEnvelope::failure(err),
        }
    }

    /// Send one HTTP request and classify the outcome.
    #[instrument(skip_all, fields(request_id))]
    async fn dispatch<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> std::result::Result<(u16, T), ApiError> {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let headers = build_headers(&request.headers, access_token, &request_id)?;
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            let err = ApiError::from_transport(&e);
            warn!(code = %err.code, error = %e, "request failed without response");
            err
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            warn!(status = status.as_u16(), error = %e, "failed to read response body");
            ApiError::network(format!("reading response body: {e}")).with_status(status.as_u16())
        })?;

        if !status.is_success() {
            let err = ApiError::from_response(status, &bytes);
            debug!(status = status.as_u16(), code = %err.code, "server rejected request");
            return Err(err);
        }

        let data = decode_body::<T>(&bytes).map_err(|e| {
            warn!(status = status.as_u16(), error = %e, "undecodable response body");
            ApiError::unknown(format!("decoding response body: {e}")).with_status(status.as_u16())
        })?;

        debug!(status = status.as_u16(), "request succeeded");
        Ok((status.as_u16(), data))
    }

    /// Obtain a fresh pair after `stale_access` was rejected.
    ///
    /// Holds the refresh gate for the whole exchange. If the store already
    /// holds a different access token, a concurrent caller rotated the pair
    /// and it is returned without contacting the server.
    async fn refresh_tokens(
        &self,
        stale_access: Option<&str>,
    ) -> std::result::Result<TokenPair, ApiError> {
        let _gate = self.refresh_gate.lock().await;

        let stored = self
            .store
            .load()
            .await
            .map_err(|e| ApiError::unknown(format!("reading token store: {e}")))?;

        match stored {
            Some(pair) if stale_access != Some(pair.access_token.as_str()) => {
                debug!("token pair already rotated by a concurrent request");
                metrics::record_refresh(RefreshResult::Reused);
                Ok(pair)
            }
            Some(pair) => match self.rotate(&pair.refresh_token).await {
                Ok(rotated) => Ok(rotated),
                Err(cause) => Err(self.end_session(cause).await),
            },
            None => {
                let cause = ApiError::unknown("no refresh token stored");
                Err(self.end_session(cause).await)
            }
        }
    }

    /// Exchange a refresh token at the refresh endpoint and persist the result.
    async fn rotate(&self, refresh_token: &str) -> std::result::Result<TokenPair, ApiError> {
        let body = RefreshRequest { refresh_token };
        let request = self.build_request(Method::POST, REFRESH_PATH, Some(&body), HeaderMap::new())?;
        let (_, rotated) = self.dispatch::<TokenPair>(&request, None).await?;

        if let Err(e) = self.store.save(rotated.clone()).await {
            warn!(backend = self.store.backend(), error = %e, "failed to persist refreshed tokens");
        }
        metrics::record_refresh(RefreshResult::Rotated);
        info!("token pair rotated");
        Ok(rotated)
    }

    /// Wipe the session after an irrecoverable refresh failure.
    async fn end_session(&self, cause: ApiError) -> ApiError {
        warn!(
            code = %cause.code,
            status = ?cause.status,
            message = %cause.message,
            "token refresh failed, clearing session"
        );
        if let Err(e) = self.store.clear().await {
            error!(backend = self.store.backend(), error = %e, "failed to clear stored tokens");
        }
        metrics::record_refresh(RefreshResult::Failed);
        self.redirect.redirect_to_login();
        ApiError::refresh_failed(cause)
    }
}

/// Join `path` onto the base URL, or accept an absolute URL as-is.
fn resolve_url(base_url: &str, path: &str) -> std::result::Result<Url, ApiError> {
    let full = if path.starts_with("http://") || path.starts_with("https://") {
        path.to_owned()
    } else if path.starts_with('/') {
        format!("{base_url}{path}")
    } else {
        format!("{base_url}/{path}")
    };
    Url::parse(&full).map_err(|e| ApiError::unknown(format!("invalid request URL {full}: {e}")))
}

/// Final header set for one dispatch.
fn build_headers(
    extra: &HeaderMap,
    access_token: Option<&str>,
    request_id: &str,
) -> std::result::Result<HeaderMap, ApiError> {
    let mut headers = extra.clone();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if !headers.contains_key(ACCEPT) {
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    }

    if let Some(token) = access_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ApiError::unknown(format!("access token is not a valid header: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    let id = HeaderValue::from_str(request_id)
        .map_err(|e| ApiError::unknown(format!("invalid request id: {e}")))?;
    headers.insert(REQUEST_ID_HEADER, id);
    Ok(headers)
}

/// Decode a 2xx body. An empty body decodes as `null`, then as `{}`.
fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return T::deserialize(Value::Null)
            .or_else(|_| T::deserialize(Value::Object(serde_json::Map::new())));
    }
    serde_json::from_slice(bytes)
}
