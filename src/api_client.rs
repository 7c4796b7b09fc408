use crate::config::{normalize_base_url, ClientConfig};
use crate::error::{ClientError, ClientResult};
use crate::session_store::{read_token, MemorySessionStore, SharedSessionStore, ACCESS_TOKEN_KEY};
use crate::token_refresh::refresh_after_unauthorized;
use crate::validation::{validate_base_url, validate_endpoint};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use zeroize::Zeroize;

pub const JSON_CONTENT_TYPE: &str = "application/json";
const RETRY_FAILED_MESSAGE: &str = "Request failed after token refresh";

/// Method, JSON body and extra headers for one call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ClientResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Adds a header. A name matching a default header replaces it.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// How the bearer header is attached to an outgoing call.
#[derive(Clone, Copy)]
enum Bearer<'a> {
    None,
    /// Stored token; caller headers may still override it.
    Default(&'a str),
    /// Freshly refreshed token; always wins.
    Forced(&'a str),
}

/// The explicit shape of [`ApiClient::request`]: at most one refresh and
/// one retry per call.
enum RequestFlow {
    Initial,
    Refreshing,
    RetryOnce { access_token: String },
}

#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    /// `None` when the body was empty or not JSON.
    pub body: Option<Value>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    fn server_message(&self) -> Option<String> {
        self.body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }

    pub fn into_result<T: DeserializeOwned>(self, fallback: Option<&str>) -> ClientResult<T> {
        if !self.is_success() {
            let status = self.status.as_u16();
            let message = self.server_message().unwrap_or_else(|| match fallback {
                Some(text) => text.to_string(),
                None => build_error_message(status),
            });
            return Err(ClientError::Request { status, message });
        }
        let body = self.body.ok_or_else(|| {
            ClientError::Decode(format!(
                "Backend returned non-JSON response (HTTP {})",
                self.status.as_u16()
            ))
        })?;
        serde_json::from_value(body).map_err(ClientError::from)
    }
}

pub(crate) fn build_error_message(status: u16) -> String {
    match status {
        400 => "Request rejected by backend (HTTP 400)".to_string(),
        401 => "Authentication required (HTTP 401)".to_string(),
        403 => "Permission denied by backend (HTTP 403)".to_string(),
        404 => "Backend endpoint not found (HTTP 404)".to_string(),
        409 => "Request conflicts with current state (HTTP 409)".to_string(),
        429 => "Backend rate limit exceeded (HTTP 429)".to_string(),
        500..=599 => format!("Backend server error (HTTP {status})"),
        _ => format!("Request failed (HTTP {status})"),
    }
}

/// Percent-encodes one path segment or query value.
pub(crate) fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 2);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push(HEX_UPPER[(b >> 4) as usize] as char);
                out.push(HEX_UPPER[(b & 0xf) as usize] as char);
            }
        }
    }
    out
}

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// `?k=v&...` for the given pairs, or an empty string when there are none.
pub(crate) fn build_query(pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("?{joined}")
}

/// JSON client for the ZeeFit REST backend.
///
/// Every call reads the access token from the injected session store at the
/// moment it is issued. A 401 triggers one refresh through `/auth/refresh`
/// followed by exactly one retry; see [`ApiClient::request`].
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use zeefit_client::{ApiClient, MemorySessionStore};
///
/// # async fn example() -> zeefit_client::ClientResult<()> {
/// let client = ApiClient::builder()
///     .base_url("http://localhost:3010/api")
///     .session_store(Arc::new(MemorySessionStore::new()))
///     .build()?;
/// let me = client.get_current_user().await?;
/// println!("{:?}", me.data);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    store: SharedSessionStore,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    pub fn from_config(config: &ClientConfig, store: SharedSessionStore) -> ClientResult<Self> {
        ApiClientBuilder::new()
            .config(config)
            .session_store(store)
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_store(&self) -> &SharedSessionStore {
        &self.store
    }

    /// Issues an authenticated request and decodes the JSON body into `T`.
    ///
    /// - 2xx: the decoded body.
    /// - 401: one refresh, then one retry with the new access token. A
    ///   missing refresh token or a failed refresh clears the session and
    ///   yields [`ClientError::AuthenticationFailed`]. A failing retry is
    ///   returned as-is; it never triggers a second refresh.
    /// - other statuses: [`ClientError::Request`] with the server message.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ClientResult<T> {
        validate_endpoint(endpoint).map_err(ClientError::Validation)?;

        let mut flow = RequestFlow::Initial;
        loop {
            flow = match flow {
                RequestFlow::Initial => {
                    let token = read_token(self.store.as_ref(), ACCESS_TOKEN_KEY);
                    let bearer = token.as_deref().map_or(Bearer::None, Bearer::Default);
                    let raw = self.execute(endpoint, &options, bearer).await?;
                    if raw.status != StatusCode::UNAUTHORIZED {
                        return raw.into_result(None);
                    }
                    tracing::debug!(endpoint, "access token rejected, refreshing session");
                    RequestFlow::Refreshing
                }
                RequestFlow::Refreshing => {
                    let access_token = refresh_after_unauthorized(self).await?;
                    RequestFlow::RetryOnce { access_token }
                }
                RequestFlow::RetryOnce { mut access_token } => {
                    let result = self
                        .execute(endpoint, &options, Bearer::Forced(&access_token))
                        .await;
                    access_token.zeroize();
                    let raw = result?;
                    if !raw.is_success() {
                        tracing::warn!(
                            endpoint,
                            status = raw.status.as_u16(),
                            "request still failing after token refresh"
                        );
                    }
                    return raw.into_result(Some(RETRY_FAILED_MESSAGE));
                }
            };
        }
    }

    /// [`request`](Self::request) without a typed body.
    pub async fn request_value(&self, endpoint: &str, options: RequestOptions) -> ClientResult<Value> {
        self.request(endpoint, options).await
    }

    /// A call that never carries a bearer token and never refreshes.
    pub(crate) async fn public_request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ClientResult<T> {
        validate_endpoint(endpoint).map_err(ClientError::Validation)?;
        self.execute(endpoint, &options, Bearer::None)
            .await?
            .into_result(None)
    }

    pub(crate) async fn public_post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ClientResult<RawResponse> {
        let options = RequestOptions::post().json(body)?;
        self.execute(endpoint, &options, Bearer::None).await
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn build_headers(options: &RequestOptions, bearer: Bearer<'_>) -> ClientResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        if let Bearer::Default(token) = bearer {
            headers.insert(AUTHORIZATION, bearer_value(token)?);
        }

        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::Validation(format!("Invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::Validation(format!("Invalid value for header '{name}': {e}")))?;
            headers.insert(name, value);
        }

        if let Bearer::Forced(token) = bearer {
            headers.insert(AUTHORIZATION, bearer_value(token)?);
        }
        Ok(headers)
    }

    async fn execute(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        bearer: Bearer<'_>,
    ) -> ClientResult<RawResponse> {
        let url = self.url(endpoint);
        let headers = Self::build_headers(options, bearer)?;

        let mut builder = self
            .http
            .request(options.method.clone(), &url)
            .headers(headers);
        if let Some(body) = &options.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(method = %options.method, endpoint, "request failed: {e}");
            ClientError::Transport(e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(ClientError::ResponseBody)?;
        tracing::debug!(
            method = %options.method,
            endpoint,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backend responded"
        );

        let body = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str::<Value>(&text).ok()
        };
        Ok(RawResponse { status, body })
    }
}

fn bearer_value(token: &str) -> ClientResult<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| ClientError::Validation(format!("Invalid authorization header: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
    store: Option<SharedSessionStore>,
}

impl ApiClientBuilder {
    fn new() -> Self {
        let defaults = ClientConfig::default();
        Self {
            base_url: None,
            timeout: defaults.request_timeout,
            user_agent: None,
            store: None,
        }
    }

    /// Takes base URL, timeout and user agent from `config`.
    pub fn config(mut self, config: &ClientConfig) -> Self {
        self.base_url = Some(config.api_base_url.clone());
        self.timeout = config.request_timeout;
        self.user_agent = Some(format!("{}/{}", config.app_name, config.app_version));
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Where session credentials are read from and written to. Defaults to
    /// a fresh [`MemorySessionStore`].
    pub fn session_store(mut self, store: SharedSessionStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> ClientResult<ApiClient> {
        let base_url = self
            .base_url
            .map(|u| normalize_base_url(&u))
            .ok_or_else(|| ClientError::Config("base_url is required".into()))?;
        validate_base_url(&base_url).map_err(ClientError::Config)?;

        let mut http = reqwest::Client::builder().timeout(self.timeout);
        if let Some(agent) = self.user_agent {
            http = http.user_agent(agent);
        }
        let http = http
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(ApiClient {
            base_url,
            http,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn builder_requires_base_url() {
        let err = ApiClient::builder().build().unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let client = ApiClient::builder()
            .base_url("http://localhost:3010/api/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:3010/api");
        assert_eq!(client.url("/users/me"), "http://localhost:3010/api/users/me");
    }

    #[test]
    fn headers_without_token_have_no_authorization() {
        let headers = ApiClient::build_headers(&RequestOptions::get(), Bearer::None).unwrap();
        assert_eq!(header(&headers, "content-type"), Some(JSON_CONTENT_TYPE));
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn headers_with_token_carry_bearer() {
        let headers = ApiClient::build_headers(&RequestOptions::get(), Bearer::Default("tok")).unwrap();
        assert_eq!(header(&headers, "authorization"), Some("Bearer tok"));
    }

    #[test]
    fn caller_headers_merge_and_may_replace_defaults() {
        let options = RequestOptions::get()
            .header("X-Client", "cli")
            .header("Authorization", "Bearer caller");
        let headers = ApiClient::build_headers(&options, Bearer::Default("stored")).unwrap();
        assert_eq!(header(&headers, "x-client"), Some("cli"));
        assert_eq!(header(&headers, "authorization"), Some("Bearer caller"));
        assert_eq!(header(&headers, "content-type"), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn forced_bearer_wins_over_caller_header() {
        let options = RequestOptions::get().header("Authorization", "Bearer caller");
        let headers = ApiClient::build_headers(&options, Bearer::Forced("fresh")).unwrap();
        assert_eq!(header(&headers, "authorization"), Some("Bearer fresh"));
    }

    #[test]
    fn invalid_header_name_is_a_validation_error() {
        let options = RequestOptions::get().header("bad header", "x");
        let err = ApiClient::build_headers(&options, Bearer::None).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn error_uses_server_message_then_fallbacks() {
        let raw = RawResponse {
            status: StatusCode::CONFLICT,
            body: Some(json!({ "message": "Already joined", "status_code": 409 })),
        };
        let err = raw.into_result::<Value>(None).unwrap_err();
        assert_eq!(err.to_string(), "Already joined");

        let raw = RawResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: None,
        };
        let err = raw.into_result::<Value>(None).unwrap_err();
        assert_eq!(err.to_string(), "Backend server error (HTTP 500)");

        let raw = RawResponse {
            status: StatusCode::FORBIDDEN,
            body: Some(json!({ "message": "" })),
        };
        let err = raw.into_result::<Value>(Some(RETRY_FAILED_MESSAGE)).unwrap_err();
        assert_eq!(err.to_string(), RETRY_FAILED_MESSAGE);
    }

    #[test]
    fn success_without_json_is_a_decode_error() {
        let raw = RawResponse {
            status: StatusCode::OK,
            body: None,
        };
        let err = raw.into_result::<Value>(None).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn query_only_includes_set_pairs() {
        assert_eq!(build_query(&[]), "");
        assert_eq!(
            build_query(&[("status", "active".into()), ("page", "1".into())]),
            "?status=active&page=1"
        );
        assert_eq!(build_query(&[("status", "a b&c".into())]), "?status=a%20b%26c");
    }

    #[test]
    fn encode_component_escapes_reserved_bytes() {
        assert_eq!(encode_component("abc-123_~."), "abc-123_~.");
        assert_eq!(encode_component("a/b?c"), "a%2Fb%3Fc");
    }
}
