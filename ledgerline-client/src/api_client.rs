//! API client layer for REST and WebSocket connections.

use crate::cache::lock::{rw_read, rw_write};
use crate::config::{ClientConfig, ConfigError, ReconnectConfig};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const COMPANY_HEADER: &str = "x-company-id";

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A REST call relative to the API origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Patch, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = (!body.is_null()).then_some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Status half of an [`ApiError`]: an HTTP code or a client-side marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    Http(u16),
    /// The request never produced a response.
    FetchError,
    /// A 2xx response whose body was not valid JSON.
    ParsingError,
    /// The request could not be built from the given arguments.
    CustomError,
}

impl Serialize for ErrorStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ErrorStatus::Http(code) => serializer.serialize_u16(*code),
            ErrorStatus::FetchError => serializer.serialize_str("FETCH_ERROR"),
            ErrorStatus::ParsingError => serializer.serialize_str("PARSING_ERROR"),
            ErrorStatus::CustomError => serializer.serialize_str("CUSTOM_ERROR"),
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorStatus::Http(code) => write!(f, "HTTP {code}"),
            ErrorStatus::FetchError => f.write_str("FETCH_ERROR"),
            ErrorStatus::ParsingError => f.write_str("PARSING_ERROR"),
            ErrorStatus::CustomError => f.write_str("CUSTOM_ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Transport,
    Validation,
    Unauthorized,
    Server,
    Parsing,
    InvalidArguments,
}

/// Error surfaced to callers as `{status, data}`.
///
/// `data` is the decoded response body when there was one, or a string
/// describing the client-side failure.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{status}: {}", self.message())]
pub struct ApiError {
    pub status: ErrorStatus,
    pub data: Value,
}

impl ApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: ErrorStatus::FetchError,
            data: Value::String(message.into()),
        }
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        Self {
            status: ErrorStatus::ParsingError,
            data: Value::String(message.into()),
        }
    }

    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self {
            status: ErrorStatus::CustomError,
            data: Value::String(message.into()),
        }
    }

    pub fn http(status: u16, data: Value) -> Self {
        Self {
            status: ErrorStatus::Http(status),
            data,
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        match self.status {
            ErrorStatus::FetchError => ApiErrorKind::Transport,
            ErrorStatus::ParsingError => ApiErrorKind::Parsing,
            ErrorStatus::CustomError => ApiErrorKind::InvalidArguments,
            ErrorStatus::Http(401) => ApiErrorKind::Unauthorized,
            ErrorStatus::Http(code) if code >= 500 => ApiErrorKind::Server,
            ErrorStatus::Http(_) => ApiErrorKind::Validation,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ApiErrorKind::Unauthorized
    }

    /// Human-readable message: the server's `message`/`error` field when present.
    pub fn message(&self) -> String {
        let from_body = match &self.data {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(map) => ["message", "error"].iter().find_map(|key| match map.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Array(items)) => {
                    let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                    (!parts.is_empty()).then(|| parts.join(", "))
                }
                _ => None,
            }),
            _ => None,
        };
        match (self.kind(), from_body) {
            (ApiErrorKind::Validation | ApiErrorKind::InvalidArguments, Some(message)) => message,
            (ApiErrorKind::Unauthorized, _) => "Your session has expired. Please log in again.".to_string(),
            (ApiErrorKind::Server, _) => "Something went wrong on the server. Please try again.".to_string(),
            (ApiErrorKind::Transport, _) => "Unable to reach the server. Check your connection.".to_string(),
            (ApiErrorKind::Parsing, _) => "The server sent an unexpected response.".to_string(),
            (_, None) => format!("Request failed ({})", self.status),
        }
    }
}

// ============================================================================
// FETCHER
// ============================================================================

/// Executes API requests on behalf of the query cache.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

// ============================================================================
// REST CLIENT
// ============================================================================

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    auth: AuthHeaders,
}

impl RestClient {
    pub fn new(config: &ClientConfig, auth: AuthHeaders) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: e.to_string(),
            })?;
        let base_url = config.api_url()?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn auth(&self) -> &AuthHeaders {
        &self.auth
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self
            .client
            .request(method, &url)
            .headers(self.auth.to_header_map());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(method = %request.method, path = %request.path, error = %e, "Request failed");
            ApiError::transport(e.to_string())
        })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::transport(e.to_string()))?;
        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            "Request completed"
        );

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text).map_err(|e| ApiError::parsing(e.to_string()))
        } else {
            let data = serde_json::from_str(&text).unwrap_or(Value::String(text));
            Err(ApiError::http(status.as_u16(), data))
        }
    }
}

#[async_trait]
impl Fetcher for RestClient {
    async fn fetch(&self, request: ApiRequest) -> Result<Value, ApiError> {
        self.execute(request).await
    }
}

// ============================================================================
// WEBSOCKET CLIENT
// ============================================================================

#[derive(Clone)]
pub struct WsClient {
    endpoint: Url,
    auth: AuthHeaders,
    reconnect: ReconnectConfig,
}

impl WsClient {
    pub fn new(config: &ClientConfig, auth: AuthHeaders) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: config.ws_url()?,
            auth,
            reconnect: config.reconnect.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn auth(&self) -> &AuthHeaders {
        &self.auth
    }

    pub async fn connect(&self) -> Result<WsStream, crate::error::ClientError> {
        let mut request = self.endpoint.as_str().into_client_request()?;
        let headers = request.headers_mut();
        for (name, value) in self.auth.to_header_map().iter() {
            headers.insert(name, value.clone());
        }
        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(stream)
    }

    pub fn reconnect_config(&self) -> &ReconnectConfig {
        &self.reconnect
    }
}

// ============================================================================
// AUTH HEADERS
// ============================================================================

/// Session credentials shared by the REST and WebSocket clients.
///
/// Cloning shares the same underlying slot, so a token stored after login is
/// seen by every client built from this value.
#[derive(Clone, Default)]
pub struct AuthHeaders {
    inner: Arc<RwLock<AuthSlot>>,
}

#[derive(Default)]
struct AuthSlot {
    token: Option<String>,
    company_id: Option<String>,
}

impl AuthHeaders {
    pub fn new(company_id: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(AuthSlot {
                token: None,
                company_id,
            })),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.write().token = Some(token.into());
    }

    pub fn clear_token(&self) {
        self.write().token = None;
    }

    pub fn has_token(&self) -> bool {
        self.read().token.is_some()
    }

    pub fn set_company(&self, company_id: Option<String>) {
        self.write().company_id = company_id;
    }

    pub fn to_header_map(&self) -> HeaderMap {
        let slot = self.read();
        let mut headers = HeaderMap::new();
        if let Some(token) = &slot.token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Session token is not a valid header value"),
            }
        }
        if let Some(company_id) = &slot.company_id {
            if let Ok(value) = HeaderValue::from_str(company_id) {
                headers.insert(HeaderName::from_static(COMPANY_HEADER), value);
            }
        }
        headers
    }

    fn read(&self) -> RwLockReadGuard<'_, AuthSlot> {
        rw_read(&self.inner, "api_client", "auth.read")
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthSlot> {
        rw_write(&self.inner, "api_client", "auth.write")
    }
}
