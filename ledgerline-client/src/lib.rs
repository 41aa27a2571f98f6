//! Ledgerline Client - REST Client, Query Cache and Realtime Listener
//!
//! [`LedgerClient`] wires the pieces together: a configured REST client feeds
//! a tag-invalidated [`QueryCache`], mutations invalidate the tags they touch,
//! and while a session is active a [`RealtimeListener`] applies the server's
//! push events to the same cache.
//!
//! ```no_run
//! use ledgerline_client::{endpoints::accounts, ClientConfig, LedgerClient};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), ledgerline_client::ClientError> {
//! let client = LedgerClient::new(ClientConfig::load()?)?;
//! client.login("ops@acme.test", "secret").await?;
//!
//! let mut accounts = client.query(&accounts::GET_ACCOUNTS, json!({ "page": 1 }));
//! let state = accounts.settled().await;
//! println!("{:?}", state.data);
//! # Ok(())
//! # }
//! ```

pub mod api_client;
pub mod cache;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod notifications;
pub mod realtime;
pub mod session;
pub mod state;
pub mod telemetry;

pub use api_client::{ApiError, ApiErrorKind, ApiRequest, AuthHeaders, ErrorStatus, Fetcher, Method, RestClient, WsClient};
pub use cache::{Mutation, MutationEndpoint, QueryCache, QueryEndpoint, QueryHandle, QueryState, QueryStatus};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, ClientResult};
pub use realtime::{ConnectionState, ListenerHandle, RealtimeListener};
pub use session::{Session, User, UserRole};
pub use state::AppState;

use crate::cache::lock::{mutex_lock, rw_read, rw_write};
use crate::endpoints::auth;
use crate::session::LoginResponse;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// Client facade: configuration, session, cache and realtime listener.
pub struct LedgerClient {
    config: ClientConfig,
    auth: AuthHeaders,
    cache: QueryCache,
    listener: RealtimeListener,
    realtime: Mutex<Option<ListenerHandle>>,
    state: RwLock<AppState>,
}

impl LedgerClient {
    /// Build a client talking to the configured API over HTTP.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let auth = AuthHeaders::new(config.company_id.clone());
        let rest = RestClient::new(&config, auth.clone())?;
        Self::assemble(config, auth, Arc::new(rest))
    }

    /// Build a client whose cache uses `fetcher` instead of HTTP. The realtime
    /// listener still connects to the configured endpoint.
    pub fn with_fetcher(config: ClientConfig, fetcher: Arc<dyn Fetcher>) -> ClientResult<Self> {
        config.validate()?;
        let auth = AuthHeaders::new(config.company_id.clone());
        Self::assemble(config, auth, fetcher)
    }

    fn assemble(config: ClientConfig, auth: AuthHeaders, fetcher: Arc<dyn Fetcher>) -> ClientResult<Self> {
        let ws = WsClient::new(&config, auth.clone())?;
        let cache = QueryCache::new(fetcher, config.cache.keep_unused_for());
        let listener = RealtimeListener::new(ws, cache.clone());
        let state = AppState::new(&config.notifications);
        Ok(Self {
            config,
            auth,
            cache,
            listener,
            realtime: Mutex::new(None),
            state: RwLock::new(state),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn state(&self) -> RwLockReadGuard<'_, AppState> {
        rw_read(&self.state, "client", "state.read")
    }

    pub fn state_mut(&self) -> RwLockWriteGuard<'_, AppState> {
        rw_write(&self.state, "client", "state.write")
    }

    /// Authenticate, store the session and start the realtime listener.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let response = self
            .cache
            .mutation(&auth::LOGIN)
            .trigger(json!({ "email": email, "password": password }))
            .await?;
        let response: LoginResponse = serde_json::from_value(response)?;
        let session = Session::from(response);
        self.establish(session.clone());
        Ok(session)
    }

    /// Resume a session obtained earlier (for example from secure storage).
    /// Must be called from within a tokio runtime for realtime to start.
    pub fn restore_session(&self, session: Session) {
        self.establish(session);
    }

    /// End the session. The server-side logout is best effort; local state is
    /// cleared regardless.
    pub async fn logout(&self) {
        if self.auth.has_token() {
            if let Err(err) = self.cache.mutation(&auth::LOGOUT).trigger(Value::Null).await {
                warn!(status = %err.status, "Server-side logout failed");
            }
        }
        self.teardown();
        self.state_mut().clear_session();
        info!("Logged out");
    }

    pub fn query(&self, endpoint: &QueryEndpoint, args: Value) -> QueryHandle {
        self.cache.query(endpoint, args)
    }

    /// Run a mutation, reporting failures to the app state.
    pub async fn mutate(&self, endpoint: &MutationEndpoint, args: Value) -> Result<Value, ApiError> {
        let result = self.cache.mutation(endpoint).trigger(args).await;
        if let Err(err) = &result {
            self.report_error(err);
        }
        result
    }

    /// Record an API failure. An unauthorized response ends the session.
    pub fn report_error(&self, error: &ApiError) {
        if error.is_unauthorized() {
            self.teardown();
        }
        self.state_mut().report_error(error);
    }

    pub fn realtime_state(&self) -> ConnectionState {
        mutex_lock(&self.realtime, "client", "realtime.state")
            .as_ref()
            .map_or(ConnectionState::Disconnected, ListenerHandle::state)
    }

    fn establish(&self, session: Session) {
        self.auth.set_token(session.token.as_str());
        if self.config.company_id.is_none() {
            self.auth.set_company(session.user.company_id.clone());
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(_) => self.listener.attach(Some(&session)),
            Err(_) => {
                warn!("No async runtime; realtime listener not started");
                None
            }
        };
        // Replacing an old handle drops it, which detaches the old listener.
        *mutex_lock(&self.realtime, "client", "realtime.attach") = handle;
        self.state_mut().set_session(session);
    }

    fn teardown(&self) {
        if let Some(handle) = mutex_lock(&self.realtime, "client", "realtime.detach").take() {
            handle.detach();
        }
        self.auth.clear_token();
        if self.config.company_id.is_none() {
            self.auth.set_company(None);
        }
        self.cache.reset();
    }
}
