//! Application state: session, layout flags, notifications and the dashboard
//! snapshot cache.

use crate::api_client::ApiError;
use crate::config::NotificationSettings;
use crate::notifications::{Notification, NotificationCenter, NotificationLevel};
use crate::session::{Session, User};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AppState {
    session: Option<Session>,
    sidebar_open: bool,
    login_required: bool,
    notifications: NotificationCenter,
    dashboard: DashboardCache,
}

impl AppState {
    pub fn new(notifications: &NotificationSettings) -> Self {
        Self {
            session: None,
            sidebar_open: true,
            login_required: false,
            notifications: NotificationCenter::new(notifications),
            dashboard: DashboardCache::default(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|session| &session.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn set_session(&mut self, session: Session) {
        info!(user_id = %session.user.id, "Session established");
        self.session = Some(session);
        self.login_required = false;
    }

    /// Forget the session and everything cached on its behalf.
    pub fn clear_session(&mut self) {
        if self.session.take().is_some() {
            info!("Session cleared");
        }
        self.dashboard.clear();
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn set_sidebar_open(&mut self, open: bool) {
        self.sidebar_open = open;
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_open = !self.sidebar_open;
        self.sidebar_open
    }

    /// Set after an unauthorized response; consumers route to the login screen.
    pub fn login_required(&self) -> bool {
        self.login_required
    }

    /// Read and reset the login-required flag.
    pub fn take_login_required(&mut self) -> bool {
        std::mem::take(&mut self.login_required)
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) -> Uuid {
        self.notifications.notify(level, message)
    }

    /// Turn an API failure into a notification. An unauthorized response also
    /// ends the session and raises the login-required flag.
    pub fn report_error(&mut self, error: &ApiError) -> Uuid {
        if error.is_unauthorized() {
            warn!(status = %error.status, "Session rejected by server");
            self.clear_session();
            self.login_required = true;
        }
        self.notifications.push(Notification::from_api_error(error))
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationCenter {
        &mut self.notifications
    }

    pub fn dashboard(&self) -> &DashboardCache {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut DashboardCache {
        &mut self.dashboard
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub data: Value,
    pub captured_at: DateTime<Utc>,
}

/// Last dashboard payload per range key (`"today"`, `"30d"`, ...), kept so a
/// range switch can render immediately while the fresh figures load.
#[derive(Debug, Clone, Default)]
pub struct DashboardCache {
    snapshots: HashMap<String, DashboardSnapshot>,
}

impl DashboardCache {
    pub fn store(&mut self, key: impl Into<String>, data: Value) {
        self.store_at(key, data, Utc::now());
    }

    pub fn store_at(&mut self, key: impl Into<String>, data: Value, captured_at: DateTime<Utc>) {
        self.snapshots
            .insert(key.into(), DashboardSnapshot { data, captured_at });
    }

    pub fn get(&self, key: &str) -> Option<&DashboardSnapshot> {
        self.snapshots.get(key)
    }

    /// Snapshot no older than `max_age` at `now`.
    pub fn fresh(&self, key: &str, max_age: Duration, now: DateTime<Utc>) -> Option<&DashboardSnapshot> {
        self.get(key)
            .filter(|snapshot| now.signed_duration_since(snapshot.captured_at) <= max_age)
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
