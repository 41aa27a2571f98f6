//! Transient user-facing notifications.

use crate::api_client::{ApiError, ApiErrorKind};
use crate::config::NotificationSettings;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    Retry,
    Reconnect,
    Login,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub action: Option<NotificationAction>,
    pub created_at: DateTime<Utc>,
    /// `None` keeps the notification until dismissed.
    pub auto_hide_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            level,
            message: message.into(),
            action: None,
            created_at: Utc::now(),
            auto_hide_at: None,
        }
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Map an API failure to a notification with a suggested follow-up.
    pub fn from_api_error(error: &ApiError) -> Self {
        let action = match error.kind() {
            ApiErrorKind::Unauthorized => Some(NotificationAction::Login),
            ApiErrorKind::Transport => Some(NotificationAction::Reconnect),
            ApiErrorKind::Server => Some(NotificationAction::Retry),
            ApiErrorKind::Validation | ApiErrorKind::Parsing | ApiErrorKind::InvalidArguments => None,
        };
        let notification = Self::new(NotificationLevel::Error, error.message());
        match action {
            Some(action) => notification.with_action(action),
            None => notification,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.auto_hide_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Bounded queue of notifications; the oldest is evicted when full.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    items: VecDeque<Notification>,
    max_visible: usize,
    auto_hide: Option<Duration>,
}

impl NotificationCenter {
    pub fn new(settings: &NotificationSettings) -> Self {
        let auto_hide = i64::try_from(settings.auto_hide_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .and_then(Duration::try_milliseconds);
        Self {
            items: VecDeque::new(),
            max_visible: settings.max_visible.max(1),
            auto_hide,
        }
    }

    /// Queue a notification. Errors stay until dismissed; everything else
    /// hides after the configured delay. Returns the notification id.
    pub fn push(&mut self, mut notification: Notification) -> Uuid {
        if notification.auto_hide_at.is_none() && notification.level != NotificationLevel::Error {
            notification.auto_hide_at = self.auto_hide.map(|delay| notification.created_at + delay);
        }
        let id = notification.id;
        self.items.push_back(notification);
        while self.items.len() > self.max_visible {
            self.items.pop_front();
        }
        id
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) -> Uuid {
        self.push(Notification::new(level, message))
    }

    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Drop notifications whose auto-hide deadline has passed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !item.is_expired(now));
        before - self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn visible(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn center(max_visible: usize, auto_hide_ms: u64) -> NotificationCenter {
        NotificationCenter::new(&NotificationSettings {
            max_visible,
            auto_hide_ms,
        })
    }

    #[test]
    fn oldest_notification_is_evicted() {
        let mut center = center(2, 0);
        center.notify(NotificationLevel::Info, "one");
        center.notify(NotificationLevel::Info, "two");
        center.notify(NotificationLevel::Info, "three");
        let messages: Vec<&str> = center.visible().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, ["two", "three"]);
    }

    #[test]
    fn errors_do_not_auto_hide() {
        let mut center = center(5, 1_000);
        center.notify(NotificationLevel::Success, "saved");
        center.notify(NotificationLevel::Error, "failed");

        let later = Utc::now() + Duration::seconds(5);
        assert_eq!(center.expire(later), 1);
        assert_eq!(center.visible().next().unwrap().message, "failed");
    }

    #[test]
    fn dismiss_by_id() {
        let mut center = center(5, 0);
        let id = center.notify(NotificationLevel::Warning, "low stock");
        assert!(center.dismiss(id));
        assert!(!center.dismiss(id));
        assert!(center.is_empty());
    }

    #[test]
    fn api_errors_suggest_actions() {
        let n = Notification::from_api_error(&ApiError::http(401, json!({})));
        assert_eq!(n.action, Some(NotificationAction::Login));

        let n = Notification::from_api_error(&ApiError::http(422, json!({ "message": "Insufficient stock" })));
        assert_eq!(n.message, "Insufficient stock");
        assert_eq!(n.action, None);
        assert_eq!(n.level, NotificationLevel::Error);
    }
}
