//! Notification collaborator.
//!
//! The coordinator emits one summary notification per user-visible operation.
//! `ToastQueue` holds them for the desktop panel, `TracingNotifier` sends them
//! to the log.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub detail: String,
}

impl Notification {
    pub fn success(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            detail: detail.into(),
        }
    }

    pub fn error(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.into(),
            detail: detail.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log only.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => {
                tracing::info!(title = %notification.title, "{}", notification.detail)
            }
            NotificationKind::Error => {
                tracing::warn!(title = %notification.title, "{}", notification.detail)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub notification: Notification,
    pub shown_at: Instant,
}

/// Notifications waiting to be drawn, each visible for `lifetime`.
#[derive(Debug)]
pub struct ToastQueue {
    lifetime: Duration,
    toasts: Mutex<VecDeque<Toast>>,
}

impl ToastQueue {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            toasts: Mutex::new(VecDeque::new()),
        }
    }

    /// Drops expired toasts and returns the rest, oldest first.
    pub fn active(&self, now: Instant) -> Vec<Toast> {
        let mut toasts = self.toasts.lock();
        toasts.retain(|toast| now.saturating_duration_since(toast.shown_at) < self.lifetime);
        toasts.iter().cloned().collect()
    }

    pub fn dismiss(&self, index: usize) {
        let mut toasts = self.toasts.lock();
        if index < toasts.len() {
            toasts.remove(index);
        }
    }

    pub fn len(&self) -> usize {
        self.toasts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.lock().is_empty()
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, notification: Notification) {
        TracingNotifier.notify(notification.clone());
        self.toasts.lock().push_back(Toast {
            notification,
            shown_at: Instant::now(),
        });
    }
}
