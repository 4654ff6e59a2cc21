//! Client sessions controlled by the caching layer.
//!
//! [`ClientHost`] abstracts the surrounding platform: skipping the wait for
//! old clients, claiming open sessions, focusing or opening windows, and
//! showing notifications. [`LocalHost`] is the in-process implementation the
//! server runs with.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;

use shellcache_core::Error;

use crate::notify::Notification;

/// An open client window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientWindow {
    pub id: u64,
    /// Currently visible location.
    pub url: String,
    pub focused: bool,
    /// Whether this instance serves the window's requests.
    pub controlled: bool,
}

/// Platform operations the lifecycle and notification code rely on.
#[async_trait::async_trait]
pub trait ClientHost: Send + Sync {
    /// Take over immediately instead of waiting for existing clients to close.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Take control of every open client. Returns how many were claimed.
    async fn claim(&self) -> Result<usize, Error>;

    async fn windows(&self) -> Result<Vec<ClientWindow>, Error>;

    async fn focus(&self, id: u64) -> Result<(), Error>;

    async fn open_window(&self, url: &str) -> Result<ClientWindow, Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    /// Dismiss shown notifications pointing at `target_url`. Returns how many were closed.
    async fn close_notifications(&self, target_url: &str) -> Result<usize, Error>;
}

/// In-process client host.
#[derive(Debug, Default)]
pub struct LocalHost {
    windows: RwLock<Vec<ClientWindow>>,
    shown: RwLock<Vec<Notification>>,
    next_id: AtomicU64,
    skip_waiting: AtomicBool,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a window that was open before this instance took over.
    pub async fn attach_window(&self, url: &str) -> ClientWindow {
        let window = ClientWindow {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            url: url.to_string(),
            focused: false,
            controlled: false,
        };
        self.windows.write().await.push(window.clone());
        window
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::Acquire)
    }

    /// Notifications shown so far, oldest first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.shown.read().await.clone()
    }
}

#[async_trait::async_trait]
impl ClientHost for LocalHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.skip_waiting.store(true, Ordering::Release);
        tracing::info!("skip waiting requested");
        Ok(())
    }

    async fn claim(&self) -> Result<usize, Error> {
        let mut windows = self.windows.write().await;
        let claimed = windows.iter().filter(|w| !w.controlled).count();
        for window in windows.iter_mut() {
            window.controlled = true;
        }
        tracing::info!(claimed, "claimed clients");
        Ok(claimed)
    }

    async fn windows(&self) -> Result<Vec<ClientWindow>, Error> {
        Ok(self.windows.read().await.clone())
    }

    async fn focus(&self, id: u64) -> Result<(), Error> {
        let mut windows = self.windows.write().await;
        if !windows.iter().any(|w| w.id == id) {
            return Err(Error::Host(format!("no window with id {id}")));
        }
        for window in windows.iter_mut() {
            window.focused = window.id == id;
        }
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<ClientWindow, Error> {
        let mut windows = self.windows.write().await;
        for window in windows.iter_mut() {
            window.focused = false;
        }
        let window = ClientWindow {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            url: url.to_string(),
            focused: true,
            controlled: true,
        };
        windows.push(window.clone());
        Ok(window)
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, url = %notification.target_url(), "showing notification");
        self.shown.write().await.push(notification.clone());
        Ok(())
    }

    async fn close_notifications(&self, target_url: &str) -> Result<usize, Error> {
        let mut shown = self.shown.write().await;
        let before = shown.len();
        shown.retain(|n| n.target_url() != target_url);
        Ok(before - shown.len())
    }
}
