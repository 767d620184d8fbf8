//! Connectivity Monitoring Abstraction
//!
//! Provides the online/offline signal the sync scheduler keys off:
//! - Desktop: system network APIs (NetworkManager, SystemConfiguration)
//! - iOS: Network framework / Reachability
//! - Android: ConnectivityManager

use async_trait::async_trait;
use tokio::sync::watch;

/// Connectivity status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityStatus {
    /// Connected to a network
    Online,
    /// Not connected to any network
    Offline,
}

impl ConnectivityStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectivityStatus::Online)
    }
}

/// Connectivity monitor trait
///
/// The scheduler subscribes once at startup and drains the queue on every
/// transition to [`ConnectivityStatus::Online`].
#[async_trait]
pub trait ConnectivityMonitor: Send + Sync {
    /// Get the current connectivity status
    async fn status(&self) -> ConnectivityStatus;

    /// Check if currently connected to any network
    async fn is_online(&self) -> bool {
        self.status().await.is_online()
    }

    /// Subscribe to connectivity changes.
    ///
    /// The receiver always holds the latest status; intermediate flaps that
    /// happen faster than the consumer reads are coalesced.
    fn subscribe(&self) -> watch::Receiver<ConnectivityStatus>;
}

/// Manually driven monitor for tests and development.
///
/// Starts `Online`; flip with [`ManualConnectivity::set_status`].
#[derive(Debug)]
pub struct ManualConnectivity {
    sender: watch::Sender<ConnectivityStatus>,
}

impl ManualConnectivity {
    pub fn new(initial: ConnectivityStatus) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    pub fn online() -> Self {
        Self::new(ConnectivityStatus::Online)
    }

    pub fn offline() -> Self {
        Self::new(ConnectivityStatus::Offline)
    }

    /// Flip the reported status and notify subscribers
    pub fn set_status(&self, status: ConnectivityStatus) {
        // send_replace never fails even with zero receivers
        self.sender.send_replace(status);
    }
}

impl Default for ManualConnectivity {
    fn default() -> Self {
        Self::online()
    }
}

#[async_trait]
impl ConnectivityMonitor for ManualConnectivity {
    async fn status(&self) -> ConnectivityStatus {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_connectivity_status() {
        let monitor = ManualConnectivity::offline();
        assert!(!monitor.is_online().await);

        monitor.set_status(ConnectivityStatus::Online);
        assert!(monitor.is_online().await);
    }

    #[tokio::test]
    async fn test_subscription_sees_transitions() {
        let monitor = ManualConnectivity::offline();
        let mut rx = monitor.subscribe();
        assert_eq!(*rx.borrow(), ConnectivityStatus::Offline);

        monitor.set_status(ConnectivityStatus::Online);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ConnectivityStatus::Online);
    }
}
