//! Network Monitoring Implementations

use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus},
};
use tokio::sync::watch;
use tracing::debug;

/// Network monitor fed by the embedding shell.
///
/// Desktop shells already receive OS connectivity notifications; they forward
/// them through [`set_online`](Self::set_online). Every subscriber gets its
/// own receiver, so dropping a stream deregisters only that listener.
pub struct HostNetworkMonitor {
    state: watch::Sender<NetworkInfo>,
}

impl HostNetworkMonitor {
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(Self::info(online));
        Self { state }
    }

    fn info(online: bool) -> NetworkInfo {
        if online {
            NetworkInfo::online()
        } else {
            NetworkInfo::offline()
        }
    }

    /// Record a connectivity transition. Repeated values are not re-broadcast.
    pub fn set_online(&self, online: bool) {
        let info = Self::info(online);
        let changed = self.state.send_if_modified(|current| {
            if *current == info {
                false
            } else {
                *current = info.clone();
                true
            }
        });
        if changed {
            debug!(online, listeners = self.state.receiver_count(), "Connectivity changed");
        }
    }

    /// Number of live change subscriptions
    pub fn listener_count(&self) -> usize {
        self.state.receiver_count()
    }
}

impl Default for HostNetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl NetworkMonitor for HostNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        Ok(self.state.borrow().clone())
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>> {
        // Values sent before subscribing count as seen; only later transitions are reported.
        let rx = self.state.subscribe();
        Ok(Box::new(WatchChangeStream { rx }))
    }
}

struct WatchChangeStream {
    rx: watch::Receiver<NetworkInfo>,
}

#[async_trait]
impl NetworkChangeStream for WatchChangeStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Network monitor that checks reachability with a TCP connect.
///
/// Used when the shell has no connectivity events to forward. The change
/// stream polls at `poll_interval` and only yields on transitions.
pub struct ProbeNetworkMonitor {
    probe_addr: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl ProbeNetworkMonitor {
    pub fn new() -> Self {
        Self {
            probe_addr: "8.8.8.8:53".to_string(),
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn with_probe_addr(mut self, addr: impl Into<String>) -> Self {
        self.probe_addr = addr.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for ProbeNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

async fn probe(addr: &str, timeout: Duration) -> NetworkStatus {
    match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(addr)).await {
        Ok(Ok(_)) => NetworkStatus::Connected,
        _ => NetworkStatus::Disconnected,
    }
}

#[async_trait]
impl NetworkMonitor for ProbeNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = probe(&self.probe_addr, self.timeout).await;
        debug!(status = ?status, addr = %self.probe_addr, "Probed connectivity");
        Ok(NetworkInfo { status })
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>> {
        let last = probe(&self.probe_addr, self.timeout).await;
        Ok(Box::new(ProbeChangeStream {
            addr: self.probe_addr.clone(),
            timeout: self.timeout,
            interval: self.poll_interval,
            last,
        }))
    }
}

struct ProbeChangeStream {
    addr: String,
    timeout: Duration,
    interval: Duration,
    last: NetworkStatus,
}

#[async_trait]
impl NetworkChangeStream for ProbeChangeStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        loop {
            tokio::time::sleep(self.interval).await;
            let status = probe(&self.addr, self.timeout).await;
            if status != self.last {
                self.last = status;
                return Some(NetworkInfo { status });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_host_monitor_reports_current_state() {
        let monitor = HostNetworkMonitor::new(false);
        assert!(!monitor.is_connected().await);

        monitor.set_online(true);
        assert!(monitor.is_connected().await);
    }

    #[tokio::test]
    async fn test_host_monitor_streams_transitions_only() {
        let monitor = HostNetworkMonitor::new(true);
        let mut stream = monitor.subscribe_changes().await.unwrap();

        monitor.set_online(true); // no change
        monitor.set_online(false);

        let info = stream.next().await.unwrap();
        assert!(!info.is_online());
    }

    #[tokio::test]
    async fn test_dropping_stream_deregisters_listener() {
        let monitor = HostNetworkMonitor::new(true);
        let stream = monitor.subscribe_changes().await.unwrap();
        assert_eq!(monitor.listener_count(), 1);

        drop(stream);
        assert_eq!(monitor.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_ends_when_monitor_dropped() {
        let monitor = HostNetworkMonitor::new(true);
        let mut stream = monitor.subscribe_changes().await.unwrap();
        drop(monitor);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_probe_unreachable_address_is_offline() {
        let monitor = ProbeNetworkMonitor::new()
            .with_probe_addr("127.0.0.1:1")
            .with_timeout(Duration::from_millis(200));
        let info = monitor.get_network_info().await.unwrap();
        assert_eq!(info.status, NetworkStatus::Disconnected);
    }
}
