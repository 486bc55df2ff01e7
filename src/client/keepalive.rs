// ABOUTME: SMPP keep-alive for long-running sessions: periodic enquire_link with failure tracking
// ABOUTME: Closes the session with ConnectionLost once the SMSC stops answering

use crate::client::error::SmppError;
use crate::client::session::Shared;
use crate::codec::Frame;
use crate::datatypes::{CommandId, EnquireLink};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

/// Configuration for SMPP keep-alive functionality
///
/// Controls the periodic enquire_link PDUs sent to keep the session healthy
/// during long-running connections.
///
/// # Example
///
/// ```rust
/// use smpp_session::client::KeepAliveConfig;
/// use std::time::Duration;
///
/// // Default configuration (30s interval, 10s timeout, 3 max failures)
/// let config = KeepAliveConfig::default();
///
/// let config = KeepAliveConfig::new(Duration::from_secs(60))
///     .with_timeout(Duration::from_secs(15))
///     .with_max_failures(5);
///
/// let config = KeepAliveConfig::disabled();
/// assert!(!config.enabled);
/// ```
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Interval between enquire_link PDUs (default: 30 seconds)
    pub interval: Duration,

    /// Timeout for enquire_link responses (default: 10 seconds). Should be
    /// well below the interval.
    pub timeout: Duration,

    /// Consecutive failures before the session is closed (default: 3)
    pub max_failures: u32,

    /// Whether the keep-alive task runs at all (default: true)
    pub enabled: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            max_failures: 3,
            enabled: true,
        }
    }
}

impl KeepAliveConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures;
        self
    }

    /// No automatic enquire_link; `Session::enquire_link` still works
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Snapshot of keep-alive health
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAliveStatus {
    pub running: bool,
    /// Reset to 0 by any successful enquire_link
    pub consecutive_failures: u32,
    pub total_pings: u32,
    pub total_pongs: u32,
}

/// Tracks when the next enquire_link is due and how many have failed
#[derive(Debug)]
pub struct KeepAliveManager {
    config: KeepAliveConfig,
    last_ping: Option<Instant>,
    consecutive_failures: u32,
    total_pings: u32,
    total_pongs: u32,
}

impl KeepAliveManager {
    pub fn new(config: KeepAliveConfig) -> Self {
        Self {
            config,
            last_ping: None,
            consecutive_failures: 0,
            total_pings: 0,
            total_pongs: 0,
        }
    }

    /// True when enabled, under the failure limit and the interval has passed
    pub fn should_ping(&self) -> bool {
        if !self.config.enabled {
            return false;
        }

        if self.is_connection_failed() {
            debug!("Max failures reached, not sending more pings");
            return false;
        }

        match self.last_ping {
            None => true,
            Some(last) => last.elapsed() >= self.config.interval,
        }
    }

    pub fn on_ping_sent(&mut self) {
        self.last_ping = Some(Instant::now());
        self.total_pings += 1;
        debug!("Enquire_link sent (total: {})", self.total_pings);
    }

    pub fn on_ping_success(&mut self) {
        self.consecutive_failures = 0;
        self.total_pongs += 1;
        debug!("Enquire_link successful (total: {})", self.total_pongs);
    }

    pub fn on_ping_failure(&mut self) {
        self.consecutive_failures += 1;
        warn!(
            "Enquire_link failed (consecutive failures: {})",
            self.consecutive_failures
        );
    }

    pub fn is_connection_failed(&self) -> bool {
        self.consecutive_failures >= self.config.max_failures
    }

    pub fn status(&self) -> KeepAliveStatus {
        KeepAliveStatus {
            running: self.config.enabled,
            consecutive_failures: self.consecutive_failures,
            total_pings: self.total_pings,
            total_pongs: self.total_pongs,
        }
    }
}

/// Background task for one bound session. Ends when the session leaves
/// Bound, or closes it with `ConnectionLost` after too many failed pings.
pub(crate) async fn run(shared: Arc<Shared>, config: KeepAliveConfig) {
    let mut manager = KeepAliveManager::new(config.clone());
    let mut ticker = tokio::time::interval(config.interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the session was just bound
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if !shared.state().is_bound() {
            debug!("Session no longer bound, keep-alive stopped");
            return;
        }

        manager.on_ping_sent();

        let outcome = shared
            .request(CommandId::EnquireLink, EnquireLink::new, config.timeout)
            .await;
        match outcome {
            Ok(Frame::EnquireLinkResp(resp)) if resp.command_status.is_ok() => manager.on_ping_success(),
            Ok(other) => {
                debug!(command = ?other.command_id(), status = ?other.command_status(), "Unexpected enquire_link outcome");
                manager.on_ping_failure();
            }
            Err(e) if e.is_fatal() => {
                debug!("Keep-alive stopped: {}", e);
                return;
            }
            Err(_) => manager.on_ping_failure(),
        }

        if manager.is_connection_failed() {
            error!(
                failures = manager.status().consecutive_failures,
                "SMSC stopped answering enquire_link, closing session"
            );
            shared.request_close(Some(SmppError::ConnectionLost));
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = KeepAliveConfig::default();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_failures, 3);
        assert!(config.enabled);
    }

    #[test]
    fn config_builder() {
        let config = KeepAliveConfig::new(Duration::from_secs(60))
            .with_timeout(Duration::from_secs(5))
            .with_max_failures(5);

        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_failures, 5);
        assert!(config.enabled);
    }

    #[test]
    fn manager_waits_for_interval() {
        let mut manager = KeepAliveManager::new(KeepAliveConfig::new(Duration::from_millis(50)));
        assert!(manager.should_ping());

        manager.on_ping_sent();
        assert!(!manager.should_ping());

        std::thread::sleep(Duration::from_millis(60));
        assert!(manager.should_ping());
    }

    #[test]
    fn failures_stop_pings_until_success() {
        let config = KeepAliveConfig::new(Duration::ZERO).with_max_failures(2);
        let mut manager = KeepAliveManager::new(config);

        manager.on_ping_failure();
        assert!(!manager.is_connection_failed());
        assert!(manager.should_ping());

        manager.on_ping_failure();
        assert!(manager.is_connection_failed());
        assert!(!manager.should_ping());

        manager.on_ping_success();
        assert!(!manager.is_connection_failed());
        assert!(manager.should_ping());
    }

    #[test]
    fn disabled_never_pings() {
        let manager = KeepAliveManager::new(KeepAliveConfig::disabled());
        assert!(!manager.should_ping());
        assert!(!manager.status().running);
    }

    #[test]
    fn statistics() {
        let mut manager = KeepAliveManager::new(KeepAliveConfig::default());
        manager.on_ping_sent();
        manager.on_ping_success();
        manager.on_ping_sent();
        manager.on_ping_failure();

        assert_eq!(
            manager.status(),
            KeepAliveStatus {
                running: true,
                consecutive_failures: 1,
                total_pings: 2,
                total_pongs: 1,
            }
        );
    }
}
