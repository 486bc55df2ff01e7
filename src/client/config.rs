// ABOUTME: Session configuration with builder-style setters and SMPP-friendly defaults
// ABOUTME: Covers the SMSC endpoint, credentials, response timeouts, TLV tolerance and keep-alive

use crate::client::keepalive::KeepAliveConfig;
use crate::client::types::BindCredentials;
use crate::datatypes::{NumericPlanIndicator, TypeOfNumber};
use std::time::Duration;

/// Everything a [`Session`](crate::client::Session) needs to connect, bind
/// and submit.
///
/// ```rust
/// use smpp_session::client::{BindCredentials, SessionConfig};
/// use std::time::Duration;
///
/// let config = SessionConfig::new("smsc.example.com", 2775)
///     .with_credentials(BindCredentials::transceiver("esme", "secret"))
///     .with_response_timeout(Duration::from_secs(5))
///     .with_delivery_receipts(false);
/// assert_eq!(config.address(), "smsc.example.com:2775");
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub credentials: BindCredentials,

    /// How long a request may wait for its response before it is retired
    pub response_timeout: Duration,

    /// Bounded wait for unbind_resp before the socket is force-closed
    pub unbind_timeout: Duration,

    /// How long the listener waits for a handler before moving on without it
    pub handler_budget: Duration,

    /// Keep vendor optional parameters instead of rejecting the PDU
    pub allow_unknown_tlvs: bool,

    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,

    /// Ask for delivery receipts on messages sent with `send_message` (default: true)
    pub delivery_receipts: bool,

    pub keep_alive: KeepAliveConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2775,
            connect_timeout: Duration::from_secs(10),
            credentials: BindCredentials::default(),
            response_timeout: Duration::from_secs(30),
            unbind_timeout: Duration::from_secs(5),
            handler_budget: Duration::from_millis(100),
            allow_unknown_tlvs: true,
            source_addr_ton: TypeOfNumber::International,
            source_addr_npi: NumericPlanIndicator::Unknown,
            dest_addr_ton: TypeOfNumber::International,
            dest_addr_npi: NumericPlanIndicator::Unknown,
            delivery_receipts: true,
            keep_alive: KeepAliveConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// `host:port`, as handed to the TCP connector
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, credentials: BindCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_unbind_timeout(mut self, timeout: Duration) -> Self {
        self.unbind_timeout = timeout;
        self
    }

    pub fn with_handler_budget(mut self, budget: Duration) -> Self {
        self.handler_budget = budget;
        self
    }

    pub fn with_unknown_tlvs(mut self, allow: bool) -> Self {
        self.allow_unknown_tlvs = allow;
        self
    }

    /// TON/NPI stamped on the source address of submitted messages
    pub fn with_source_numbering(mut self, ton: TypeOfNumber, npi: NumericPlanIndicator) -> Self {
        self.source_addr_ton = ton;
        self.source_addr_npi = npi;
        self
    }

    /// TON/NPI stamped on the destination address of submitted messages
    pub fn with_dest_numbering(mut self, ton: TypeOfNumber, npi: NumericPlanIndicator) -> Self {
        self.dest_addr_ton = ton;
        self.dest_addr_npi = npi;
        self
    }

    pub fn with_delivery_receipts(mut self, requested: bool) -> Self {
        self.delivery_receipts = requested;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.port, 2775);
        assert!(config.allow_unknown_tlvs);
        assert_eq!(config.source_addr_ton, TypeOfNumber::International);
        assert_eq!(config.dest_addr_npi, NumericPlanIndicator::Unknown);
        assert!(config.delivery_receipts);
        assert!(config.keep_alive.enabled);
    }

    #[test]
    fn setters_chain() {
        let config = SessionConfig::new("10.0.0.1", 3000)
            .with_unknown_tlvs(false)
            .with_source_numbering(TypeOfNumber::Alphanumeric, NumericPlanIndicator::Unknown)
            .with_keep_alive(KeepAliveConfig::disabled())
            .with_unbind_timeout(Duration::from_secs(1));

        assert_eq!(config.address(), "10.0.0.1:3000");
        assert!(!config.allow_unknown_tlvs);
        assert_eq!(config.source_addr_ton, TypeOfNumber::Alphanumeric);
        assert!(!config.keep_alive.enabled);
        assert_eq!(config.unbind_timeout, Duration::from_secs(1));
    }
}
