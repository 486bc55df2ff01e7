// ABOUTME: Supporting types for SMPP sessions: bind credentials, bind mode and connection state
// ABOUTME: Shared by the session, its configuration and the listener loop

use crate::datatypes::{BindTransceiver, InterfaceVersion};

/// SMPP bind operation credentials
///
/// Contains authentication information and bind mode for establishing
/// SMPP sessions with the SMSC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindCredentials {
    /// System identifier for authentication
    pub system_id: String,
    /// Password for authentication
    pub password: String,
    /// System type (optional, defaults to empty string)
    pub system_type: Option<String>,
    /// Type of bind operation to perform
    pub bind_mode: BindMode,
    /// SMPP interface version to use
    pub interface_version: InterfaceVersion,
}

impl BindCredentials {
    /// Create new bind credentials for a transceiver session (SMPP v3.4)
    pub fn transceiver(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            password: password.into(),
            system_type: None,
            bind_mode: BindMode::Transceiver,
            interface_version: InterfaceVersion::SmppV34,
        }
    }

    /// Set system type
    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = Some(system_type.into());
        self
    }

    /// The bind request for these credentials
    pub(crate) fn to_pdu(&self, sequence_number: u32) -> BindTransceiver {
        let mut pdu = BindTransceiver::new(sequence_number, &self.system_id, &self.password);
        pdu.interface_version = self.interface_version;
        if let Some(system_type) = &self.system_type {
            pdu = pdu.with_system_type(system_type);
        }
        pdu
    }
}

impl Default for BindCredentials {
    fn default() -> Self {
        Self::transceiver("", "")
    }
}

/// Type of SMPP bind operation. Only transceiver sessions are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum BindMode {
    /// Submit and receive over one connection
    #[default]
    Transceiver,
}

/// Lifecycle of a session
///
/// Disconnected → Connected → Bound on a successful handshake, then
/// Bound → Unbound → Disconnected on shutdown. Any fatal transport or
/// protocol error moves straight to Disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
    Bound,
    Unbound,
}

impl SessionState {
    pub fn is_bound(&self) -> bool {
        matches!(self, SessionState::Bound)
    }

    /// True while the transport is still open
    pub fn is_open(&self) -> bool {
        !matches!(self, SessionState::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encodable;

    #[test]
    fn credentials_build_bind_request() {
        let credentials = BindCredentials::transceiver("esme", "secret").with_system_type("APP");
        let pdu = credentials.to_pdu(5);

        assert_eq!(pdu.sequence_number, 5);
        assert_eq!(pdu.system_id, "esme");
        assert_eq!(pdu.password, "secret");
        assert_eq!(pdu.system_type, "APP");
        assert_eq!(pdu.interface_version, InterfaceVersion::SmppV34);
        assert!(pdu.to_bytes().is_ok());
    }

    #[test]
    fn session_state_predicates() {
        assert!(SessionState::Bound.is_bound());
        assert!(!SessionState::Unbound.is_bound());
        assert!(SessionState::Unbound.is_open());
        assert!(!SessionState::Disconnected.is_open());
        assert_eq!(SessionState::default(), SessionState::Disconnected);
    }
}
