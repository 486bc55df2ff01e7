// ABOUTME: Builder for SMPP transceiver sessions: configuration, handlers, connect and bind
// ABOUTME: Provides quick constructors for the common connect-then-bind case

use crate::client::config::SessionConfig;
use crate::client::error::SmppResult;
use crate::client::handler::{HandlerRegistry, PduHandler};
use crate::client::keepalive::KeepAliveConfig;
use crate::client::session::Session;
use crate::client::types::BindCredentials;
use crate::datatypes::CommandId;
use tokio::io::{AsyncRead, AsyncWrite};

/// Collects configuration and handlers, then opens a [`Session`]
///
/// ```rust,no_run
/// use smpp_session::client::ClientBuilder;
/// use smpp_session::datatypes::{CommandId, CommandStatus};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = ClientBuilder::new("localhost", 2775)
///     .credentials("system_id", "password")
///     .on(CommandId::DeliverSm, |frame: &smpp_session::Frame| {
///         println!("inbound: {frame:?}");
///         CommandStatus::Ok
///     })
///     .bind()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: SessionConfig,
    handlers: HandlerRegistry,
}

impl ClientBuilder {
    /// Builder for `host:port` with default configuration and handlers
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(SessionConfig::new(host, port))
    }

    pub fn from_config(config: SessionConfig) -> Self {
        Self {
            config,
            handlers: HandlerRegistry::default(),
        }
    }

    /// Transceiver credentials for the bind
    pub fn credentials(mut self, system_id: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = BindCredentials::transceiver(system_id, password);
        self
    }

    pub fn keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.config.keep_alive = keep_alive;
        self
    }

    /// Adjusts the configuration in place
    pub fn configure(mut self, f: impl FnOnce(SessionConfig) -> SessionConfig) -> Self {
        self.config = f(self.config);
        self
    }

    /// Registers a handler for inbound PDUs with `command_id`
    pub fn on(mut self, command_id: CommandId, handler: impl PduHandler + 'static) -> Self {
        self.handlers.register(command_id, handler);
        self
    }

    /// Replaces the whole handler table, defaults included
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// Connects without binding
    pub async fn connect(self) -> SmppResult<Session> {
        Session::connect_with(self.config, self.handlers).await
    }

    /// Connects and binds with the configured credentials
    pub async fn bind(self) -> SmppResult<Session> {
        let mut session = self.connect().await?;
        session.bind_configured().await?;
        Ok(session)
    }

    /// Runs the session over an existing transport, unbound
    pub fn with_stream<S>(self, stream: S) -> Session
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Session::from_stream(stream, self.config, self.handlers)
    }

    /// Quick transceiver creation with minimal parameters
    pub async fn quick_transceiver(
        host: impl Into<String>,
        port: u16,
        system_id: impl Into<String>,
        password: impl Into<String>,
    ) -> SmppResult<Session> {
        Self::new(host, port).credentials(system_id, password).bind().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SessionState;
    use crate::datatypes::CommandStatus;

    #[test]
    fn builder_collects_configuration() {
        let builder = ClientBuilder::new("smsc", 2776)
            .credentials("esme", "pw")
            .keep_alive(KeepAliveConfig::disabled())
            .configure(|config| config.with_delivery_receipts(false))
            .on(CommandId::EnquireLink, |_: &crate::Frame| CommandStatus::Ok);

        assert_eq!(builder.config.address(), "smsc:2776");
        assert_eq!(builder.config.credentials.system_id, "esme");
        assert!(!builder.config.delivery_receipts);
        assert!(!builder.config.keep_alive.enabled);
        assert!(builder.handlers.is_registered(CommandId::EnquireLink));
        assert!(builder.handlers.is_registered(CommandId::DeliverSm));
    }

    #[tokio::test]
    async fn with_stream_starts_connected() {
        let (client, _server) = tokio::io::duplex(1024);
        let session = ClientBuilder::default().with_stream(client);
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn connect_failure_is_connection_error() {
        // Port 1 on localhost is essentially never listening
        let result = ClientBuilder::new("127.0.0.1", 1)
            .configure(|c| c.with_connect_timeout(std::time::Duration::from_secs(2)))
            .connect()
            .await;
        assert!(matches!(result, Err(crate::client::SmppError::Connection(_))));
    }
}
