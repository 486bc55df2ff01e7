// ABOUTME: Transceiver session owning the socket, bind handshake, sequence allocation and send path
// ABOUTME: Spawns the listener loop and keep-alive task and tears both down deterministically

use crate::client::config::SessionConfig;
use crate::client::error::{SendError, SmppError, SmppResult};
use crate::client::handler::HandlerRegistry;
use crate::client::keepalive;
use crate::client::listener;
use crate::client::pending::{PendingResponse, PendingTable};
use crate::client::types::{BindCredentials, BindMode, SessionState};
use crate::codec::{Encodable, Frame, PduRegistry};
use crate::connection::{self, FrameWriter};
use crate::datatypes::{CommandId, EnquireLink, SubmitSm, Unbind};
use crate::segment::{MessageSegment, Segmenter, TargetEncoding};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// State shared by the session handle, the listener loop and keep-alive
pub(crate) struct Shared {
    writer: tokio::sync::Mutex<FrameWriter>,
    pub(crate) pending: PendingTable,
    state: watch::Sender<SessionState>,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) config: SessionConfig,
    pub(crate) shutdown: Notify,
    close_reason: Mutex<Option<SmppError>>,
}

impl Shared {
    pub(crate) fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub(crate) fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = ?previous, to = ?next, "Session state changed");
        }
    }

    /// Writes one PDU under the writer lock so frames never interleave.
    ///
    /// A transport failure marks the session Disconnected and stops the
    /// listener.
    pub(crate) async fn write<T: Encodable + ?Sized>(&self, pdu: &T) -> SmppResult<()> {
        let result = self.writer.lock().await.write_frame(pdu).await;
        if let Err(SmppError::Send(SendError::Io(e))) = &result {
            warn!("Write failed, closing session: {}", e);
            self.set_state(SessionState::Disconnected);
            self.request_close(Some(SmppError::ConnectionLost));
        }
        result
    }

    /// Registers a request, then writes it. The entry is registered first so
    /// a fast response always finds it.
    pub(crate) async fn send_request<T, F>(
        &self,
        command_id: CommandId,
        build: F,
    ) -> SmppResult<PendingResponse>
    where
        T: Encodable,
        F: FnOnce(u32) -> T,
    {
        let pending = self.pending.register(command_id);
        let pdu = build(pending.sequence_number());

        if let Err(e) = self.write(&pdu).await {
            self.pending.remove(pending.sequence_number());
            return Err(e);
        }
        debug!(command = ?command_id, sequence_number = pending.sequence_number(), "Sent request");
        Ok(pending)
    }

    /// Sends a request and waits up to `timeout` for its response
    pub(crate) async fn request<T, F>(
        &self,
        command_id: CommandId,
        build: F,
        timeout: Duration,
    ) -> SmppResult<Frame>
    where
        T: Encodable,
        F: FnOnce(u32) -> T,
    {
        let pending = self.send_request(command_id, build).await?;
        pending.wait(&self.pending, timeout).await
    }

    /// Asks the listener to stop; `reason` becomes its terminal error
    pub(crate) fn request_close(&self, reason: Option<SmppError>) {
        if let Some(reason) = reason {
            let mut slot = self
                .close_reason
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            slot.get_or_insert(reason);
        }
        self.shutdown.notify_one();
    }

    /// Shuts the transport's write half down. Waits at most `unbind_timeout`
    /// for a sender to release the writer.
    pub(crate) async fn close_transport(&self) {
        match tokio::time::timeout(self.config.unbind_timeout, self.writer.lock()).await {
            Ok(mut writer) => {
                if writer.is_closed() {
                    return;
                }
                match writer.shutdown().await {
                    Ok(()) => debug!("Transport closed"),
                    Err(e) => debug!("Transport shutdown: {}", e),
                }
            }
            Err(_) => warn!("Writer busy, transport left to close on drop"),
        }
    }

    pub(crate) fn take_close_reason(&self) -> Option<SmppError> {
        self.close_reason
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// An SMPP v3.4 transceiver session.
///
/// One session owns one connection. Inbound PDUs are read by a dedicated
/// listener task and routed through the [`HandlerRegistry`]; outbound calls
/// take `&self`, so several tasks can submit concurrently.
///
/// ```rust,no_run
/// use smpp_session::client::{BindMode, Session};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = Session::connect("localhost", 2775, Duration::from_secs(10)).await?;
/// session.bind("system_id", "password", BindMode::Transceiver).await?;
///
/// let sequence_numbers = session.send_message("Sender", "447700900123", "Hello!").await?;
/// println!("submitted as {sequence_numbers:?}");
///
/// session.unbind().await?;
/// # Ok(())
/// # }
/// ```
pub struct Session {
    shared: Arc<Shared>,
    segmenter: Segmenter,
    listener: Option<JoinHandle<SmppResult<()>>>,
    keep_alive: Option<JoinHandle<()>>,
    outcome: Option<SmppResult<()>>,
}

impl Session {
    /// Opens a TCP connection to the SMSC with default configuration
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> SmppResult<Self> {
        let config = SessionConfig::new(host, port).with_connect_timeout(timeout);
        Self::connect_with(config, HandlerRegistry::default()).await
    }

    /// Opens a TCP connection to `config.host:config.port`
    pub async fn connect_with(config: SessionConfig, handlers: HandlerRegistry) -> SmppResult<Self> {
        let address = config.address();
        debug!(%address, "Connecting");

        let stream = match tokio::time::timeout(config.connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!(%address, "Connect failed: {}", e);
                return Err(SmppError::Connection(e));
            }
            Err(_) => {
                warn!(%address, timeout = ?config.connect_timeout, "Connect timed out");
                return Err(SmppError::Connection(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect to {address} timed out"),
                )));
            }
        };

        info!(%address, "Connected to SMSC");
        Ok(Self::from_stream(stream, config, handlers))
    }

    /// Runs a session over an already established transport.
    ///
    /// Must be called inside a Tokio runtime; the listener is spawned here.
    pub fn from_stream<S>(stream: S, config: SessionConfig, handlers: HandlerRegistry) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let registry = PduRegistry::new().with_unknown_tlvs(config.allow_unknown_tlvs);
        let (reader, writer) = connection::split(stream, registry);
        let (state, _) = watch::channel(SessionState::Connected);

        let shared = Arc::new(Shared {
            writer: tokio::sync::Mutex::new(writer),
            pending: PendingTable::new(),
            state,
            handlers,
            config,
            shutdown: Notify::new(),
            close_reason: Mutex::new(None),
        });

        let listener = tokio::spawn(listener::run(reader, shared.clone()));

        Self {
            shared,
            segmenter: Segmenter::new(),
            listener: Some(listener),
            keep_alive: None,
            outcome: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Receiver that observes every state transition
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Number of requests still waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.shared.pending.len()
    }

    /// Performs the bind_transceiver handshake
    pub async fn bind(&mut self, system_id: &str, password: &str, mode: BindMode) -> SmppResult<()> {
        let mut credentials = self.shared.config.credentials.clone();
        credentials.system_id = system_id.to_string();
        credentials.password = password.to_string();
        credentials.bind_mode = mode;
        self.bind_with(&credentials).await
    }

    /// Binds with the credentials from the session configuration
    pub async fn bind_configured(&mut self) -> SmppResult<()> {
        let credentials = self.shared.config.credentials.clone();
        self.bind_with(&credentials).await
    }

    pub async fn bind_with(&mut self, credentials: &BindCredentials) -> SmppResult<()> {
        let state = self.state();
        if state != SessionState::Connected {
            return Err(SmppError::InvalidState(format!("cannot bind while {state:?}")));
        }

        debug!(system_id = %credentials.system_id, mode = ?credentials.bind_mode, "Binding");

        let response = self
            .shared
            .request(
                CommandId::BindTransceiver,
                |seq| credentials.to_pdu(seq),
                self.shared.config.response_timeout,
            )
            .await?;

        match response {
            Frame::BindTransceiverResp(resp) if resp.command_status.is_ok() => {
                self.shared.set_state(SessionState::Bound);
                info!(
                    system_id = %credentials.system_id,
                    smsc = %resp.system_id,
                    "Bound as transceiver"
                );
                self.start_keep_alive();
                Ok(())
            }
            Frame::BindTransceiverResp(resp) => {
                warn!(status = ?resp.command_status, "Bind rejected");
                Err(SmppError::Bind(resp.command_status))
            }
            Frame::GenericNack(nack) => {
                warn!(status = ?nack.command_status, "Bind rejected with generic_nack");
                Err(SmppError::Bind(nack.command_status))
            }
            other => Err(SmppError::UnexpectedPdu {
                expected: CommandId::BindTransceiverResp,
                actual: other.command_id(),
            }),
        }
    }

    fn start_keep_alive(&mut self) {
        let config = self.shared.config.keep_alive.clone();
        if !config.enabled || self.keep_alive.is_some() {
            return;
        }
        self.keep_alive = Some(tokio::spawn(keepalive::run(self.shared.clone(), config)));
    }

    fn ensure_bound(&self) -> SmppResult<()> {
        match self.state() {
            SessionState::Bound => Ok(()),
            state => Err(SendError::NotBound(state).into()),
        }
    }

    fn build_submit(
        &self,
        sequence_number: u32,
        source: &str,
        dest: &str,
        segment: &MessageSegment,
        receipt: bool,
    ) -> SubmitSm {
        let config = &self.shared.config;
        SubmitSm::new(sequence_number, source, dest, segment.payload.clone())
            .source_addr_ton(config.source_addr_ton)
            .source_addr_npi(config.source_addr_npi)
            .dest_addr_ton(config.dest_addr_ton)
            .dest_addr_npi(config.dest_addr_npi)
            .esm_class(segment.esm_class())
            .data_coding(segment.data_coding)
            .registered_delivery(if receipt { SubmitSm::RECEIPT_REQUESTED } else { 0 })
    }

    /// Submits one segment and returns its sequence number without waiting
    /// for submit_sm_resp. The response still goes through the handlers.
    pub async fn submit(
        &self,
        source: &str,
        dest: &str,
        segment: &MessageSegment,
        receipt: bool,
    ) -> SmppResult<u32> {
        self.submit_tracked(source, dest, segment, receipt)
            .await
            .map(|pending| pending.sequence_number())
    }

    /// Submits one segment and returns a handle resolving to its response
    pub async fn submit_tracked(
        &self,
        source: &str,
        dest: &str,
        segment: &MessageSegment,
        receipt: bool,
    ) -> SmppResult<PendingResponse> {
        self.ensure_bound()?;
        self.shared
            .send_request(CommandId::SubmitSm, |seq| {
                self.build_submit(seq, source, dest, segment, receipt)
            })
            .await
    }

    /// Waits for the submit_sm_resp behind `pending` and returns the SMSC
    /// message id
    pub async fn message_id(&self, pending: PendingResponse) -> SmppResult<String> {
        match pending
            .wait(&self.shared.pending, self.shared.config.response_timeout)
            .await?
        {
            Frame::SubmitSmResp(resp) if resp.command_status.is_ok() => Ok(resp.message_id),
            Frame::SubmitSmResp(resp) => Err(SmppError::Protocol(resp.command_status)),
            Frame::GenericNack(nack) => Err(SmppError::Protocol(nack.command_status)),
            other => Err(SmppError::UnexpectedPdu {
                expected: CommandId::SubmitSmResp,
                actual: other.command_id(),
            }),
        }
    }

    /// Segments `text` and submits every part in order, returning the
    /// sequence numbers allocated to them
    pub async fn send_message(&self, source: &str, dest: &str, text: &str) -> SmppResult<Vec<u32>> {
        self.ensure_bound()?;
        let message = self
            .segmenter
            .segment(text, TargetEncoding::Auto)
            .map_err(SmppError::Encoding)?;

        let receipt = self.shared.config.delivery_receipts;
        let mut sequence_numbers = Vec::with_capacity(message.len());
        for segment in message.iter() {
            sequence_numbers.push(self.submit(source, dest, segment, receipt).await?);
        }

        info!(
            to = dest,
            segments = sequence_numbers.len(),
            "Message submitted"
        );
        Ok(sequence_numbers)
    }

    /// Round-trips an enquire_link
    pub async fn enquire_link(&self) -> SmppResult<()> {
        if !self.state().is_open() {
            return Err(SmppError::InvalidState("session is disconnected".to_string()));
        }
        let response = self
            .shared
            .request(CommandId::EnquireLink, EnquireLink::new, self.shared.config.response_timeout)
            .await?;
        expect_ok(response, CommandId::EnquireLinkResp)
    }

    /// Sends unbind, waits a bounded time for unbind_resp, then disconnects.
    ///
    /// The socket is closed and pending requests are failed whether or not
    /// the SMSC answers.
    pub async fn unbind(&mut self) -> SmppResult<()> {
        let outcome = if self.state().is_bound() {
            // Submits are refused from here on; EOF after this point is a clean close
            self.shared.set_state(SessionState::Unbound);
            let response = self
                .shared
                .request(CommandId::Unbind, Unbind::new, self.shared.config.unbind_timeout)
                .await;
            match response.and_then(|frame| expect_ok(frame, CommandId::UnbindResp)) {
                Ok(()) => {
                    info!("Unbound");
                    Ok(())
                }
                Err(e) => {
                    warn!("Unbind did not complete cleanly: {}", e);
                    Err(e)
                }
            }
        } else {
            Ok(())
        };

        self.disconnect().await;
        outcome
    }

    /// Closes the transport without unbinding. Safe to call more than once.
    pub async fn disconnect(&mut self) {
        if let Some(task) = self.keep_alive.take() {
            task.abort();
        }

        self.shared.request_close(None);
        self.shared.close_transport().await;

        let grace = self.shared.config.unbind_timeout;
        if let Some(mut listener) = self.listener.take() {
            let outcome = match tokio::time::timeout(grace, &mut listener).await {
                Ok(joined) => joined.unwrap_or(Err(SmppError::ConnectionLost)),
                Err(_) => {
                    listener.abort();
                    Err(SmppError::ConnectionLost)
                }
            };
            self.outcome = Some(outcome);
        }

        self.shared.pending.fail_all();
        self.shared.set_state(SessionState::Disconnected);
    }

    /// Waits for the listener to finish and returns how the session ended.
    ///
    /// The terminal result is reported once; later calls return `Ok(())`.
    pub async fn wait_closed(&mut self) -> SmppResult<()> {
        if let Some(listener) = self.listener.take() {
            let outcome = listener.await.unwrap_or(Err(SmppError::ConnectionLost));
            if let Some(task) = self.keep_alive.take() {
                task.abort();
            }
            return outcome;
        }
        self.outcome.take().unwrap_or(Ok(()))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.keep_alive.take() {
            task.abort();
        }
        if let Some(task) = self.listener.take() {
            task.abort();
        }
        self.shared.pending.fail_all();
    }
}

/// Accepts `frame` when it is an OK response of type `expected`
fn expect_ok(frame: Frame, expected: CommandId) -> SmppResult<()> {
    match frame {
        Frame::GenericNack(nack) => Err(SmppError::Protocol(nack.command_status)),
        frame if frame.command_id() != expected => Err(SmppError::UnexpectedPdu {
            expected,
            actual: frame.command_id(),
        }),
        frame if frame.command_status().is_ok() => Ok(()),
        frame => Err(SmppError::Protocol(frame.command_status())),
    }
}
