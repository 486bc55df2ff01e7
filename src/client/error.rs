// ABOUTME: SMPP session error types covering connect, bind, send, receive and receipt parsing failures
// ABOUTME: Provides structured error reporting with conversions from I/O, codec and receipt errors

use crate::client::types::SessionState;
use crate::codec::CodecError;
use crate::datatypes::{CommandId, CommandStatus};
use crate::receipt::ReceiptError;
use std::io;
use thiserror::Error;

/// Error type for every session operation
#[derive(Debug, Error)]
pub enum SmppError {
    /// Transport establishment failed (refused, unreachable, timed out)
    #[error("Connection error: {0}")]
    Connection(#[source] io::Error),

    /// The SMSC rejected the bind handshake
    #[error("Bind rejected by SMSC: {0:?}")]
    Bind(CommandStatus),

    /// An outbound PDU could not be encoded; nothing was written
    #[error("Encoding error: {0}")]
    Encoding(#[source] CodecError),

    /// A complete inbound frame could not be decoded
    #[error("Decoding error: {0}")]
    Decoding(#[source] CodecError),

    #[error(transparent)]
    Send(#[from] SendError),

    /// The stream lost frame alignment; the session has been closed
    #[error("Protocol violation: {0}")]
    ProtocolViolation(#[source] CodecError),

    #[error(transparent)]
    MalformedReceipt(#[from] ReceiptError),

    /// The socket closed while the request was outstanding
    #[error("Connection lost")]
    ConnectionLost,

    /// No response arrived within the configured wait
    #[error("Operation timeout")]
    Timeout,

    /// The SMSC answered with a non-zero command_status
    #[error("Protocol error: {0:?}")]
    Protocol(CommandStatus),

    /// Session not in the correct state for the operation
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Response of the wrong type for the request
    #[error("Unexpected PDU: expected {expected:?}, got {actual:?}")]
    UnexpectedPdu {
        expected: CommandId,
        actual: CommandId,
    },
}

/// Failure on the outbound path
#[derive(Debug, Error)]
pub enum SendError {
    /// The socket write failed; the session is now Disconnected
    #[error("Write failed: {0}")]
    Io(#[source] io::Error),

    #[error("Session is not bound (state: {0:?})")]
    NotBound(SessionState),
}

/// Result type alias for SMPP operations
pub type SmppResult<T> = Result<T, SmppError>;

impl SmppError {
    /// True for errors after which the session can no longer be used
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SmppError::Connection(_)
                | SmppError::Send(SendError::Io(_))
                | SmppError::ProtocolViolation(_)
                | SmppError::ConnectionLost
        )
    }
}
