//! SMPP v3.4 transceiver session client.
//!
//! Binds to an SMSC over TCP, submits text as one or more `submit_sm`
//! PDUs (GSM 7-bit or UCS-2, concatenated when needed) and listens
//! concurrently for delivery receipts and other inbound PDUs.
//!
//! The crate only emits `tracing` events; installing a subscriber is left
//! to the application.

pub mod client;
pub mod codec;
pub mod connection;
pub mod datatypes;
pub mod gsm;
pub(crate) mod macros;
pub mod receipt;
pub mod segment;


// Re-export codec types for direct access
pub use codec::{CodecError, Decodable, Encodable, Frame, PduHeader, PduRegistry};

// Re-export the main client API for easy access
pub use client::{
    BindCredentials, BindMode, ClientBuilder, HandlerRegistry, PendingResponse, Session,
    SessionConfig, SessionState, SmppError, SmppResult,
};
pub use receipt::{extract_message_id, DeliveryReceipt, ReceiptError};
pub use segment::{MessageSegment, SegmentedMessage, Segmenter, TargetEncoding};

/// Boxed error for application code that mixes this crate's errors with others.
///
/// Inside the crate every fallible path returns a concrete error type
/// ([`SmppError`], [`CodecError`], [`ReceiptError`]); this alias is for
/// callers such as the demos.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for application code.
///
/// # Examples
///
/// ```rust,no_run
/// use smpp_session::client::ClientBuilder;
///
/// #[tokio::main]
/// async fn main() -> smpp_session::Result<()> {
///     let mut session = ClientBuilder::quick_transceiver("localhost", 2775, "system_id", "password").await?;
///
///     let sequence_numbers = session.send_message("Sender", "447700900123", "Hello, World!").await?;
///     println!("Submitted as {sequence_numbers:?}");
///
///     session.unbind().await?;
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
