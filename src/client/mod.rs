// ABOUTME: SMPP transceiver session client: connection, bind, submit, listener loop and handlers
// ABOUTME: Exports the session, its builder and configuration, error types and keep-alive settings

//! SMPP Client Module
//!
//! A [`Session`] owns one TCP connection to an SMSC bound as a transceiver:
//!
//! * **Listener loop**: a task per session reads every inbound PDU, resolves
//!   pending requests by sequence number and answers deliver_sm,
//!   enquire_link and unbind from the SMSC.
//! * **Handler dispatch**: inbound PDUs are routed by command id through a
//!   [`HandlerRegistry`]; unregistered types are logged and acknowledged.
//! * **Concurrent submits**: sending takes `&self` and every write goes
//!   through one lock, so frames never interleave on the socket.
//! * **Keep-alive**: periodic enquire_link that also retires requests whose
//!   responses never came.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smpp_session::client::{ClientBuilder, KeepAliveConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = ClientBuilder::new("localhost", 2775)
//!     .credentials("system_id", "password")
//!     .keep_alive(KeepAliveConfig::new(Duration::from_secs(30)))
//!     .bind()
//!     .await?;
//!
//! session.send_message("Sender", "447700900123", "Hello!").await?;
//!
//! // Unbind waits a bounded time for unbind_resp, then closes the socket
//! session.unbind().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Waiting for a response
//!
//! [`Session::submit`] returns as soon as the PDU is written. Use
//! [`Session::submit_tracked`] to keep a handle on the response:
//!
//! ```rust,no_run
//! # use smpp_session::client::Session;
//! # use smpp_session::segment::{Segmenter, TargetEncoding};
//! # async fn example(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
//! let message = Segmenter::new().segment("Hi", TargetEncoding::Auto)?;
//! let pending = session
//!     .submit_tracked("Sender", "447700900123", &message.segments[0], true)
//!     .await?;
//! let message_id = session.message_id(pending).await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod keepalive;
mod listener;
pub mod pending;
pub mod session;
pub mod types;

pub use builder::ClientBuilder;
pub use config::SessionConfig;
pub use error::{SendError, SmppError, SmppResult};
pub use handler::{HandlerRegistry, PduHandler};
pub use keepalive::{KeepAliveConfig, KeepAliveManager, KeepAliveStatus};
pub use pending::{PendingResponse, PendingTable};
pub use session::Session;
pub use types::{BindCredentials, BindMode, SessionState};
