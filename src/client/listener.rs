// ABOUTME: Per-session read loop that decodes inbound frames and routes them
// ABOUTME: Correlates responses, answers SMSC requests and ends the session on fatal errors

use crate::client::error::{SmppError, SmppResult};
use crate::client::session::Shared;
use crate::client::types::SessionState;
use crate::codec::{CodecError, Frame, PduHeader};
use crate::connection::{FrameReader, ReadError};
use crate::datatypes::{
    CommandStatus, DeliverSmResponse, EnquireLinkResponse, GenericNack, UnbindResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

enum Flow {
    Continue,
    Stop,
}

/// Reads frames until the session ends, returning how it ended.
///
/// `Ok(())` for a clean close (local shutdown, peer unbind, EOF after
/// unbind). `ProtocolViolation` when the stream desynchronizes and
/// `ConnectionLost` when the transport fails underneath a live session.
/// Either way every pending request is failed, the state ends at
/// Disconnected and the transport is shut down.
pub(crate) async fn run(mut reader: FrameReader, shared: Arc<Shared>) -> SmppResult<()> {
    debug!("Listener started");
    let outcome = listen(&mut reader, &shared).await;

    let failed = shared.pending.fail_all();
    if failed > 0 {
        warn!(failed, "Outstanding requests failed on session close");
    }
    shared.set_state(SessionState::Disconnected);
    shared.close_transport().await;

    match &outcome {
        Ok(()) => info!("Session closed"),
        Err(e) => error!("Session terminated: {}", e),
    }
    outcome
}

async fn listen(reader: &mut FrameReader, shared: &Shared) -> SmppResult<()> {
    let mut sweep = tokio::time::interval(sweep_period(shared.config.response_timeout));
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let next = tokio::select! {
            _ = shared.shutdown.notified() => {
                debug!("Listener stopping on request");
                return match shared.take_close_reason() {
                    Some(reason) => Err(reason),
                    None => Ok(()),
                };
            }
            _ = sweep.tick() => {
                let expired = shared.pending.expire_older_than(shared.config.response_timeout);
                if expired > 0 {
                    warn!(expired, "Retired requests that never got a response");
                }
                continue;
            }
            next = reader.read_frame() => next,
        };

        let flow = match next {
            Ok(Some(frame)) => on_frame(shared, frame).await?,
            Ok(None) => {
                return match shared.state() {
                    SessionState::Unbound | SessionState::Disconnected => Ok(()),
                    state => {
                        warn!(?state, "Connection closed by peer");
                        Err(SmppError::ConnectionLost)
                    }
                };
            }
            Err(ReadError::Malformed { header, source }) => on_malformed(shared, header, source).await?,
            Err(ReadError::Desync(e)) => {
                error!("Frame boundary lost: {}", e);
                return Err(SmppError::ProtocolViolation(e));
            }
            Err(ReadError::Io(e)) => {
                warn!("Read failed: {}", e);
                return Err(SmppError::ConnectionLost);
            }
        };

        if let Flow::Stop = flow {
            return Ok(());
        }
    }
}

/// How often stale requests are looked for: a quarter of the response
/// timeout, between 10ms and 1s
fn sweep_period(response_timeout: Duration) -> Duration {
    (response_timeout / 4).clamp(Duration::from_millis(10), Duration::from_secs(1))
}

async fn on_frame(shared: &Shared, frame: Frame) -> SmppResult<Flow> {
    let sequence_number = frame.sequence_number();
    debug!(
        command = ?frame.command_id(),
        sequence_number,
        status = ?frame.command_status(),
        "Received PDU"
    );

    if frame.is_response() {
        if shared.pending.complete(sequence_number, Ok(frame.clone())) {
            dispatch(shared, &frame).await;
        } else {
            warn!(
                command = ?frame.command_id(),
                sequence_number,
                "Response matches no pending request, dropped"
            );
        }
        return Ok(Flow::Continue);
    }

    let status = dispatch(shared, &frame).await;
    match frame {
        Frame::DeliverSm(_) => {
            reply(shared, &DeliverSmResponse::error(sequence_number, status)).await?;
        }
        Frame::EnquireLink(_) => {
            reply(shared, &EnquireLinkResponse::new(sequence_number)).await?;
        }
        Frame::Unbind(_) => {
            info!("SMSC requested unbind");
            reply(shared, &UnbindResponse::new(sequence_number)).await?;
            shared.set_state(SessionState::Unbound);
            return Ok(Flow::Stop);
        }
        other => {
            warn!(command = ?other.command_id(), sequence_number, "Unsupported request, sending generic_nack");
            reply(shared, &GenericNack::invalid_command_id(sequence_number)).await?;
        }
    }
    Ok(Flow::Continue)
}

async fn on_malformed(shared: &Shared, header: PduHeader, source: CodecError) -> SmppResult<Flow> {
    let sequence_number = header.sequence_number;

    if header.command_id.is_response() {
        warn!(command = ?header.command_id, sequence_number, "Undecodable response: {}", source);
        if !shared
            .pending
            .complete(sequence_number, Err(SmppError::Decoding(source)))
        {
            debug!(sequence_number, "Undecodable response matches no pending request");
        }
        return Ok(Flow::Continue);
    }

    let status = source.to_command_status();
    warn!(
        command = ?header.command_id,
        sequence_number,
        ?status,
        "Rejecting undecodable request: {}",
        source
    );
    reply(shared, &GenericNack::error(sequence_number, status)).await?;
    Ok(Flow::Continue)
}

/// Runs the handler for `frame` on the blocking pool for at most the
/// handler budget. An overrunning handler is left to finish on its own and
/// the PDU is answered with `ESME_ROK`.
async fn dispatch(shared: &Shared, frame: &Frame) -> CommandStatus {
    let command_id = frame.command_id();
    let handler = shared.handlers.handler_for(command_id);
    let owned = frame.clone();
    let task = tokio::task::spawn_blocking(move || handler.handle(&owned));

    let budget = shared.config.handler_budget;
    let status = match tokio::time::timeout(budget, task).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            error!(command = ?command_id, "Handler failed: {}", e);
            CommandStatus::SystemError
        }
        Err(_) => {
            warn!(
                command = ?command_id,
                sequence_number = frame.sequence_number(),
                budget_ms = budget.as_millis() as u64,
                "Handler exceeded its budget, continuing without it"
            );
            CommandStatus::Ok
        }
    };

    if !status.is_ok() {
        debug!(command = ?command_id, ?status, "Handler returned error status");
    }
    status
}

/// Writes a reply; a failed write ends the listener
async fn reply<T: crate::codec::Encodable>(shared: &Shared, pdu: &T) -> SmppResult<()> {
    shared.write(pdu).await.map_err(|e| {
        warn!("Reply failed: {}", e);
        SmppError::ConnectionLost
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_period_tracks_response_timeout() {
        assert_eq!(sweep_period(Duration::from_millis(200)), Duration::from_millis(50));
        assert_eq!(sweep_period(Duration::from_millis(8)), Duration::from_millis(10));
        assert_eq!(sweep_period(Duration::from_secs(30)), Duration::from_secs(1));
    }
}
