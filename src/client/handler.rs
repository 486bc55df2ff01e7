// ABOUTME: Routing table from inbound command id to handler, invoked by the listener loop
// ABOUTME: Ships default handlers that log delivery receipt ids and submit_sm_resp message ids

use crate::codec::Frame;
use crate::datatypes::{CommandId, CommandStatus};
use crate::receipt::DeliveryReceipt;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Callback for inbound PDUs of one command type.
///
/// The listener runs each call on the blocking pool and waits at most the
/// session's `handler_budget` for it. A handler that overruns keeps running
/// in the background while the listener moves on and answers with
/// `ESME_ROK`, so overrunning handlers may see frames out of order. For
/// deliver_sm the returned status goes back to the SMSC in deliver_sm_resp;
/// for every other PDU it is only logged when non-zero.
pub trait PduHandler: Send + Sync {
    fn handle(&self, frame: &Frame) -> CommandStatus;
}

impl<F> PduHandler for F
where
    F: Fn(&Frame) -> CommandStatus + Send + Sync,
{
    fn handle(&self, frame: &Frame) -> CommandStatus {
        self(frame)
    }
}

/// Handlers keyed by command id, with a fallback for everything unregistered
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<CommandId, Arc<dyn PduHandler>>,
    fallback: Arc<dyn PduHandler>,
}

impl Default for HandlerRegistry {
    /// Registry with the logging handlers for deliver_sm and submit_sm_resp
    fn default() -> Self {
        Self::empty()
            .with_handler(CommandId::DeliverSm, log_deliver_sm)
            .with_handler(CommandId::SubmitSmResp, log_submit_sm_resp)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("registered", &self.handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry where every PDU goes to the fallback handler
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Arc::new(log_unhandled),
        }
    }

    /// Registers `handler` for `command_id`, replacing any previous one
    pub fn register(&mut self, command_id: CommandId, handler: impl PduHandler + 'static) {
        self.handlers.insert(command_id, Arc::new(handler));
    }

    pub fn with_handler(mut self, command_id: CommandId, handler: impl PduHandler + 'static) -> Self {
        self.register(command_id, handler);
        self
    }

    /// Replaces the handler used for unregistered command ids
    pub fn with_fallback(mut self, handler: impl PduHandler + 'static) -> Self {
        self.fallback = Arc::new(handler);
        self
    }

    pub fn is_registered(&self, command_id: CommandId) -> bool {
        self.handlers.contains_key(&command_id)
    }

    /// The handler `command_id` is routed to, the fallback included
    pub fn handler_for(&self, command_id: CommandId) -> Arc<dyn PduHandler> {
        self.handlers
            .get(&command_id)
            .unwrap_or(&self.fallback)
            .clone()
    }

    /// Runs the handler for `frame` on the calling thread
    pub fn dispatch(&self, frame: &Frame) -> CommandStatus {
        self.handler_for(frame.command_id()).handle(frame)
    }
}

fn log_unhandled(frame: &Frame) -> CommandStatus {
    debug!(
        command = ?frame.command_id(),
        sequence_number = frame.sequence_number(),
        "No handler registered, ignoring PDU"
    );
    CommandStatus::Ok
}

fn log_deliver_sm(frame: &Frame) -> CommandStatus {
    let Frame::DeliverSm(pdu) = frame else {
        return log_unhandled(frame);
    };

    if pdu.is_delivery_receipt() {
        match DeliveryReceipt::from_deliver_sm(pdu) {
            Ok(receipt) => info!(message_id = %receipt.message_id, "Delivery receipt received"),
            Err(e) => warn!(sequence_number = pdu.sequence_number, "{}", e),
        }
    } else {
        info!(
            from = %pdu.source_addr,
            to = %pdu.destination_addr,
            text = %pdu.text(),
            "Message received"
        );
    }
    CommandStatus::Ok
}

fn log_submit_sm_resp(frame: &Frame) -> CommandStatus {
    if let Frame::SubmitSmResp(resp) = frame {
        if resp.command_status.is_ok() {
            info!(
                sequence_number = resp.sequence_number,
                message_id = %resp.message_id,
                "Message accepted by SMSC"
            );
        } else {
            warn!(
                sequence_number = resp.sequence_number,
                status = ?resp.command_status,
                "Message rejected by SMSC"
            );
        }
    }
    CommandStatus::Ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{DeliverSm, EnquireLink, EsmClass, SubmitSmResponse};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispatch_by_command_id() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry = HandlerRegistry::empty().with_handler(CommandId::DeliverSm, move |_: &Frame| {
            counter.fetch_add(1, Ordering::SeqCst);
            CommandStatus::SystemError
        });

        let deliver = Frame::DeliverSm(Box::new(DeliverSm::new(1, "1", "2", Bytes::new())));
        assert_eq!(registry.dispatch(&deliver), CommandStatus::SystemError);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Unregistered types fall back to the logging handler
        let enquire = Frame::EnquireLink(EnquireLink::new(2));
        assert_eq!(registry.dispatch(&enquire), CommandStatus::Ok);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_for_is_shareable_across_threads() {
        let registry = HandlerRegistry::empty()
            .with_handler(CommandId::DeliverSm, |_: &Frame| CommandStatus::InvalidDestinationAddress);

        let handler = registry.handler_for(CommandId::DeliverSm);
        let deliver = Frame::DeliverSm(Box::new(DeliverSm::new(3, "1", "2", Bytes::new())));
        let status = std::thread::spawn(move || handler.handle(&deliver)).join().unwrap();
        assert_eq!(status, CommandStatus::InvalidDestinationAddress);

        let fallback = registry.handler_for(CommandId::EnquireLink);
        assert_eq!(fallback.handle(&Frame::EnquireLink(EnquireLink::new(4))), CommandStatus::Ok);
    }

    #[test]
    fn defaults_handle_receipts_and_submit_responses() {
        let registry = HandlerRegistry::default();
        assert!(registry.is_registered(CommandId::DeliverSm));
        assert!(registry.is_registered(CommandId::SubmitSmResp));

        let receipt = DeliverSm::new(3, "1", "2", Bytes::from_static(b"id:abc stat:DELIVRD"))
            .esm_class(EsmClass::delivery_receipt());
        assert_eq!(registry.dispatch(&Frame::DeliverSm(Box::new(receipt))), CommandStatus::Ok);

        // A malformed receipt is logged, not rejected
        let broken = DeliverSm::new(4, "1", "2", Bytes::from_static(b"nonsense"))
            .esm_class(EsmClass::delivery_receipt());
        assert_eq!(registry.dispatch(&Frame::DeliverSm(Box::new(broken))), CommandStatus::Ok);

        let resp = Frame::SubmitSmResp(SubmitSmResponse::new(5, "m-1"));
        assert_eq!(registry.dispatch(&resp), CommandStatus::Ok);
    }

    #[test]
    fn fallback_can_be_replaced() {
        let registry = HandlerRegistry::empty().with_fallback(|_: &Frame| CommandStatus::InvalidCommandId);
        let enquire = Frame::EnquireLink(EnquireLink::new(2));
        assert_eq!(registry.dispatch(&enquire), CommandStatus::InvalidCommandId);
    }
}
