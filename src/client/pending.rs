// ABOUTME: In-flight request table keyed by sequence number, shared by senders and the listener loop
// ABOUTME: Allocates sequence numbers, resolves responses and fails leftovers when the session ends

use crate::client::error::{SmppError, SmppResult};
use crate::codec::Frame;
use crate::datatypes::CommandId;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Highest sequence number; the top bit is left clear for interoperability
pub const MAX_SEQUENCE_NUMBER: u32 = 0x7FFF_FFFF;

/// Metadata kept for each request awaiting its response
#[derive(Debug)]
struct PendingRequest {
    command_id: CommandId,
    submitted_at: Instant,
    responder: oneshot::Sender<SmppResult<Frame>>,
}

#[derive(Debug)]
struct Inner {
    next: u32,
    requests: HashMap<u32, PendingRequest>,
}

/// Sequence allocation and the pending-request map behind one lock, so
/// insert-on-submit and remove-on-response never interleave.
#[derive(Debug)]
pub struct PendingTable {
    inner: Mutex<Inner>,
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next: 1,
                requests: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Nothing inside the lock can panic halfway through an update
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Allocates the next free sequence number and records the request under it
    pub fn register(&self, command_id: CommandId) -> PendingResponse {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.lock();

        let mut sequence_number = inner.next;
        while inner.requests.contains_key(&sequence_number) {
            sequence_number = following(sequence_number);
        }
        inner.next = following(sequence_number);

        inner.requests.insert(
            sequence_number,
            PendingRequest {
                command_id,
                submitted_at: Instant::now(),
                responder: tx,
            },
        );

        PendingResponse {
            sequence_number,
            command_id,
            rx,
        }
    }

    /// Hands `outcome` to the request registered under `sequence_number`.
    ///
    /// Returns false when nothing was waiting on that number.
    pub fn complete(&self, sequence_number: u32, outcome: SmppResult<Frame>) -> bool {
        let Some(request) = self.lock().requests.remove(&sequence_number) else {
            return false;
        };

        debug!(
            sequence_number,
            command = ?request.command_id,
            elapsed_ms = request.submitted_at.elapsed().as_millis() as u64,
            "Request completed"
        );
        // The caller may have stopped waiting; that is not an error here
        let _ = request.responder.send(outcome);
        true
    }

    /// Drops a request without resolving it
    pub fn remove(&self, sequence_number: u32) -> bool {
        self.lock().requests.remove(&sequence_number).is_some()
    }

    /// Command the request under `sequence_number` was issued for
    pub fn command_for(&self, sequence_number: u32) -> Option<CommandId> {
        self.lock()
            .requests
            .get(&sequence_number)
            .map(|request| request.command_id)
    }

    /// Retires every request older than `max_age` with `SmppError::Timeout`
    pub fn expire_older_than(&self, max_age: Duration) -> usize {
        let mut inner = self.lock();
        let expired: Vec<u32> = inner
            .requests
            .iter()
            .filter(|(_, request)| request.submitted_at.elapsed() >= max_age)
            .map(|(&sequence_number, _)| sequence_number)
            .collect();

        for sequence_number in &expired {
            if let Some(request) = inner.requests.remove(sequence_number) {
                warn!(
                    sequence_number,
                    command = ?request.command_id,
                    "No response within {:?}, request retired",
                    max_age
                );
                let _ = request.responder.send(Err(SmppError::Timeout));
            }
        }
        expired.len()
    }

    /// Fails every outstanding request with `ConnectionLost` and empties the table
    pub fn fail_all(&self) -> usize {
        let drained: Vec<(u32, PendingRequest)> = self.lock().requests.drain().collect();
        let count = drained.len();
        for (_, request) in drained {
            let _ = request.responder.send(Err(SmppError::ConnectionLost));
        }
        if count > 0 {
            debug!(count, "Failed outstanding requests");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn following(sequence_number: u32) -> u32 {
    if sequence_number >= MAX_SEQUENCE_NUMBER {
        1
    } else {
        sequence_number + 1
    }
}

/// Handle on one outstanding request.
///
/// Resolves with the response frame, a `generic_nack`, `Decoding` for a
/// response that failed to decode, `Timeout` or `ConnectionLost`.
#[derive(Debug)]
pub struct PendingResponse {
    sequence_number: u32,
    command_id: CommandId,
    rx: oneshot::Receiver<SmppResult<Frame>>,
}

impl PendingResponse {
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub fn command_id(&self) -> CommandId {
        self.command_id
    }

    /// Waits for the outcome without a deadline
    pub async fn response(self) -> SmppResult<Frame> {
        // A dropped sender means the table was torn down without resolving us
        self.rx.await.unwrap_or(Err(SmppError::ConnectionLost))
    }

    /// Waits at most `timeout`, retiring the entry from `table` if it expires
    pub async fn wait(self, table: &PendingTable, timeout: Duration) -> SmppResult<Frame> {
        let sequence_number = self.sequence_number;
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(outcome) => outcome.unwrap_or(Err(SmppError::ConnectionLost)),
            Err(_) => {
                table.remove(sequence_number);
                Err(SmppError::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{EnquireLinkResponse, SubmitSmResponse};

    #[test]
    fn sequence_numbers_start_at_one_and_increase() {
        let table = PendingTable::new();
        let a = table.register(CommandId::SubmitSm);
        let b = table.register(CommandId::SubmitSm);
        assert_eq!(a.sequence_number(), 1);
        assert_eq!(b.sequence_number(), 2);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn allocation_wraps_and_skips_outstanding() {
        let table = PendingTable::new();
        let first = table.register(CommandId::EnquireLink);
        assert_eq!(first.sequence_number(), 1);

        table.lock().next = MAX_SEQUENCE_NUMBER;
        let last = table.register(CommandId::SubmitSm);
        assert_eq!(last.sequence_number(), MAX_SEQUENCE_NUMBER);

        // 1 is still outstanding, so the wrap lands on 2
        let wrapped = table.register(CommandId::SubmitSm);
        assert_eq!(wrapped.sequence_number(), 2);
    }

    #[tokio::test]
    async fn complete_resolves_waiter() {
        let table = PendingTable::new();
        let pending = table.register(CommandId::SubmitSm);
        let seq = pending.sequence_number();

        let frame = Frame::SubmitSmResp(SubmitSmResponse::new(seq, "abc"));
        assert!(table.complete(seq, Ok(frame.clone())));
        assert!(!table.complete(seq, Ok(frame.clone())));

        assert_eq!(pending.response().await.unwrap(), frame);
        assert!(table.is_empty());
    }

    #[test]
    fn unmatched_completion_leaves_table_intact() {
        let table = PendingTable::new();
        let _pending = table.register(CommandId::SubmitSm);

        let stray = Frame::EnquireLinkResp(EnquireLinkResponse::new(999));
        assert!(!table.complete(999, Ok(stray)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.command_for(1), Some(CommandId::SubmitSm));
    }

    #[tokio::test]
    async fn fail_all_reports_connection_lost() {
        let table = PendingTable::new();
        let waiters: Vec<_> = (0..3).map(|_| table.register(CommandId::SubmitSm)).collect();

        assert_eq!(table.fail_all(), 3);
        assert!(table.is_empty());
        for waiter in waiters {
            assert!(matches!(waiter.response().await, Err(SmppError::ConnectionLost)));
        }
    }

    #[tokio::test]
    async fn wait_times_out_and_retires_entry() {
        let table = PendingTable::new();
        let pending = table.register(CommandId::SubmitSm);

        let outcome = pending.wait(&table, Duration::from_millis(10)).await;
        assert!(matches!(outcome, Err(SmppError::Timeout)));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn expire_older_than_times_out_stale_requests() {
        let table = PendingTable::new();
        let stale = table.register(CommandId::SubmitSm);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _fresh = table.register(CommandId::SubmitSm);

        assert_eq!(table.expire_older_than(Duration::from_millis(15)), 1);
        assert_eq!(table.len(), 1);
        assert!(matches!(stale.response().await, Err(SmppError::Timeout)));
    }
}
