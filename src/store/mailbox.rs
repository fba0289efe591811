//! Per-recipient message queues with store-and-forward semantics.
//!
//! Messages are appended to the recipient's queue when sent and the whole queue
//! is handed out, and removed, when the recipient pulls. Queues are unbounded;
//! a single pull hands out at most one response's worth and leaves the rest.

use crate::core::payload::MESSAGE_RECORD_PREFIX_SIZE;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A message waiting in a mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub sender_id: String,
    /// Random, not guaranteed unique
    pub message_id: u32,
    pub recipient_id: String,
    pub message_type: u8,
    /// Bytes exactly as the sender supplied them
    pub content: Vec<u8>,
}

impl StoredMessage {
    /// Bytes this message occupies in a pull-messages batch
    pub fn record_size(&self) -> usize {
        MESSAGE_RECORD_PREFIX_SIZE + self.content.len()
    }
}

/// Mailboxes keyed by recipient identifier. A missing key is an empty mailbox.
#[derive(Debug, Default)]
pub struct MailboxStore {
    queues: Mutex<HashMap<String, Vec<StoredMessage>>>,
}

impl MailboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<StoredMessage>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message to `recipient_id`'s queue and return its generated id.
    pub fn enqueue(
        &self,
        sender_id: &str,
        recipient_id: &str,
        message_type: u8,
        content: Vec<u8>,
    ) -> u32 {
        let message_id = rand::rng().random::<u32>();
        let message = StoredMessage {
            sender_id: sender_id.to_string(),
            message_id,
            recipient_id: recipient_id.to_string(),
            message_type,
            content,
        };

        let mut queues = self.lock();
        let queue = queues.entry(recipient_id.to_string()).or_default();
        queue.push(message);
        debug!(
            sender_id,
            recipient_id,
            message_id,
            queued = queue.len(),
            "Message stored"
        );
        message_id
    }

    /// Remove and return every message queued for `recipient_id`, oldest first.
    pub fn drain(&self, recipient_id: &str) -> Vec<StoredMessage> {
        self.drain_batch(recipient_id, usize::MAX)
    }

    /// Remove and return the oldest messages whose batch records fit in
    /// `max_bytes`. The oldest message is always taken so a queue cannot stall;
    /// anything left over stays queued in order for the next pull.
    pub fn drain_batch(&self, recipient_id: &str, max_bytes: usize) -> Vec<StoredMessage> {
        let mut queues = self.lock();
        let Some(queue) = queues.get_mut(recipient_id) else {
            return Vec::new();
        };

        let mut used = 0usize;
        let take = queue
            .iter()
            .position(|msg| {
                used = used.saturating_add(msg.record_size());
                used > max_bytes
            })
            .unwrap_or(queue.len())
            .max(1);

        let drained: Vec<StoredMessage> = queue.drain(..take.min(queue.len())).collect();
        let left = queue.len();
        if left == 0 {
            queues.remove(recipient_id);
        }
        debug!(recipient_id, count = drained.len(), left, "Mailbox drained");
        drained
    }

    pub fn pending(&self, recipient_id: &str) -> usize {
        self.lock().get(recipient_id).map_or(0, Vec::len)
    }

    pub fn total_pending(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_fifo_then_empties() {
        let store = MailboxStore::new();
        let a = store.enqueue("s", "r", 3, b"A".to_vec());
        let b = store.enqueue("s", "r", 3, b"B".to_vec());
        let c = store.enqueue("t", "r", 4, b"C".to_vec());
        assert_eq!(store.pending("r"), 3);

        let drained = store.drain("r");
        let ids: Vec<u32> = drained.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, [a, b, c]);
        let contents: Vec<&[u8]> = drained.iter().map(|m| m.content.as_slice()).collect();
        assert_eq!(contents, vec![&b"A"[..], &b"B"[..], &b"C"[..]]);
        assert_eq!(drained[2].sender_id, "t");
        assert_eq!(drained[2].message_type, 4);

        assert!(store.drain("r").is_empty());
        assert_eq!(store.pending("r"), 0);
    }

    #[test]
    fn mailboxes_are_independent() {
        let store = MailboxStore::new();
        store.enqueue("s", "r1", 3, b"x".to_vec());
        store.enqueue("s", "r2", 3, b"y".to_vec());
        assert_eq!(store.total_pending(), 2);

        let r1 = store.drain("r1");
        assert_eq!(r1.len(), 1);
        assert_eq!(r1[0].recipient_id, "r1");
        assert_eq!(store.pending("r2"), 1);
    }

    #[test]
    fn unknown_recipient_drains_empty() {
        let store = MailboxStore::new();
        assert!(store.drain("nobody").is_empty());
    }

    #[test]
    fn content_is_kept_verbatim() {
        let store = MailboxStore::new();
        let raw = vec![0xFF, 0x00, 0x68, 0x69];
        store.enqueue("s", "r", 2, raw.clone());
        let msg = store.drain("r").remove(0);
        assert_eq!(msg.content, raw);
    }

    #[test]
    fn batch_drain_stops_at_the_byte_budget() {
        let store = MailboxStore::new();
        for body in [&b"1111"[..], b"2222", b"3333"] {
            store.enqueue("s", "r", 3, body.to_vec());
        }
        let record = MESSAGE_RECORD_PREFIX_SIZE + 4;

        let first = store.drain_batch("r", 2 * record);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].content, b"1111");
        assert_eq!(first[1].content, b"2222");
        assert_eq!(store.pending("r"), 1);

        let rest = store.drain_batch("r", 2 * record);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].content, b"3333");
        assert_eq!(store.pending("r"), 0);
        assert!(store.drain_batch("r", 2 * record).is_empty());
    }

    #[test]
    fn batch_drain_always_takes_the_oldest_message() {
        let store = MailboxStore::new();
        store.enqueue("s", "r", 4, vec![0u8; 100]);
        store.enqueue("s", "r", 3, b"x".to_vec());

        let batch = store.drain_batch("r", 10);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].content.len(), 100);
        assert_eq!(store.pending("r"), 1);
    }

    #[test]
    fn batch_drain_with_room_to_spare_empties_the_queue() {
        let store = MailboxStore::new();
        store.enqueue("s", "r", 3, b"a".to_vec());
        store.enqueue("s", "r", 3, b"b".to_vec());
        assert_eq!(store.drain_batch("r", usize::MAX).len(), 2);
        assert_eq!(store.total_pending(), 0);
    }
}
