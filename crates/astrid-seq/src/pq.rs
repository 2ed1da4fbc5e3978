//! Deadline-ordered message queue.
//!
//! A binary heap keyed on `(timestamp, insertion seq)`. The sequence
//! number makes the comparator stable: messages with equal timestamps
//! dispatch in the order they arrived.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};

use astrid_core::Message;
use parking_lot::Mutex;

#[derive(Debug)]
struct PqNode {
    msg: Message,
    timestamp: f64,
    seq: u64,
}

impl PartialEq for PqNode {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp.total_cmp(&other.timestamp) == CmpOrdering::Equal && self.seq == other.seq
    }
}

impl Eq for PqNode {}

impl PartialOrd for PqNode {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for PqNode {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.timestamp
            .total_cmp(&other.timestamp)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// The dispatcher's priority queue. The feeder inserts while the
/// dispatcher peeks and pops; one lock covers both.
pub struct MsgPq {
    heap: Mutex<BinaryHeap<Reverse<PqNode>>>,
    seq: AtomicU64,
}

impl Default for MsgPq {
    fn default() -> Self {
        Self::new()
    }
}

impl MsgPq {
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Insert a message keyed on its own timestamp.
    pub fn insert(&self, msg: Message) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let node = PqNode {
            timestamp: msg.timestamp,
            msg,
            seq,
        };
        self.heap.lock().push(Reverse(node));
    }

    /// The earliest-deadline message, if any.
    pub fn peek(&self) -> Option<Message> {
        self.heap.lock().peek().map(|Reverse(node)| node.msg.clone())
    }

    /// Drop the earliest-deadline message.
    pub fn pop(&self) -> Option<Message> {
        self.heap.lock().pop().map(|Reverse(node)| node.msg)
    }

    /// Remove every queued message for `voice_id`, returning how many
    /// were dropped. Collects over the whole heap so no match survives.
    pub fn remove_voice(&self, voice_id: u64) -> usize {
        let mut heap = self.heap.lock();
        let before = heap.len();
        heap.retain(|Reverse(node)| node.msg.voice_id != voice_id);
        before - heap.len()
    }

    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrid_core::MessageKind;

    fn msg_at(timestamp: f64, voice_id: u64) -> Message {
        let mut msg = Message::new(MessageKind::Play, "pulsar").unwrap();
        msg.timestamp = timestamp;
        msg.voice_id = voice_id;
        msg
    }

    #[test]
    fn test_orders_by_timestamp() {
        let pq = MsgPq::new();
        pq.insert(msg_at(0.05, 1));
        pq.insert(msg_at(0.01, 2));
        pq.insert(msg_at(0.10, 3));

        assert_eq!(pq.pop().unwrap().voice_id, 2);
        assert_eq!(pq.pop().unwrap().voice_id, 1);
        assert_eq!(pq.pop().unwrap().voice_id, 3);
        assert!(pq.pop().is_none());
    }

    #[test]
    fn test_equal_timestamps_keep_insertion_order() {
        let pq = MsgPq::new();
        for voice_id in 0..16 {
            pq.insert(msg_at(1.0, voice_id));
        }
        for voice_id in 0..16 {
            assert_eq!(pq.pop().unwrap().voice_id, voice_id);
        }
    }

    #[test]
    fn test_remove_voice_removes_all_matches() {
        let pq = MsgPq::new();
        pq.insert(msg_at(0.1, 7));
        pq.insert(msg_at(0.2, 8));
        pq.insert(msg_at(0.3, 7));
        pq.insert(msg_at(0.4, 7));

        assert_eq!(pq.remove_voice(7), 3);
        assert_eq!(pq.len(), 1);
        assert_eq!(pq.peek().unwrap().voice_id, 8);
    }
}
