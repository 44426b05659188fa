//! Bounded FIFO message queue with drop-oldest backpressure.

use acarshub_protocol::{DecoderType, EnrichedMessage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 15;
const EVENT_CAP: usize = 256;

#[derive(Debug, Clone, Copy, Default)]
struct Counter {
    last_minute: u64,
    total: u64,
}

/// Snapshot of queue counters, safe for callers to hold and mutate freely —
/// it owns no reference into the queue's internal state.
#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pub last_minute: [u64; 5],
    pub total: [u64; 5],
    pub error_total: u64,
    pub overflow: u64,
}

fn decoder_index(t: DecoderType) -> usize {
    match t {
        DecoderType::Acars => 0,
        DecoderType::Vdlm2 => 1,
        DecoderType::Hfdl => 2,
        DecoderType::Imsl => 3,
        DecoderType::Irdm => 4,
    }
}

/// Event emitted on every `push`.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub message: EnrichedMessage,
    pub pushed_at: i64,
}

struct Inner {
    buffer: VecDeque<EnrichedMessage>,
    capacity: usize,
    counters: [Counter; 5],
    error_total: u64,
    overflow: u64,
}

/// The queue owns its ring buffer exclusively; producers and consumers hold
/// no references to internal nodes, only clones of this handle.
#[derive(Clone)]
pub struct MessageQueue {
    inner: Arc<Mutex<Inner>>,
    tx: broadcast::Sender<QueuedMessage>,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAP);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                        buffer: VecDeque::with_capacity(capacity),
                        capacity,
                        counters: [Counter::default(); 5],
                        error_total: 0,
                        overflow: 0,
            })),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueuedMessage> {
        self.tx.subscribe()
    }

    /// Append a message; if at capacity, drop the oldest and count the
    /// overflow. Updates the per-decoder `lastMinute`/`total` counters and
    /// the cumulative error counter, then emits the push event.
    pub fn push(&self, message: EnrichedMessage, pushed_at: i64) {
        let idx = decoder_index(message.message.message_type);
        let error = message.message.error;

        {
            let mut inner = self.inner.lock().unwrap();
            if inner.buffer.len() >= inner.capacity {
                inner.buffer.pop_front();
                inner.overflow += 1;
            }
            inner.buffer.push_back(message.clone());
            inner.counters[idx].last_minute += 1;
            inner.counters[idx].total += 1;
            if error > 0 {
                inner.error_total += error as u64;
            }
        }

        let _ = self.tx.send(QueuedMessage { message, pushed_at });
        debug!(decoder = ?idx, "queued message");
    }

    pub fn pop(&self) -> Option<EnrichedMessage> {
        self.inner.lock().unwrap().buffer.pop_front()
    }

    pub fn pop_all(&self) -> Vec<EnrichedMessage> {
        let mut inner = self.inner.lock().unwrap();
        inner.buffer.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current counters. The writer that persists a time-series
    /// row must call this, then [`Self::reset_minute_stats`] itself — there
    /// is no independent timer resetting counters, so a write can never
    /// race a reset and persist zeros.
    pub fn get_stats(&self) -> QueueStats {
        let inner = self.inner.lock().unwrap();
        let mut last_minute = [0u64; 5];
        let mut total = [0u64; 5];
        for (i, c) in inner.counters.iter().enumerate() {
            last_minute[i] = c.last_minute;
            total[i] = c.total;
        }
        QueueStats {
            last_minute,
            total,
            error_total: inner.error_total,
            overflow: inner.overflow,
        }
    }

    pub fn reset_minute_stats(&self) {
        let mut inner = self.inner.lock().unwrap();
        for c in &mut inner.counters {
            c.last_minute = 0;
        }
    }

    pub fn clear_stats(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.counters = [Counter::default(); 5];
        inner.error_total = 0;
        inner.overflow = 0;
    }

    /// Clears the buffer and drops all subscribers; stats are preserved.
    pub fn destroy(&self) {
        self.inner.lock().unwrap().buffer.clear();
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acarshub_protocol::CanonicalMessage;

    fn msg(message_type: DecoderType, error: i64) -> EnrichedMessage {
        let mut m = CanonicalMessage::new(message_type, 0);
        m.error = error;
        EnrichedMessage {
            message: m,
            icao_hex: None,
            airline: None,
            iata_flight: None,
            icao_flight: None,
            flight_number: None,
            toaddr_hex: None,
            toaddr_decoded: None,
            fromaddr_hex: None,
            fromaddr_decoded: None,
            label_type: "Unknown Message Label".to_owned(),
        }
    }

    #[test]
    fn push_beyond_capacity_drops_oldest_and_counts_overflow() {
        let q = MessageQueue::new(2);
        q.push(msg(DecoderType::Acars, 0), 0);
        q.push(msg(DecoderType::Acars, 0), 1);
        q.push(msg(DecoderType::Acars, 0), 2);
        assert_eq!(q.len(), 2);
        assert_eq!(q.get_stats().overflow, 1);
    }

    #[test]
    fn per_decoder_counters_increment_independently() {
        let q = MessageQueue::new(15);
        q.push(msg(DecoderType::Acars, 0), 0);
        q.push(msg(DecoderType::Vdlm2, 0), 0);
        q.push(msg(DecoderType::Vdlm2, 0), 0);
        let stats = q.get_stats();
        assert_eq!(stats.last_minute[decoder_index(DecoderType::Acars)], 1);
        assert_eq!(stats.last_minute[decoder_index(DecoderType::Vdlm2)], 2);
    }

    #[test]
    fn positive_error_field_accumulates_into_error_total() {
        let q = MessageQueue::new(15);
        q.push(msg(DecoderType::Acars, 2), 0);
        q.push(msg(DecoderType::Acars, 1), 0);
        assert_eq!(q.get_stats().error_total, 3);
    }

    #[test]
    fn reset_minute_stats_zeros_last_minute_but_not_total() {
        let q = MessageQueue::new(15);
        q.push(msg(DecoderType::Acars, 0), 0);
        q.reset_minute_stats();
        let stats = q.get_stats();
        assert_eq!(stats.last_minute[decoder_index(DecoderType::Acars)], 0);
        assert_eq!(stats.total[decoder_index(DecoderType::Acars)], 1);
    }

    #[test]
    fn clear_stats_zeros_everything() {
        let q = MessageQueue::new(15);
        q.push(msg(DecoderType::Acars, 3), 0);
        q.clear_stats();
        let stats = q.get_stats();
        assert_eq!(stats.total[decoder_index(DecoderType::Acars)], 0);
        assert_eq!(stats.error_total, 0);
    }

    #[test]
    fn destroy_clears_buffer_but_preserves_stats() {
        let q = MessageQueue::new(15);
        q.push(msg(DecoderType::Acars, 0), 0);
        q.destroy();
        assert!(q.is_empty());
        assert_eq!(q.get_stats().total[decoder_index(DecoderType::Acars)], 1);
    }

    #[test]
    fn subscribers_receive_pushed_messages() {
        let q = MessageQueue::new(15);
        let mut rx = q.subscribe();
        q.push(msg(DecoderType::Acars, 0), 42);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.pushed_at, 42);
    }
}
