//! Outbound queue for envelopes emitted while no transport is available.

use roomlink_proto::Envelope;
use std::collections::VecDeque;
use tracing::warn;

/// FIFO buffer of not-yet-transmitted envelopes.
///
/// With a non-zero capacity the oldest envelope is evicted to make room for
/// a new one. A capacity of zero means unbounded.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    items: VecDeque<Envelope>,
    capacity: usize,
    evicted: u64,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
            evicted: 0,
        }
    }

    /// Append to the tail. Returns the evicted head if the queue was full.
    pub fn enqueue(&mut self, envelope: Envelope) -> Option<Envelope> {
        let evicted = if self.capacity > 0 && self.items.len() >= self.capacity {
            self.evicted += 1;
            crate::metrics::record_eviction();
            let dropped = self.items.pop_front();
            if let Some(ref env) = dropped {
                warn!(event = %env.event, capacity = self.capacity, "Outbound queue full, evicting oldest envelope");
            }
            dropped
        } else {
            None
        };
        self.items.push_back(envelope);
        crate::metrics::record_queued();
        evicted
    }

    /// Pop every envelope present at call time into `sink`, head first.
    ///
    /// Envelopes appended while draining stay queued for the next drain.
    pub fn drain_into<F>(&mut self, mut sink: F) -> usize
    where
        F: FnMut(Envelope),
    {
        let pending = self.items.len();
        for _ in 0..pending {
            match self.items.pop_front() {
                Some(env) => sink(env),
                None => break,
            }
        }
        pending
    }

    /// Like [`drain_into`](Self::drain_into), but stops at the first
    /// envelope `sink` hands back. That envelope returns to the head, so
    /// order is kept for the next drain. Returns the number delivered.
    pub fn try_drain_into<F>(&mut self, mut sink: F) -> usize
    where
        F: FnMut(Envelope) -> Result<(), Envelope>,
    {
        let pending = self.items.len();
        let mut delivered = 0;
        while delivered < pending {
            let Some(env) = self.items.pop_front() else {
                break;
            };
            if let Err(env) = sink(env) {
                self.items.push_front(env);
                break;
            }
            delivered += 1;
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total envelopes evicted over the queue's lifetime.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Discard everything without delivering it.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(n: i64) -> Envelope {
        Envelope::new("message", json!(n))
    }

    #[test]
    fn drains_in_fifo_order() {
        let mut queue = OutboundQueue::new(0);
        for n in 0..5 {
            queue.enqueue(env(n));
        }

        let mut out = Vec::new();
        assert_eq!(queue.drain_into(|e| out.push(e.payload)), 5);
        assert_eq!(out, vec![json!(0), json!(1), json!(2), json!(3), json!(4)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_drain_is_noop() {
        let mut queue = OutboundQueue::new(0);
        let mut calls = 0;
        assert_eq!(queue.drain_into(|_| calls += 1), 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn full_queue_evicts_oldest() {
        let mut queue = OutboundQueue::new(2);
        assert!(queue.enqueue(env(1)).is_none());
        assert!(queue.enqueue(env(2)).is_none());
        let dropped = queue.enqueue(env(3)).unwrap();

        assert_eq!(dropped.payload, json!(1));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.evicted(), 1);

        let mut out = Vec::new();
        queue.drain_into(|e| out.push(e.payload));
        assert_eq!(out, vec![json!(2), json!(3)]);
    }

    #[test]
    fn rejected_envelope_stays_at_head() {
        let mut queue = OutboundQueue::new(0);
        for n in 0..4 {
            queue.enqueue(env(n));
        }

        let mut out = Vec::new();
        let delivered = queue.try_drain_into(|e| {
            if e.payload == json!(2) {
                return Err(e);
            }
            out.push(e.payload);
            Ok(())
        });
        assert_eq!(delivered, 2);
        assert_eq!(out, vec![json!(0), json!(1)]);

        let mut rest = Vec::new();
        queue.drain_into(|e| rest.push(e.payload));
        assert_eq!(rest, vec![json!(2), json!(3)]);
    }

    #[test]
    fn drained_envelopes_are_delivered_once() {
        let mut queue = OutboundQueue::new(0);
        queue.enqueue(env(7));

        let mut first = Vec::new();
        queue.drain_into(|e| first.push(e));
        let mut second = Vec::new();
        queue.drain_into(|e| second.push(e));

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}
