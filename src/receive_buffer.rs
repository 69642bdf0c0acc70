//! Selective-Repeat receive buffer (spec §4.3).
//!
//! This type is deliberately socket-free: it only knows about sequence numbers,
//! timestamps, and a ready queue. The [`crate::receiver::Receiver`] engine is
//! the component that wires it to a live socket.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::time::Duration;

use crate::constants::WINDOW_SIZE;
use crate::packet::Packet;

/// Holds out-of-order reliable packets within the Selective-Repeat window,
/// delivering them to a ready queue in sequence order and applying the skip
/// policy when a hole cannot be filled in time.
pub struct ReceiveBuffer {
    rcv_base: u32,
    window_size: u32,
    skip_threshold: Duration,
    buffer: BTreeMap<u32, Packet>,
    skip_count: u64,
}

impl ReceiveBuffer {
    /// Creates a buffer starting at sequence 0 with the given skip deadline.
    pub fn new(skip_threshold: Duration) -> Self {
        Self {
            rcv_base: 0,
            window_size: WINDOW_SIZE,
            skip_threshold,
            buffer: BTreeMap::new(),
            skip_count: 0,
        }
    }

    /// The lowest sequence not yet delivered or skipped.
    pub fn rcv_base(&self) -> u32 {
        self.rcv_base
    }

    /// How many sequences have been skipped (advanced past without delivery).
    pub fn skip_count(&self) -> u64 {
        self.skip_count
    }

    /// Inserts a newly-arrived reliable packet, then runs the delivery and
    /// skip steps. Returns `true` if the packet was within the current window
    /// (accepted, even if it turned out to be a duplicate), `false` if it was
    /// a stale duplicate of an already-delivered/skipped sequence or fell
    /// beyond the window and was rejected.
    ///
    /// Delivered (and only delivered, never skipped) packets are pushed onto
    /// `ready`, in sequence order.
    pub fn insert(&mut self, packet: Packet, ready: &mut VecDeque<Packet>) -> bool {
        let seq = packet.seq_num;

        let accepted = if seq < self.rcv_base {
            false
        } else if seq >= self.rcv_base.saturating_add(self.window_size) {
            false
        } else {
            self.buffer.entry(seq).or_insert(packet);
            true
        };

        self.deliver(ready);
        self.run_skip(ready);

        accepted
    }

    /// Re-evaluates the delivery and skip steps without inserting anything.
    /// Lets a lone out-of-order arrival trigger a skip of the preceding hole
    /// even if no further packet ever arrives (spec §4.3, `next_packet`).
    pub fn poll(&mut self, ready: &mut VecDeque<Packet>) {
        self.deliver(ready);
        self.run_skip(ready);
    }

    fn deliver(&mut self, ready: &mut VecDeque<Packet>) {
        while let Some(packet) = self.buffer.remove(&self.rcv_base) {
            ready.push_back(packet);
            self.rcv_base = self.rcv_base.wrapping_add(1);
        }
    }

    /// Advances `rcv_base` one slot at a time past sequences that have missed
    /// their skip deadline, re-running delivery between each advance so that a
    /// consecutive run after the hole is still delivered in order.
    fn run_skip(&mut self, ready: &mut VecDeque<Packet>) {
        loop {
            if self.buffer.contains_key(&self.rcv_base) {
                // Would have been delivered already; nothing to skip.
                return;
            }

            let next_seq = match self.buffer.keys().find(|&&s| s > self.rcv_base) {
                Some(&s) => s,
                None => return,
            };

            let elapsed = Packet::now_secs() - self.buffer[&next_seq].timestamp;

            if elapsed < self.skip_threshold.as_secs_f64() {
                return;
            }

            tracing::info!(seq = self.rcv_base, "skipped missing reliable sequence");
            self.skip_count += 1;
            self.rcv_base = self.rcv_base.wrapping_add(1);

            self.deliver(ready);
        }
    }
}
