//! Sender engine: sequencing, the Selective-Repeat send window, acknowledgement
//! processing, and retransmission (spec §4.2).

use std::collections::BTreeMap;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::constants::{MAX_PAYLOAD_SIZE, MAX_RETRIES, POLL_INTERVAL, TIMEOUT, WINDOW_SIZE};
use crate::error::{HudpError, Result};
use crate::packet::{ChannelType, Packet};

struct WindowEntry {
    payload: Box<[u8]>,
    timestamp: f64,
    retries: u32,
}

struct SenderState {
    send_base: u32,
    next_seq: u32,
    window: BTreeMap<u32, WindowEntry>,
}

/// Owns the outbound sequence counters, the unacknowledged send window, and the
/// two background workers (acknowledgement consumer, retransmission timer)
/// that keep the window moving.
pub struct Sender {
    socket: Arc<UdpSocket>,
    peer_addr: SocketAddr,
    state: Mutex<SenderState>,
    cv: Condvar,
    unreliable_seq: AtomicU32,
    shutdown: Arc<AtomicBool>,
}

impl Sender {
    /// Creates a sender targeting `peer_addr` over `socket`, sharing `shutdown`
    /// with the rest of the endpoint.
    pub fn new(socket: Arc<UdpSocket>, peer_addr: SocketAddr, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            socket,
            peer_addr,
            state: Mutex::new(SenderState {
                send_base: 0,
                next_seq: 0,
                window: BTreeMap::new(),
            }),
            cv: Condvar::new(),
            unreliable_seq: AtomicU32::new(0),
            shutdown,
        }
    }

    /// Sends a fire-and-forget unreliable packet. Never blocks.
    pub fn send_unreliable(&self, payload: &[u8]) -> Result<u32> {
        check_payload_size(payload)?;

        if self.shutdown.load(Ordering::Acquire) {
            return Err(HudpError::EndpointClosed);
        }

        let seq = self.unreliable_seq.fetch_add(1, Ordering::Relaxed);
        let packet = Packet {
            channel_type: ChannelType::Unreliable,
            seq_num: seq,
            ack_num: 0,
            timestamp: Packet::now_secs(),
            payload: payload.into(),
        };

        self.transmit(&packet);

        Ok(seq)
    }

    /// Sends a reliable packet, suspending the caller until the send window
    /// has room (or the endpoint closes). Per spec §5, this is the only
    /// suspension point with no per-call timeout: it waits indefinitely for
    /// window space until [`Sender::wake_all`] is called by endpoint close.
    pub fn send_reliable(&self, payload: &[u8]) -> Result<u32> {
        check_payload_size(payload)?;

        let mut guard = self.state.lock().unwrap();

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return Err(HudpError::EndpointClosed);
            }

            if guard.next_seq - guard.send_base < WINDOW_SIZE {
                break;
            }

            let (g, _timeout) = self.cv.wait_timeout(guard, POLL_INTERVAL).unwrap();
            guard = g;
        }

        let seq = guard.next_seq;
        guard.next_seq = guard.next_seq.wrapping_add(1);

        let now = Packet::now_secs();
        guard.window.insert(
            seq,
            WindowEntry {
                payload: payload.into(),
                timestamp: now,
                retries: 0,
            },
        );

        drop(guard);

        let packet = Packet {
            channel_type: ChannelType::Reliable,
            seq_num: seq,
            ack_num: 0,
            timestamp: now,
            payload: payload.into(),
        };
        self.transmit(&packet);

        Ok(seq)
    }

    /// Applies an acknowledgement for `ack_num`, sliding `send_base` forward
    /// through any sequences no longer present in the window. Duplicate or
    /// stale acknowledgements (not currently in the window) are ignored.
    pub fn handle_ack(&self, ack_num: u32) {
        let mut guard = self.state.lock().unwrap();

        if guard.window.remove(&ack_num).is_none() {
            return;
        }

        slide_send_base(&mut guard);

        drop(guard);
        self.cv.notify_all();
    }

    /// Scans the window for entries past their retransmission deadline,
    /// retransmitting or dropping each as appropriate. Intended to be called
    /// roughly every [`crate::constants::POLL_INTERVAL`] by a background
    /// worker.
    fn retransmit_tick(&self) {
        let now = Packet::now_secs();
        let timeout_secs = TIMEOUT.as_secs_f64();

        let mut to_retransmit = Vec::new();
        let mut to_drop = Vec::new();

        {
            let mut guard = self.state.lock().unwrap();

            for (&seq, entry) in guard.window.iter_mut() {
                if now - entry.timestamp < timeout_secs {
                    continue;
                }

                if entry.retries >= MAX_RETRIES {
                    to_drop.push(seq);
                } else {
                    entry.timestamp = now;
                    entry.retries += 1;
                    to_retransmit.push((seq, entry.payload.clone(), entry.retries));
                }
            }

            for seq in &to_drop {
                guard.window.remove(seq);
            }

            if !to_drop.is_empty() {
                slide_send_base(&mut guard);
            }
        }

        if !to_drop.is_empty() {
            self.cv.notify_all();
        }

        for seq in to_drop {
            tracing::debug!(seq, "reliable sequence dropped after exhausting retries");
        }

        for (seq, payload, retries) in to_retransmit {
            let packet = Packet {
                channel_type: ChannelType::Reliable,
                seq_num: seq,
                ack_num: 0,
                timestamp: now,
                payload,
            };
            tracing::debug!(seq, retries, "retransmitting reliable packet");
            self.transmit(&packet);
        }
    }

    fn transmit(&self, packet: &Packet) {
        let bytes = packet.serialize();
        if let Err(e) = self.socket.send_to(&bytes, self.peer_addr) {
            tracing::warn!(error = %e, "transient error sending frame");
        }
    }

    /// Wakes every thread blocked in [`Sender::send_reliable`]; called once by
    /// endpoint close so they observe the shutdown flag and return promptly.
    pub fn wake_all(&self) {
        self.cv.notify_all();
    }

    /// Number of unacknowledged sequences currently held in the window.
    /// Exposed for the window-bound invariant test (spec §8, invariant 3).
    pub fn window_len(&self) -> usize {
        self.state.lock().unwrap().window.len()
    }

    /// Spawns the acknowledgement consumer and retransmission timer workers,
    /// returning their join handles. `ack_rx` is fed by the receiver's ingress
    /// worker, which is the sole socket reader (spec §9).
    pub fn spawn_workers(
        self: &Arc<Self>,
        ack_rx: mpsc::Receiver<u32>,
    ) -> Vec<JoinHandle<()>> {
        let ack_sender = Arc::clone(self);
        let ack_shutdown = Arc::clone(&self.shutdown);
        let ack_worker = thread::spawn(move || loop {
            if ack_shutdown.load(Ordering::Acquire) {
                break;
            }
            match ack_rx.recv_timeout(POLL_INTERVAL) {
                Ok(ack_num) => ack_sender.handle_ack(ack_num),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        let retransmit_sender = Arc::clone(self);
        let retransmit_shutdown = Arc::clone(&self.shutdown);
        let retransmit_worker = thread::spawn(move || loop {
            if retransmit_shutdown.load(Ordering::Acquire) {
                break;
            }
            retransmit_sender.retransmit_tick();
            thread::sleep(POLL_INTERVAL);
        });

        vec![ack_worker, retransmit_worker]
    }
}

/// Creates the internal channel used to forward acknowledgement frames from
/// the receiver's ingress worker to the sender's acknowledgement consumer.
pub fn ack_channel() -> (mpsc::Sender<u32>, mpsc::Receiver<u32>) {
    mpsc::channel()
}

fn slide_send_base(state: &mut SenderState) {
    while state.send_base < state.next_seq && !state.window.contains_key(&state.send_base) {
        state.send_base = state.send_base.wrapping_add(1);
    }
}

fn check_payload_size(payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        Err(HudpError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        })
    } else {
        Ok(())
    }
}
