//! Receiver engine: the ingress loop, channel demultiplexing, and the shared
//! ready queue consumed by [`crate::Endpoint::recv`] (spec §4.4).

use std::collections::VecDeque;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::constants::{MAX_PACKET_SIZE, POLL_INTERVAL};
use crate::error::{HudpError, Result};
use crate::packet::{ChannelType, Packet};
use crate::receive_buffer::ReceiveBuffer;

/// Outcome of [`Receiver::recv`] / [`crate::Endpoint::recv`]: either a packet
/// was available, or the wait expired with nothing ready.
#[derive(Debug)]
pub enum RecvOutcome {
    /// A packet was delivered from either channel.
    Packet(Packet),
    /// No packet arrived before the requested timeout elapsed.
    Timeout,
}

struct Inner {
    buffer: ReceiveBuffer,
    ready: VecDeque<Packet>,
}

/// Owns the Selective-Repeat receive buffer, the shared ready queue (both
/// channels), and the single socket-reading ingress worker.
///
/// Per the Design Notes' recommended resolution of the dual-reader race
/// (spec §9), this is the *only* component that ever calls `recv_from` on the
/// endpoint's socket. Acknowledgement frames are forwarded to the sender over
/// `ack_tx` rather than being read by a second worker.
pub struct Receiver {
    socket: Arc<UdpSocket>,
    inner: Mutex<Inner>,
    cv: Condvar,
    ack_tx: mpsc::Sender<u32>,
    shutdown: Arc<AtomicBool>,
}

impl Receiver {
    /// Creates a receiver. `socket` must already have a short read timeout set
    /// (see [`crate::endpoint::Endpoint::open`]) so the ingress worker can
    /// observe `shutdown` between reads.
    pub fn new(
        socket: Arc<UdpSocket>,
        skip_threshold: Duration,
        ack_tx: mpsc::Sender<u32>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            socket,
            inner: Mutex::new(Inner {
                buffer: ReceiveBuffer::new(skip_threshold),
                ready: VecDeque::new(),
            }),
            cv: Condvar::new(),
            ack_tx,
            shutdown,
        }
    }

    /// Drains the ready queue, waiting up to `timeout` (or indefinitely if
    /// `None`) for a packet to become available. Re-evaluates the receive
    /// buffer's skip condition on every wake, so a lone out-of-order arrival
    /// can still unblock a caller waiting on the preceding hole.
    pub fn recv(&self, timeout: Option<Duration>) -> Result<RecvOutcome> {
        let deadline = timeout.map(|d| Instant::now() + d);

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return Err(HudpError::EndpointClosed);
            }

            let mut guard = self.inner.lock().unwrap();
            let inner = &mut *guard;
            inner.buffer.poll(&mut inner.ready);

            if let Some(packet) = guard.ready.pop_front() {
                return Ok(RecvOutcome::Packet(packet));
            }

            let wait = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        return Ok(RecvOutcome::Timeout);
                    }
                    std::cmp::min(d - now, POLL_INTERVAL)
                }
                None => POLL_INTERVAL,
            };

            let _ = self.cv.wait_timeout(guard, wait).unwrap();
        }
    }

    /// Number of reliable sequences skipped so far (spec §4.3, §8 invariant 5).
    pub fn skip_count(&self) -> u64 {
        self.inner.lock().unwrap().buffer.skip_count()
    }

    fn handle_datagram(&self, data: &[u8], src: SocketAddr) {
        let raw = match Packet::deserialize(data) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed frame");
                return;
            }
        };

        let packet = match raw.into_packet() {
            Some(p) => p,
            None => return, // unknown channel byte, dropped silently
        };

        match packet.channel_type {
            ChannelType::Reliable if packet.payload.is_empty() => {
                // Acknowledgement frame: forward to the sender, never buffered.
                let _ = self.ack_tx.send(packet.ack_num);
            }
            ChannelType::Reliable => {
                let seq = packet.seq_num;
                {
                    let mut guard = self.inner.lock().unwrap();
                    let inner = &mut *guard;
                    inner.buffer.insert(packet, &mut inner.ready);
                }
                self.cv.notify_all();
                // Acknowledged unconditionally, including duplicates: the
                // peer's retransmit may have crossed our original ack.
                self.send_ack(seq, src);
            }
            ChannelType::Unreliable => {
                self.inner.lock().unwrap().ready.push_back(packet);
                self.cv.notify_all();
            }
        }
    }

    fn send_ack(&self, seq: u32, addr: SocketAddr) {
        let ack = Packet {
            channel_type: ChannelType::Reliable,
            seq_num: 0,
            ack_num: seq,
            timestamp: Packet::now_secs(),
            payload: Box::new([]),
        };
        if let Err(e) = self.socket.send_to(&ack.serialize(), addr) {
            tracing::warn!(error = %e, "transient error sending acknowledgement");
        }
    }

    /// Spawns the ingress worker, which owns all reads on `self.socket` for
    /// the lifetime of the endpoint.
    pub fn spawn_worker(self: &Arc<Self>) -> JoinHandle<()> {
        let receiver = Arc::clone(self);
        let shutdown = Arc::clone(&self.shutdown);

        thread::spawn(move || {
            let mut buf = [0u8; MAX_PACKET_SIZE];

            loop {
                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                match receiver.socket.recv_from(&mut buf) {
                    Ok((n, src)) => receiver.handle_datagram(&buf[..n], src),
                    Err(e)
                        if e.kind() == std::io::ErrorKind::WouldBlock
                            || e.kind() == std::io::ErrorKind::TimedOut =>
                    {
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "transient socket read error");
                        continue;
                    }
                }
            }
        })
    }

    /// Wakes every thread blocked in [`Receiver::recv`]; called once by
    /// endpoint close.
    pub fn wake_all(&self) {
        self.cv.notify_all();
    }
}
