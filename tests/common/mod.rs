//! A deterministic, injectable network simulator for the end-to-end scenarios
//! in spec §8 (S1–S6): a relay thread that two [`hudp::Endpoint`]s send
//! through instead of to each other directly, so loss/reorder/duplication can
//! be applied on the wire without touching the transport under test.
//!
//! Modeled on the router thread in the teacher crate's own reliability tests:
//! a single socket classifies traffic by source address and forwards it to
//! the other side, optionally dropping or reordering along the way.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hudp::packet::{ChannelType, Packet};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    AtoB,
    BtoA,
}

/// A relay-side decision point: given the direction and raw datagram bytes,
/// forward zero or more datagrams via `forward`. Implementations may hold
/// state (behind interior mutability) to drop, duplicate, or reorder frames.
pub trait Filter: Send + Sync {
    fn apply(&self, dir: Direction, data: &[u8], forward: &mut dyn FnMut(&[u8]));
}

/// Forwards everything untouched.
pub struct Passthrough;

impl Filter for Passthrough {
    fn apply(&self, _dir: Direction, data: &[u8], forward: &mut dyn FnMut(&[u8])) {
        forward(data);
    }
}

/// Drops the first A→B datagram carrying the given reliable sequence; every
/// later occurrence (i.e. the sender's retransmit) is forwarded normally.
pub struct DropOnce {
    target_seq: u32,
    dropped: Mutex<bool>,
}

impl DropOnce {
    pub fn new(target_seq: u32) -> Self {
        Self {
            target_seq,
            dropped: Mutex::new(false),
        }
    }
}

impl Filter for DropOnce {
    fn apply(&self, dir: Direction, data: &[u8], forward: &mut dyn FnMut(&[u8])) {
        if dir == Direction::AtoB && reliable_seq(data) == Some(self.target_seq) {
            let mut dropped = self.dropped.lock().unwrap();
            if !*dropped {
                *dropped = true;
                return;
            }
        }
        forward(data);
    }
}

/// Drops every A→B datagram carrying the given reliable sequence, forever.
pub struct Blackhole {
    target_seq: u32,
}

impl Blackhole {
    pub fn new(target_seq: u32) -> Self {
        Self { target_seq }
    }
}

impl Filter for Blackhole {
    fn apply(&self, dir: Direction, data: &[u8], forward: &mut dyn FnMut(&[u8])) {
        if dir == Direction::AtoB && reliable_seq(data) == Some(self.target_seq) {
            return;
        }
        forward(data);
    }
}

/// Swaps the wire order of two reliable sequences, once: the first is held
/// back until the second arrives, then both are forwarded with the second
/// ahead of the first.
pub struct Reorder {
    held_seq: u32,
    release_on_seq: u32,
    held: Mutex<Option<Vec<u8>>>,
}

impl Reorder {
    pub fn new(held_seq: u32, release_on_seq: u32) -> Self {
        Self {
            held_seq,
            release_on_seq,
            held: Mutex::new(None),
        }
    }
}

impl Filter for Reorder {
    fn apply(&self, dir: Direction, data: &[u8], forward: &mut dyn FnMut(&[u8])) {
        if dir != Direction::AtoB {
            forward(data);
            return;
        }

        match reliable_seq(data) {
            Some(seq) if seq == self.held_seq => {
                *self.held.lock().unwrap() = Some(data.to_vec());
            }
            Some(seq) if seq == self.release_on_seq => {
                forward(data);
                if let Some(held) = self.held.lock().unwrap().take() {
                    forward(&held);
                }
            }
            _ => forward(data),
        }
    }
}

/// Drops B→A acknowledgement frames unless `allowance` has spare permits,
/// decrementing it once per forwarded ack. Used to simulate withheld
/// acknowledgements for the window-backpressure scenario (S5).
pub struct WithholdAcks {
    allowance: Arc<std::sync::atomic::AtomicUsize>,
}

impl WithholdAcks {
    pub fn new(allowance: Arc<std::sync::atomic::AtomicUsize>) -> Self {
        Self { allowance }
    }
}

impl Filter for WithholdAcks {
    fn apply(&self, dir: Direction, data: &[u8], forward: &mut dyn FnMut(&[u8])) {
        if dir == Direction::BtoA && is_ack_frame(data) {
            let mut permits = self.allowance.load(Ordering::Acquire);
            loop {
                if permits == 0 {
                    return;
                }
                match self.allowance.compare_exchange(
                    permits,
                    permits - 1,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => break,
                    Err(observed) => permits = observed,
                }
            }
        }
        forward(data);
    }
}

fn reliable_seq(data: &[u8]) -> Option<u32> {
    let packet = Packet::deserialize(data).ok()?.into_packet()?;
    (packet.channel_type == ChannelType::Reliable && !packet.payload.is_empty())
        .then_some(packet.seq_num)
}

fn is_ack_frame(data: &[u8]) -> bool {
    match Packet::deserialize(data).ok().and_then(|r| r.into_packet()) {
        Some(p) => p.channel_type == ChannelType::Reliable && p.payload.is_empty(),
        None => false,
    }
}

/// A running relay. Dropping it stops the relay thread.
pub struct Relay {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Relay {
    /// Binds `listen_addr` and forwards datagrams between `peer_a` and
    /// `peer_b` according to `filter`. Endpoints under test must be configured
    /// with `listen_addr` as their *remote* address, not each other's.
    pub fn spawn(listen_addr: SocketAddr, peer_a: SocketAddr, peer_b: SocketAddr, filter: Arc<dyn Filter>) -> Self {
        let socket = UdpSocket::bind(listen_addr).unwrap();
        socket.set_read_timeout(Some(Duration::from_millis(5))).unwrap();

        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_shutdown = Arc::clone(&shutdown);

        let handle = thread::spawn(move || {
            let mut buf = [0u8; hudp::MAX_PACKET_SIZE];

            while !worker_shutdown.load(Ordering::Acquire) {
                let (n, src) = match socket.recv_from(&mut buf) {
                    Ok(v) => v,
                    Err(_) => continue,
                };

                let (dir, dest) = if src == peer_a {
                    (Direction::AtoB, peer_b)
                } else {
                    (Direction::BtoA, peer_a)
                };

                let mut send = |data: &[u8]| {
                    let _ = socket.send_to(data, dest);
                };

                filter.apply(dir, &buf[..n], &mut send);
            }
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Binds an ephemeral UDP port and returns its address, without holding the
/// socket open (best-effort; fine for tests run serially on loopback).
pub fn ephemeral_addr() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap()
}
