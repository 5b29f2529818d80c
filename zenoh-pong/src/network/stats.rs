//! Bus traffic counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Point-in-time copy of the bus counters
#[derive(Debug, Clone)]
pub struct BusStatsSnapshot {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Sends the transport refused
    pub send_failures: u64,
    /// Received frames dropped by the codec
    pub decode_drops: u64,
    pub start_time: Instant,
}

impl BusStatsSnapshot {
    /// Sent frames per second since the counters started
    pub fn send_rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.frames_sent as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Received frames per second since the counters started
    pub fn receive_rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.frames_received as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for BusStatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TX: {} frames ({:.0}/s, {} failed), RX: {} frames ({:.0}/s, {} dropped)",
            self.frames_sent,
            self.send_rate(),
            self.send_failures,
            self.frames_received,
            self.receive_rate(),
            self.decode_drops
        )
    }
}

/// Thread-safe bus counters
///
/// Uses atomic operations for lock-free concurrent updates
#[derive(Debug)]
pub struct BusStats {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    send_failures: AtomicU64,
    decode_drops: AtomicU64,
    start_time: Instant,
}

impl BusStats {
    pub fn new() -> Self {
        Self {
            frames_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            decode_drops: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_sent(&self, payload_len: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(payload_len as u64, Ordering::Relaxed);
    }

    pub fn record_received(&self, payload_len: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(payload_len as u64, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_drop(&self) {
        self.decode_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BusStatsSnapshot {
        BusStatsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            decode_drops: self.decode_drops.load(Ordering::Relaxed),
            start_time: self.start_time,
        }
    }
}

impl Default for BusStats {
    fn default() -> Self {
        Self::new()
    }
}
