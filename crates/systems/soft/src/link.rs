//! Host <-> VDP byte link
//!
//! Two independent FIFOs. The host side is the `HostLink` impl the adapter
//! forwards to; the VDP side (`take_from_host` / `send_to_host`) is used by
//! the subsystem's service tick. Each direction is bounded; bytes that
//! arrive at a full queue are dropped and counted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use vdp_core::logging::{log, LogCategory, LogLevel};
use vdp_core::HostLink;

fn lock(q: &Mutex<VecDeque<u8>>) -> MutexGuard<'_, VecDeque<u8>> {
    q.lock().unwrap_or_else(PoisonError::into_inner)
}

pub const DEFAULT_LINK_QUEUE: usize = 4096;

pub struct SerialLink {
    to_vdp: Mutex<VecDeque<u8>>,
    from_vdp: Mutex<VecDeque<u8>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl SerialLink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LINK_QUEUE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_vdp: Mutex::new(VecDeque::new()),
            from_vdp: Mutex::new(VecDeque::new()),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Push what fits, count the rest.
    fn enqueue(&self, queue: &Mutex<VecDeque<u8>>, bytes: &[u8], direction: &str) {
        let mut q = lock(queue);
        let room = self.capacity.saturating_sub(q.len());
        let (kept, lost) = bytes.split_at(room.min(bytes.len()));
        q.extend(kept.iter().copied());
        if !lost.is_empty() {
            self.dropped.fetch_add(lost.len() as u64, Ordering::Relaxed);
            log(LogCategory::Link, LogLevel::Warn, || {
                format!("{} queue full, dropped {} bytes", direction, lost.len())
            });
        }
    }

    /// VDP side: next byte the host sent
    pub fn take_from_host(&self) -> Option<u8> {
        lock(&self.to_vdp).pop_front()
    }

    /// VDP side: queue bytes for the host
    pub fn send_to_host(&self, bytes: &[u8]) {
        log(LogCategory::Link, LogLevel::Trace, || {
            format!("vdp -> host {:02X?}", bytes)
        });
        self.enqueue(&self.from_vdp, bytes, "vdp -> host");
    }

    pub fn pending_to_vdp(&self) -> usize {
        lock(&self.to_vdp).len()
    }

    pub fn pending_to_host(&self) -> usize {
        lock(&self.from_vdp).len()
    }

    /// Bytes lost to a full queue in either direction since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        lock(&self.to_vdp).clear();
        lock(&self.from_vdp).clear();
    }
}

impl Default for SerialLink {
    fn default() -> Self {
        Self::new()
    }
}

impl HostLink for SerialLink {
    fn send_to_vdp(&self, byte: u8) {
        log(LogCategory::Link, LogLevel::Trace, || {
            format!("host -> vdp {:02X}", byte)
        });
        self.enqueue(&self.to_vdp, &[byte], "host -> vdp");
    }

    fn recv_from_vdp(&self) -> Option<u8> {
        lock(&self.from_vdp).pop_front()
    }
}
