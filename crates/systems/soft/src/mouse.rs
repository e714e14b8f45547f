//! PS/2 mouse packet queue

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use vdp_core::logging::{log, LogCategory, LogLevel};
use vdp_core::types::MousePacket;
use vdp_core::MousePipeline;

pub const DEFAULT_MOUSE_QUEUE: usize = 64;

pub struct Ps2Mouse {
    packets: Mutex<VecDeque<MousePacket>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl Ps2Mouse {
    pub fn new() -> Self {
        Self {
            packets: Mutex::new(VecDeque::with_capacity(DEFAULT_MOUSE_QUEUE)),
            capacity: DEFAULT_MOUSE_QUEUE,
            dropped: AtomicU64::new(0),
        }
    }

    fn packets(&self) -> MutexGuard<'_, VecDeque<MousePacket>> {
        self.packets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn next_packet(&self) -> Option<MousePacket> {
        self.packets().pop_front()
    }

    pub fn pending(&self) -> usize {
        self.packets().len()
    }

    pub fn clear(&self) {
        self.packets().clear();
    }

    /// Packets lost to a full queue since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for Ps2Mouse {
    fn default() -> Self {
        Self::new()
    }
}

impl MousePipeline for Ps2Mouse {
    fn inject_packet(&self, packet: MousePacket) {
        let mut packets = self.packets();
        if packets.len() >= self.capacity {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log(LogCategory::Mouse, LogLevel::Warn, || {
                format!("queue full, dropped packet {:02X?}", packet.0)
            });
            return;
        }
        packets.push_back(packet);
    }
}
