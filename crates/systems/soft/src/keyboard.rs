//! PS/2 keyboard input queue
//!
//! Producer side is the adapter (`KeyboardPipeline::inject_scancode`);
//! consumer side is whatever polls the VDP for key events. Events come out
//! in the order they went in. When the queue is full the newest event is
//! dropped and counted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use vdp_core::logging::{log, LogCategory, LogLevel};
use vdp_core::types::ScancodeEvent;
use vdp_core::KeyboardPipeline;

pub const DEFAULT_KEYBOARD_QUEUE: usize = 256;

pub struct Ps2Keyboard {
    events: Mutex<VecDeque<ScancodeEvent>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl Ps2Keyboard {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_KEYBOARD_QUEUE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    fn events(&self) -> MutexGuard<'_, VecDeque<ScancodeEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_data(&self) -> bool {
        !self.events().is_empty()
    }

    pub fn pending(&self) -> usize {
        self.events().len()
    }

    /// Oldest queued event
    pub fn next_event(&self) -> Option<ScancodeEvent> {
        self.events().pop_front()
    }

    pub fn drain(&self) -> Vec<ScancodeEvent> {
        self.events().drain(..).collect()
    }

    pub fn clear(&self) {
        self.events().clear();
    }

    /// Events lost to a full queue since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for Ps2Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardPipeline for Ps2Keyboard {
    fn inject_scancode(&self, code: u16, is_down: bool) {
        let mut events = self.events();
        if events.len() >= self.capacity {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log(LogCategory::Keyboard, LogLevel::Warn, || {
                format!("queue full, dropped scancode {:04X} down={}", code, is_down)
            });
            return;
        }
        events.push_back(ScancodeEvent { code, is_down });
        log(LogCategory::Keyboard, LogLevel::Trace, || {
            format!("scancode {:04X} down={}", code, is_down)
        });
    }
}
