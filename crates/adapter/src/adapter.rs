//! The boundary adapter
//!
//! `VdpAdapter` owns one subsystem and the bindings its setup hands back.
//! Every operation is forwarded synchronously; the adapter keeps no frame
//! or input state of its own.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use vdp_core::logging::{log, LogCategory, LogLevel};
use vdp_core::types::{MousePacket, Rect, MAX_HEIGHT, MAX_WIDTH};
use vdp_core::{Result, VdpBindings, VdpError, VdpSubsystem};

/// Process-lifetime state machine: Uninitialized -> Ready -> ShutDown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    ShutDown,
}

/// The four operations a foreign host depends on.
pub trait VdpBoundary {
    /// One-time initialization. Must precede every other call.
    fn setup(&mut self) -> Result<()>;

    /// One cooperative service tick.
    fn tick(&self) -> Result<()>;

    /// Forward one make-code key transition.
    fn send_scancode(&self, code: u16, is_down: bool) -> Result<()>;

    /// Capture the full current frame into `buffer` as RGB888 and return
    /// its geometry.
    fn copy_framebuffer(&self, buffer: &mut [u8]) -> Result<(u32, u32)>;
}

#[derive(Default)]
struct AdapterStats {
    ticks: AtomicU64,
    scancodes: AtomicU64,
    captures: AtomicU64,
    vblanks: AtomicU64,
    mouse_packets: AtomicU64,
    bytes_to_vdp: AtomicU64,
    bytes_from_vdp: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub struct VdpAdapter<S: VdpSubsystem> {
    subsystem: Mutex<S>,
    bindings: Option<VdpBindings>,
    state: LifecycleState,
    stats: AdapterStats,
}

impl<S: VdpSubsystem> VdpAdapter<S> {
    pub fn new(subsystem: S) -> Self {
        Self {
            subsystem: Mutex::new(subsystem),
            bindings: None,
            state: LifecycleState::Uninitialized,
            stats: AdapterStats::default(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    fn subsystem(&self) -> MutexGuard<'_, S> {
        self.subsystem.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subsystem_mut(&mut self) -> &mut S {
        self.subsystem.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn ready(&self) -> Result<&VdpBindings> {
        match (self.state, self.bindings.as_ref()) {
            (LifecycleState::Ready, Some(bindings)) => Ok(bindings),
            (LifecycleState::ShutDown, _) => Err(VdpError::ShutDown),
            _ => Err(VdpError::NotInitialized),
        }
    }

    /// Borrow the subsystem, e.g. to read implementation-specific status.
    /// Blocks while a tick is running.
    pub fn with_subsystem<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.subsystem())
    }

    /// Choose the mode setup starts in. Only valid before setup.
    pub fn set_startup_mode(&mut self, mode: u32) -> Result<()> {
        match self.state {
            LifecycleState::Uninitialized => self.subsystem_mut().set_startup_mode(mode),
            LifecycleState::Ready => Err(VdpError::AlreadyInitialized),
            LifecycleState::ShutDown => Err(VdpError::ShutDown),
        }
    }

    pub fn signal_vblank(&self) -> Result<()> {
        self.ready()?;
        self.subsystem().signal_vblank();
        bump(&self.stats.vblanks);
        Ok(())
    }

    pub fn send_mouse_packet(&self, packet: MousePacket) -> Result<()> {
        let mouse = self
            .ready()?
            .mouse
            .as_ref()
            .ok_or(VdpError::Unsupported("mouse"))?;
        mouse.inject_packet(packet);
        bump(&self.stats.mouse_packets);
        log(LogCategory::Mouse, LogLevel::Trace, || {
            format!(
                "status {:02X} dx {} dy {} wheel {}",
                packet.status(),
                packet.dx(),
                packet.dy(),
                packet.wheel()
            )
        });
        Ok(())
    }

    /// Queue one byte for the VDP.
    pub fn send_byte(&self, byte: u8) -> Result<()> {
        let link = self
            .ready()?
            .link
            .as_ref()
            .ok_or(VdpError::Unsupported("host link"))?;
        link.send_to_vdp(byte);
        bump(&self.stats.bytes_to_vdp);
        Ok(())
    }

    /// Next byte from the VDP, if one is waiting. Never blocks.
    pub fn recv_byte(&self) -> Result<Option<u8>> {
        let link = self
            .ready()?
            .link
            .as_ref()
            .ok_or(VdpError::Unsupported("host link"))?;
        let byte = link.recv_from_vdp();
        if byte.is_some() {
            bump(&self.stats.bytes_from_vdp);
        }
        Ok(byte)
    }

    /// Allowed in any state.
    pub fn set_debug_logging(&self, enabled: bool) {
        self.subsystem().set_debug_logging(enabled);
    }

    /// Tear down. Terminal: there is no way back to Ready.
    pub fn shutdown(&mut self) -> Result<()> {
        self.ready()?;
        self.subsystem_mut().shutdown();
        self.bindings = None;
        self.state = LifecycleState::ShutDown;
        log(LogCategory::Lifecycle, LogLevel::Info, || {
            format!(
                "shut down after {} ticks, {} captures",
                self.stats.ticks.load(Ordering::Relaxed),
                self.stats.captures.load(Ordering::Relaxed)
            )
        });
        Ok(())
    }

    /// Give the subsystem back. Used when a registry entry is removed.
    pub fn into_subsystem(self) -> S {
        self.subsystem
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn debug_state(&self) -> Value {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        json!({
            "state": self.state,
            "subsystem": self.subsystem().name(),
            "ticks": load(&self.stats.ticks),
            "scancodes": load(&self.stats.scancodes),
            "captures": load(&self.stats.captures),
            "vblanks": load(&self.stats.vblanks),
            "mouse_packets": load(&self.stats.mouse_packets),
            "bytes_to_vdp": load(&self.stats.bytes_to_vdp),
            "bytes_from_vdp": load(&self.stats.bytes_from_vdp),
        })
    }
}

impl<S: VdpSubsystem> VdpBoundary for VdpAdapter<S> {
    fn setup(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Uninitialized => {}
            LifecycleState::Ready => return Err(VdpError::AlreadyInitialized),
            LifecycleState::ShutDown => return Err(VdpError::ShutDown),
        }

        let bindings = self.subsystem_mut().setup()?;
        self.bindings = Some(bindings);
        self.state = LifecycleState::Ready;
        log(LogCategory::Lifecycle, LogLevel::Info, || {
            format!("{} ready", self.subsystem().name())
        });
        Ok(())
    }

    fn tick(&self) -> Result<()> {
        self.ready()?;
        self.subsystem().service();
        bump(&self.stats.ticks);
        Ok(())
    }

    fn send_scancode(&self, code: u16, is_down: bool) -> Result<()> {
        self.ready()?.keyboard.inject_scancode(code, is_down);
        bump(&self.stats.scancodes);
        log(LogCategory::Keyboard, LogLevel::Debug, || {
            format!("scancode {:04X} {}", code, if is_down { "down" } else { "up" })
        });
        Ok(())
    }

    fn copy_framebuffer(&self, buffer: &mut [u8]) -> Result<(u32, u32)> {
        let bindings = self.ready()?;

        // Geometry and pixels must come from the same locked view
        let screen = bindings.display.lock();
        let width = screen.screen_width();
        let height = screen.screen_height();
        if width > MAX_WIDTH || height > MAX_HEIGHT {
            return Err(VdpError::GeometryTooLarge { width, height });
        }
        let rect = Rect::full_frame(width, height);
        let required = rect.byte_len();

        if buffer.len() < required {
            log(LogCategory::Display, LogLevel::Warn, || {
                format!(
                    "capture buffer {} bytes, {}x{} needs {}",
                    buffer.len(),
                    width,
                    height,
                    required
                )
            });
            return Err(VdpError::BufferTooSmall {
                required,
                actual: buffer.len(),
            });
        }
        if !rect.is_empty() {
            screen.read_screen(rect, &mut buffer[..required])?;
        }
        drop(screen);

        bump(&self.stats.captures);
        log(LogCategory::Display, LogLevel::Trace, || {
            format!("captured {}x{}", width, height)
        });
        Ok((width, height))
    }
}
