//! Reference VDP subsystem

use crate::controller::SoftVgaController;
use crate::keyboard::Ps2Keyboard;
use crate::link::SerialLink;
use crate::modes::ScreenMode;
use crate::mouse::Ps2Mouse;
use crate::vdu::{VduCommand, VduDecoder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use vdp_core::logging::{log, LogCategory, LogLevel};
use vdp_core::types::Rgb888;
use vdp_core::{Result, VdpBindings, VdpError, VdpSubsystem};

/// Host bytes handled per service tick. Keeps a tick short when the host
/// floods the link.
const LINK_BYTES_PER_TICK: usize = 1024;

/// Packet id the VDP uses to answer a general poll.
const PACKET_GENERAL_POLL: u8 = 0x80;

/// What the controller shows between host commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanoutPattern {
    /// Screen only changes on host commands
    #[default]
    Static,
    /// Every vblank repaints the whole screen in a colour derived from the
    /// frame counter
    FrameStamp,
}

impl ScanoutPattern {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "static" => Some(ScanoutPattern::Static),
            "frame-stamp" | "framestamp" | "stamp" => Some(ScanoutPattern::FrameStamp),
            _ => None,
        }
    }
}

/// Colour painted for frame `n` under [`ScanoutPattern::FrameStamp`].
pub fn frame_stamp_colour(n: u64) -> Rgb888 {
    Rgb888::new(n as u8, (n >> 8) as u8, (n >> 16) as u8 | 0x80)
}

pub struct SoftVdp {
    controller: Arc<SoftVgaController>,
    keyboard: Arc<Ps2Keyboard>,
    mouse: Arc<Ps2Mouse>,
    link: Arc<SerialLink>,
    decoder: VduDecoder,
    startup_mode: ScreenMode,
    pattern: ScanoutPattern,
    background: Rgb888,
    frame_count: u64,
    ticks: u64,
    debug_logging: bool,
    initialized: bool,
}

impl SoftVdp {
    pub fn new() -> Self {
        Self {
            controller: Arc::new(SoftVgaController::default()),
            keyboard: Arc::new(Ps2Keyboard::new()),
            mouse: Arc::new(Ps2Mouse::new()),
            link: Arc::new(SerialLink::new()),
            decoder: VduDecoder::new(),
            startup_mode: ScreenMode::default(),
            pattern: ScanoutPattern::Static,
            background: Rgb888::BLACK,
            frame_count: 0,
            ticks: 0,
            debug_logging: false,
            initialized: false,
        }
    }

    pub fn with_pattern(mut self, pattern: ScanoutPattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn controller(&self) -> Arc<SoftVgaController> {
        Arc::clone(&self.controller)
    }

    pub fn keyboard(&self) -> Arc<Ps2Keyboard> {
        Arc::clone(&self.keyboard)
    }

    pub fn mouse(&self) -> Arc<Ps2Mouse> {
        Arc::clone(&self.mouse)
    }

    pub fn link(&self) -> Arc<SerialLink> {
        Arc::clone(&self.link)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Status for debugging output
    pub fn status(&self) -> Value {
        let mode = self.controller.mode();
        json!({
            "initialized": self.initialized,
            "mode": mode.number,
            "width": mode.width,
            "height": mode.height,
            "pattern": self.pattern,
            "frames": self.frame_count,
            "ticks": self.ticks,
            "keyboard_pending": self.keyboard.pending(),
            "keyboard_dropped": self.keyboard.dropped(),
            "mouse_pending": self.mouse.pending(),
            "mouse_dropped": self.mouse.dropped(),
            "link_to_vdp": self.link.pending_to_vdp(),
            "link_to_host": self.link.pending_to_host(),
            "link_dropped": self.link.dropped(),
        })
    }

    fn command_level(&self) -> LogLevel {
        if self.debug_logging {
            LogLevel::Info
        } else {
            LogLevel::Debug
        }
    }

    fn apply(&mut self, command: VduCommand) {
        let level = self.command_level();
        match command {
            VduCommand::ClearScreen => {
                log(LogCategory::Display, level, || "VDU 12: clear".to_string());
                self.controller.clear(self.background);
            }
            VduCommand::SetMode(n) => match ScreenMode::from_number(n as u32) {
                Some(mode) => {
                    log(LogCategory::Display, level, || format!("VDU 22: mode {}", n));
                    self.controller.set_mode(mode);
                }
                None => {
                    log(LogCategory::Display, LogLevel::Warn, || {
                        format!("VDU 22: unknown mode {}, ignored", n)
                    });
                }
            },
            VduCommand::GeneralPoll(n) => {
                log(LogCategory::Link, level, || format!("general poll {:02X}", n));
                self.link.send_to_host(&[PACKET_GENERAL_POLL, 1, n]);
            }
            VduCommand::Unhandled(b) => {
                log(LogCategory::Stubs, LogLevel::Debug, || {
                    format!("unhandled VDU byte {:02X}", b)
                });
            }
        }
    }
}

impl Default for SoftVdp {
    fn default() -> Self {
        Self::new()
    }
}

impl VdpSubsystem for SoftVdp {
    fn name(&self) -> &str {
        "soft-vga"
    }

    fn set_startup_mode(&mut self, mode: u32) -> Result<()> {
        self.startup_mode = ScreenMode::from_number(mode).ok_or(VdpError::UnsupportedMode(mode))?;
        Ok(())
    }

    fn setup(&mut self) -> Result<VdpBindings> {
        if self.initialized {
            return Err(VdpError::AlreadyInitialized);
        }
        self.controller.set_mode(self.startup_mode);
        self.controller.clear(self.background);
        self.initialized = true;

        log(LogCategory::Lifecycle, LogLevel::Info, || {
            format!(
                "soft VDP ready in mode {} ({}x{})",
                self.startup_mode.number, self.startup_mode.width, self.startup_mode.height
            )
        });

        let display = Arc::clone(&self.controller);
        let keyboard = Arc::clone(&self.keyboard);
        let mouse = Arc::clone(&self.mouse);
        let link = Arc::clone(&self.link);
        Ok(VdpBindings::new(display, keyboard)
            .with_mouse(mouse)
            .with_link(link))
    }

    fn service(&mut self) {
        self.ticks += 1;
        for _ in 0..LINK_BYTES_PER_TICK {
            let Some(byte) = self.link.take_from_host() else {
                break;
            };
            if let Some(command) = self.decoder.push(byte) {
                self.apply(command);
            }
        }
    }

    fn signal_vblank(&mut self) {
        self.frame_count += 1;
        if self.pattern == ScanoutPattern::FrameStamp {
            let colour = frame_stamp_colour(self.frame_count);
            self.controller.with_screen(|screen| {
                for y in 0..screen.height() {
                    screen.fill_row(y, colour);
                }
            });
        }
    }

    fn set_debug_logging(&mut self, enabled: bool) {
        self.debug_logging = enabled;
    }

    fn shutdown(&mut self) {
        self.keyboard.clear();
        self.mouse.clear();
        self.link.clear();
        self.initialized = false;
        log(LogCategory::Lifecycle, LogLevel::Info, || {
            format!("soft VDP shut down after {} frames", self.frame_count)
        });
    }
}
