//! Core VDP boundary primitives and collaborator traits.

pub mod error;
pub mod logging;
pub mod types {
    use serde::{Deserialize, Serialize};

    /// Largest resolution a collaborating controller may report.
    pub const MAX_WIDTH: u32 = 1024;
    pub const MAX_HEIGHT: u32 = 768;
    pub const BYTES_PER_PIXEL: usize = 3;
    /// Buffer size a caller must provide when no length is passed (1024x768 RGB888).
    pub const MAX_FRAMEBUFFER_BYTES: usize =
        MAX_WIDTH as usize * MAX_HEIGHT as usize * BYTES_PER_PIXEL;

    /// Screen rectangle with inclusive bounds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Rect {
        pub x1: i32,
        pub y1: i32,
        pub x2: i32,
        pub y2: i32,
    }

    impl Rect {
        pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
            Self { x1, y1, x2, y2 }
        }

        /// `(0,0)` to `(width-1, height-1)`. Both sides must be at most
        /// `i32::MAX`; callers check against `MAX_WIDTH`/`MAX_HEIGHT` first.
        pub fn full_frame(width: u32, height: u32) -> Self {
            Self::new(0, 0, width as i32 - 1, height as i32 - 1)
        }

        pub fn width(&self) -> u32 {
            (self.x2 - self.x1 + 1).max(0) as u32
        }

        pub fn height(&self) -> u32 {
            (self.y2 - self.y1 + 1).max(0) as u32
        }

        pub fn is_empty(&self) -> bool {
            self.width() == 0 || self.height() == 0
        }

        /// True when the rectangle lies entirely inside a `width` x `height` screen.
        pub fn fits_within(&self, width: u32, height: u32) -> bool {
            !self.is_empty()
                && self.x1 >= 0
                && self.y1 >= 0
                && self.x2 < width as i32
                && self.y2 < height as i32
        }

        /// Bytes needed to hold this rectangle as RGB888.
        pub fn byte_len(&self) -> usize {
            self.width() as usize * self.height() as usize * BYTES_PER_PIXEL
        }
    }

    /// 24-bit colour in the order the framebuffer is read out.
    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Rgb888 {
        pub r: u8,
        pub g: u8,
        pub b: u8,
    }

    impl Rgb888 {
        pub const BLACK: Rgb888 = Rgb888::new(0, 0, 0);
        pub const WHITE: Rgb888 = Rgb888::new(0xFF, 0xFF, 0xFF);

        pub const fn new(r: u8, g: u8, b: u8) -> Self {
            Self { r, g, b }
        }

        pub fn to_bytes(self) -> [u8; 3] {
            [self.r, self.g, self.b]
        }
    }

    /// One raw key transition. `code` is the make code for both press and release.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ScancodeEvent {
        pub code: u16,
        pub is_down: bool,
    }

    impl ScancodeEvent {
        pub fn press(code: u16) -> Self {
            Self {
                code,
                is_down: true,
            }
        }

        pub fn release(code: u16) -> Self {
            Self {
                code,
                is_down: false,
            }
        }
    }

    /// Raw 4-byte PS/2 mouse packet (status, dx, dy, wheel).
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MousePacket(pub [u8; 4]);

    impl MousePacket {
        pub fn status(&self) -> u8 {
            self.0[0]
        }

        pub fn dx(&self) -> i8 {
            self.0[1] as i8
        }

        pub fn dy(&self) -> i8 {
            self.0[2] as i8
        }

        pub fn wheel(&self) -> i8 {
            self.0[3] as i8
        }
    }

    /// A captured frame owned by the caller.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FramebufferSnapshot {
        pub width: u32,
        pub height: u32,
        /// Row-major RGB888 triples.
        pub pixels: Vec<u8>,
    }

    impl FramebufferSnapshot {
        /// Copy the filled prefix of a capture buffer. Returns `None` if the
        /// buffer is shorter than the frame it claims to hold.
        pub fn from_buffer(width: u32, height: u32, buffer: &[u8]) -> Option<Self> {
            let len = width as usize * height as usize * BYTES_PER_PIXEL;
            buffer.get(..len).map(|pixels| Self {
                width,
                height,
                pixels: pixels.to_vec(),
            })
        }

        pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
            if x >= self.width || y >= self.height {
                return None;
            }
            let i = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
            Some(Rgb888::new(
                self.pixels[i],
                self.pixels[i + 1],
                self.pixels[i + 2],
            ))
        }
    }
}

pub use error::{Result, VdpError};

use std::sync::Arc;
use types::{MousePacket, Rect};

/// Exclusive view of a display controller, held for as long as the value
/// lives. Dropping it releases the controller's lock.
pub trait LockedScreen {
    fn screen_width(&self) -> u32;
    fn screen_height(&self) -> u32;

    /// Write `rect` as row-major RGB888 into `dest`.
    fn read_screen(&self, rect: Rect, dest: &mut [u8]) -> Result<()>;
}

/// The active display controller. Owned by the subsystem; the adapter only
/// holds a shared reference.
pub trait DisplayController: Send + Sync {
    fn lock(&self) -> Box<dyn LockedScreen + '_>;
}

/// Keyboard input pipeline, producer side.
pub trait KeyboardPipeline: Send + Sync {
    fn inject_scancode(&self, code: u16, is_down: bool);
}

/// Mouse input pipeline, producer side.
pub trait MousePipeline: Send + Sync {
    fn inject_packet(&self, packet: MousePacket);
}

/// Byte link between the host CPU and the VDP.
pub trait HostLink: Send + Sync {
    fn send_to_vdp(&self, byte: u8);
    /// Never blocks.
    fn recv_from_vdp(&self) -> Option<u8>;
}

/// Handles a subsystem hands out once setup has completed.
#[derive(Clone)]
pub struct VdpBindings {
    pub display: Arc<dyn DisplayController>,
    pub keyboard: Arc<dyn KeyboardPipeline>,
    pub mouse: Option<Arc<dyn MousePipeline>>,
    pub link: Option<Arc<dyn HostLink>>,
}

impl VdpBindings {
    pub fn new(display: Arc<dyn DisplayController>, keyboard: Arc<dyn KeyboardPipeline>) -> Self {
        Self {
            display,
            keyboard,
            mouse: None,
            link: None,
        }
    }

    pub fn with_mouse(mut self, mouse: Arc<dyn MousePipeline>) -> Self {
        self.mouse = Some(mouse);
        self
    }

    pub fn with_link(mut self, link: Arc<dyn HostLink>) -> Self {
        self.link = Some(link);
        self
    }
}

/// A VDP implementation driven through the boundary adapter.
pub trait VdpSubsystem: Send {
    /// Name for logs and status output
    fn name(&self) -> &str;

    /// Choose the mode `setup` starts in. Only meaningful before setup.
    fn set_startup_mode(&mut self, mode: u32) -> Result<()> {
        Err(VdpError::UnsupportedMode(mode))
    }

    /// One-time initialization. Establishes the controller and pipelines.
    fn setup(&mut self) -> Result<VdpBindings>;

    /// One cooperative service tick. Must return promptly.
    fn service(&mut self);

    fn signal_vblank(&mut self) {}

    fn set_debug_logging(&mut self, _enabled: bool) {}

    fn shutdown(&mut self) {}
}

impl<T: VdpSubsystem + ?Sized> VdpSubsystem for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn set_startup_mode(&mut self, mode: u32) -> Result<()> {
        (**self).set_startup_mode(mode)
    }

    fn setup(&mut self) -> Result<VdpBindings> {
        (**self).setup()
    }

    fn service(&mut self) {
        (**self).service()
    }

    fn signal_vblank(&mut self) {
        (**self).signal_vblank()
    }

    fn set_debug_logging(&mut self, enabled: bool) {
        (**self).set_debug_logging(enabled)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}
