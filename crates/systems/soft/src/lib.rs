//! Reference in-memory VDP
//!
//! A stand-in for the display/input subsystem that sits behind the
//! boundary adapter. It keeps a locked software framebuffer, PS/2 keyboard
//! and mouse queues, and a host byte link. It does no real rendering: the
//! screen changes only on mode switches, clears, and (optionally) a
//! per-vblank frame stamp used to exercise concurrent captures.
//!
//! # Components
//!
//! - **SoftVgaController**: `Mutex`-guarded screen, implements `DisplayController`
//! - **Ps2Keyboard / Ps2Mouse**: bounded FIFOs, implement the input pipelines
//! - **SerialLink**: host <-> VDP byte queues
//! - **SoftVdp**: ties them together and implements `VdpSubsystem`

mod controller;
mod keyboard;
mod link;
mod modes;
mod mouse;
mod system;
mod vdu;

pub use controller::{Screen, SoftVgaController};
pub use keyboard::{Ps2Keyboard, DEFAULT_KEYBOARD_QUEUE};
pub use link::{SerialLink, DEFAULT_LINK_QUEUE};
pub use modes::{ScreenMode, MODES};
pub use mouse::{Ps2Mouse, DEFAULT_MOUSE_QUEUE};
pub use system::{frame_stamp_colour, ScanoutPattern, SoftVdp};
pub use vdu::{VduCommand, VduDecoder};
