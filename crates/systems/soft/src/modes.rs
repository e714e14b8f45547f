//! Screen mode table
//!
//! Numbered modes the reference VDP accepts, either as the startup mode or
//! through `VDU 22, n`. Every entry fits inside the 1024x768 capture limit.

use serde::{Deserialize, Serialize};
use vdp_core::types::{MAX_HEIGHT, MAX_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenMode {
    pub number: u32,
    pub width: u32,
    pub height: u32,
    pub colours: u32,
}

impl ScreenMode {
    const fn new(number: u32, width: u32, height: u32, colours: u32) -> Self {
        Self {
            number,
            width,
            height,
            colours,
        }
    }

    /// Look up a mode by number
    pub fn from_number(number: u32) -> Option<Self> {
        MODES.iter().copied().find(|m| m.number == number)
    }

    pub fn framebuffer_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl Default for ScreenMode {
    fn default() -> Self {
        MODES[0]
    }
}

pub const MODES: [ScreenMode; 17] = [
    ScreenMode::new(0, 640, 480, 16),
    ScreenMode::new(1, 640, 480, 4),
    ScreenMode::new(2, 640, 480, 2),
    ScreenMode::new(3, 640, 240, 64),
    ScreenMode::new(4, 640, 240, 16),
    ScreenMode::new(5, 640, 240, 4),
    ScreenMode::new(8, 320, 240, 64),
    ScreenMode::new(9, 320, 240, 16),
    ScreenMode::new(10, 320, 240, 4),
    ScreenMode::new(12, 320, 200, 64),
    ScreenMode::new(13, 320, 200, 16),
    ScreenMode::new(14, 320, 200, 4),
    ScreenMode::new(16, 800, 600, 4),
    ScreenMode::new(17, 800, 600, 2),
    ScreenMode::new(18, 1024, 768, 2),
    ScreenMode::new(20, 512, 384, 64),
    ScreenMode::new(21, 512, 384, 16),
];

const _: () = {
    let mut i = 0;
    while i < MODES.len() {
        assert!(MODES[i].width <= MAX_WIDTH && MODES[i].height <= MAX_HEIGHT);
        i += 1;
    }
};
