//! Software framebuffer controller
//!
//! Holds the current screen behind a mutex. Everything that changes the
//! screen (mode switches, clears, frame repaints) goes through the same lock
//! that captures take, so a capture always sees one whole frame.

use crate::modes::ScreenMode;
use std::sync::{Mutex, MutexGuard, PoisonError};
use vdp_core::logging::{log, LogCategory, LogLevel};
use vdp_core::types::{Rect, Rgb888, BYTES_PER_PIXEL};
use vdp_core::{DisplayController, LockedScreen, Result, VdpError};

/// Pixel memory for one mode.
pub struct Screen {
    mode: ScreenMode,
    pixels: Vec<Rgb888>,
}

impl Screen {
    fn new(mode: ScreenMode) -> Self {
        Self {
            mode,
            pixels: vec![Rgb888::BLACK; (mode.width * mode.height) as usize],
        }
    }

    pub fn mode(&self) -> ScreenMode {
        self.mode
    }

    pub fn width(&self) -> u32 {
        self.mode.width
    }

    pub fn height(&self) -> u32 {
        self.mode.height
    }

    pub fn clear(&mut self, colour: Rgb888) {
        self.pixels.fill(colour);
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, colour: Rgb888) {
        if x < self.width() && y < self.height() {
            let i = (y * self.width() + x) as usize;
            self.pixels[i] = colour;
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        if x < self.width() && y < self.height() {
            Some(self.pixels[(y * self.width() + x) as usize])
        } else {
            None
        }
    }

    pub fn fill_row(&mut self, y: u32, colour: Rgb888) {
        if y < self.height() {
            let w = self.width() as usize;
            let start = y as usize * w;
            self.pixels[start..start + w].fill(colour);
        }
    }

    fn read_rect(&self, rect: Rect, dest: &mut [u8]) -> Result<()> {
        if !rect.fits_within(self.width(), self.height()) {
            return Err(VdpError::InvalidRect(rect));
        }
        let required = rect.byte_len();
        if dest.len() < required {
            return Err(VdpError::BufferTooSmall {
                required,
                actual: dest.len(),
            });
        }

        let w = self.width() as usize;
        let row_pixels = rect.width() as usize;
        let out_rows = dest[..required].chunks_exact_mut(row_pixels * BYTES_PER_PIXEL);
        for (y, out) in (rect.y1 as usize..=rect.y2 as usize).zip(out_rows) {
            let start = y * w + rect.x1 as usize;
            let src = &self.pixels[start..start + row_pixels];
            for (px, chunk) in src.iter().zip(out.chunks_exact_mut(BYTES_PER_PIXEL)) {
                chunk.copy_from_slice(&px.to_bytes());
            }
        }
        Ok(())
    }
}

/// Lock guard handed to the adapter.
struct ScreenGuard<'a>(MutexGuard<'a, Screen>);

impl LockedScreen for ScreenGuard<'_> {
    fn screen_width(&self) -> u32 {
        self.0.width()
    }

    fn screen_height(&self) -> u32 {
        self.0.height()
    }

    fn read_screen(&self, rect: Rect, dest: &mut [u8]) -> Result<()> {
        self.0.read_rect(rect, dest)
    }
}

pub struct SoftVgaController {
    screen: Mutex<Screen>,
}

impl SoftVgaController {
    pub fn new(mode: ScreenMode) -> Self {
        Self {
            screen: Mutex::new(Screen::new(mode)),
        }
    }

    fn screen(&self) -> MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> ScreenMode {
        self.screen().mode()
    }

    /// Switch mode. Pixel memory is reallocated and cleared to black.
    pub fn set_mode(&self, mode: ScreenMode) {
        let mut screen = self.screen();
        log(LogCategory::Display, LogLevel::Info, || {
            format!(
                "mode {} -> {} ({}x{})",
                screen.mode.number, mode.number, mode.width, mode.height
            )
        });
        *screen = Screen::new(mode);
    }

    pub fn clear(&self, colour: Rgb888) {
        self.screen().clear(colour);
    }

    /// Run `f` with the screen locked. Used for drawing whole frames.
    pub fn with_screen<R>(&self, f: impl FnOnce(&mut Screen) -> R) -> R {
        f(&mut self.screen())
    }
}

impl Default for SoftVgaController {
    fn default() -> Self {
        Self::new(ScreenMode::default())
    }
}

impl DisplayController for SoftVgaController {
    fn lock(&self) -> Box<dyn LockedScreen + '_> {
        Box::new(ScreenGuard(self.screen()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_mode() -> ScreenMode {
        ScreenMode::from_number(8).unwrap()
    }

    #[test]
    fn test_new_screen_is_black() {
        let vga = SoftVgaController::new(small_mode());
        let guard = vga.lock();
        assert_eq!(guard.screen_width(), 320);
        assert_eq!(guard.screen_height(), 240);

        let mut buf = vec![0xAA; Rect::full_frame(320, 240).byte_len()];
        guard
            .read_screen(Rect::full_frame(320, 240), &mut buf)
            .unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_read_subrect_row_major() {
        let vga = SoftVgaController::new(small_mode());
        vga.with_screen(|s| {
            s.put_pixel(10, 20, Rgb888::new(1, 2, 3));
            s.put_pixel(11, 20, Rgb888::new(4, 5, 6));
            s.put_pixel(10, 21, Rgb888::new(7, 8, 9));
        });

        let mut buf = [0u8; 12];
        vga.lock()
            .read_screen(Rect::new(10, 20, 11, 21), &mut buf)
            .unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 0, 0]);
    }

    #[test]
    fn test_rect_out_of_bounds_rejected() {
        let vga = SoftVgaController::new(small_mode());
        let mut buf = vec![0u8; 1024 * 768 * 3];
        let rect = Rect::full_frame(640, 480);
        assert_eq!(
            vga.lock().read_screen(rect, &mut buf),
            Err(VdpError::InvalidRect(rect))
        );
        let rect = Rect::new(-1, 0, 5, 5);
        assert_eq!(
            vga.lock().read_screen(rect, &mut buf),
            Err(VdpError::InvalidRect(rect))
        );
    }

    #[test]
    fn test_short_destination_rejected() {
        let vga = SoftVgaController::new(small_mode());
        let mut buf = [0u8; 5];
        assert_eq!(
            vga.lock().read_screen(Rect::new(0, 0, 1, 0), &mut buf),
            Err(VdpError::BufferTooSmall {
                required: 6,
                actual: 5
            })
        );
    }

    #[test]
    fn test_set_mode_resizes_and_clears() {
        let vga = SoftVgaController::new(small_mode());
        vga.clear(Rgb888::WHITE);
        vga.set_mode(ScreenMode::from_number(18).unwrap());

        assert_eq!(vga.mode().number, 18);
        let guard = vga.lock();
        assert_eq!((guard.screen_width(), guard.screen_height()), (1024, 768));
        drop(guard);
        assert_eq!(
            vga.with_screen(|s| s.pixel(1023, 767)),
            Some(Rgb888::BLACK)
        );
    }

    #[test]
    fn test_fill_row() {
        let vga = SoftVgaController::new(small_mode());
        let red = Rgb888::new(0xFF, 0, 0);
        vga.with_screen(|s| s.fill_row(5, red));
        vga.with_screen(|s| {
            assert_eq!(s.pixel(0, 5), Some(red));
            assert_eq!(s.pixel(319, 5), Some(red));
            assert_eq!(s.pixel(0, 4), Some(Rgb888::BLACK));
            assert_eq!(s.pixel(320, 5), None);
        });
    }
}
