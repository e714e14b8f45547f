//! C ABI surface
//!
//! One adapter per process lives in a registry. A Rust host installs the
//! subsystem with [`install`] before handing control to foreign code, which
//! then drives it through the `vdp_*` symbols below.
//!
//! The void-returning entry points have no way to report contract misuse
//! (calling before setup, after shutdown, or with nothing installed), so
//! those abort the process with a message on stderr. Other failures are
//! logged and the call returns.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use vdp_core::logging::{log, LogCategory, LogLevel};
use vdp_core::types::{MousePacket, MAX_FRAMEBUFFER_BYTES};
use vdp_core::{Result, VdpError, VdpSubsystem};

use crate::{LifecycleState, VdpAdapter, VdpBoundary};

pub type Registered = VdpAdapter<Box<dyn VdpSubsystem>>;

static REGISTRY: RwLock<Option<Registered>> = RwLock::new(None);

fn registry() -> RwLockReadGuard<'static, Option<Registered>> {
    REGISTRY.read().unwrap_or_else(PoisonError::into_inner)
}

fn registry_mut() -> RwLockWriteGuard<'static, Option<Registered>> {
    REGISTRY.write().unwrap_or_else(PoisonError::into_inner)
}

/// Make `subsystem` the process-wide VDP. Fails if one is already installed.
pub fn install(subsystem: Box<dyn VdpSubsystem>) -> Result<()> {
    let mut slot = registry_mut();
    if slot.is_some() {
        return Err(VdpError::AlreadyInitialized);
    }
    log(LogCategory::Lifecycle, LogLevel::Info, || {
        format!("installed {}", subsystem.name())
    });
    *slot = Some(VdpAdapter::new(subsystem));
    Ok(())
}

/// Remove the installed subsystem and hand it back. A subsystem that was
/// set up must be shut down first.
pub fn uninstall() -> Result<Box<dyn VdpSubsystem>> {
    let mut slot = registry_mut();
    match slot.as_ref().map(|a| a.state()) {
        None => Err(VdpError::NotInstalled),
        Some(LifecycleState::Ready) => Err(VdpError::AlreadyInitialized),
        Some(_) => slot
            .take()
            .map(VdpAdapter::into_subsystem)
            .ok_or(VdpError::NotInstalled),
    }
}

/// Run `f` against the installed adapter.
pub fn with_adapter<R>(f: impl FnOnce(&Registered) -> R) -> Result<R> {
    registry().as_ref().map(f).ok_or(VdpError::NotInstalled)
}

fn fatal(op: &str, err: VdpError) -> ! {
    eprintln!("vdp: {} called out of contract: {}", op, err);
    std::process::abort()
}

/// Abort on contract misuse, log anything else.
fn check(op: &str, result: Result<()>) {
    if let Err(e) = result {
        if e.is_precondition_violation() {
            fatal(op, e);
        }
        log(LogCategory::Lifecycle, LogLevel::Error, || {
            format!("{}: {}", op, e)
        });
    }
}

fn with_installed<R>(op: &str, f: impl FnOnce(&Registered) -> R) -> R {
    let slot = registry();
    match slot.as_ref() {
        Some(adapter) => f(adapter),
        None => fatal(op, VdpError::NotInstalled),
    }
}

#[no_mangle]
pub extern "C" fn vdp_setup() {
    let mut slot = registry_mut();
    let adapter = match slot.as_mut() {
        Some(adapter) => adapter,
        None => fatal("vdp_setup", VdpError::NotInstalled),
    };
    // No status return, so a failed setup ends the process
    if let Err(e) = adapter.setup() {
        fatal("vdp_setup", e);
    }
}

#[no_mangle]
pub extern "C" fn vdp_loop() {
    with_installed("vdp_loop", |a| check("vdp_loop", a.tick()));
}

/// Forward one key transition. Any nonzero `is_down` means pressed.
#[no_mangle]
pub extern "C" fn vdp_send_scancode(code: u16, is_down: u8) {
    with_installed("vdp_send_scancode", |a| {
        check("vdp_send_scancode", a.send_scancode(code, is_down != 0))
    });
}

/// Capture the current frame.
///
/// # Safety
///
/// `buffer` must be valid for writes of `MAX_FRAMEBUFFER_BYTES` bytes and
/// `out_width`/`out_height` must be valid for a `u32` write each.
#[no_mangle]
pub unsafe extern "C" fn vdp_copy_framebuffer(
    out_width: *mut u32,
    out_height: *mut u32,
    buffer: *mut u8,
) {
    if out_width.is_null() || out_height.is_null() || buffer.is_null() {
        fatal(
            "vdp_copy_framebuffer",
            VdpError::Unsupported("null pointer"),
        );
    }
    let dest = std::slice::from_raw_parts_mut(buffer, MAX_FRAMEBUFFER_BYTES);
    let (width, height) = with_installed("vdp_copy_framebuffer", |a| {
        match a.copy_framebuffer(dest) {
            Ok(geometry) => geometry,
            Err(e) => {
                check("vdp_copy_framebuffer", Err(e));
                (0, 0)
            }
        }
    });
    *out_width = width;
    *out_height = height;
}

/// Capture the current frame into a buffer of known length. Returns 0 on
/// success or the negative status code of the failure. Never aborts.
///
/// # Safety
///
/// `buffer` must be valid for writes of `len` bytes and the out pointers
/// valid for a `u32` write each.
#[no_mangle]
pub unsafe extern "C" fn vdp_copy_framebuffer_checked(
    out_width: *mut u32,
    out_height: *mut u32,
    buffer: *mut u8,
    len: usize,
) -> i32 {
    if out_width.is_null() || out_height.is_null() || buffer.is_null() {
        return VdpError::Unsupported("null pointer").status_code();
    }
    let dest = std::slice::from_raw_parts_mut(buffer, len);
    let result = registry()
        .as_ref()
        .ok_or(VdpError::NotInstalled)
        .and_then(|a| a.copy_framebuffer(dest));
    match result {
        Ok((width, height)) => {
            *out_width = width;
            *out_height = height;
            0
        }
        Err(e) => {
            *out_width = 0;
            *out_height = 0;
            e.status_code()
        }
    }
}

/// Select the startup mode. Must come before `vdp_setup`. An unknown mode
/// is logged and the default is kept.
#[no_mangle]
pub extern "C" fn vdp_set_startup_mode(mode: u32) {
    let mut slot = registry_mut();
    let adapter = match slot.as_mut() {
        Some(adapter) => adapter,
        None => fatal("vdp_set_startup_mode", VdpError::NotInstalled),
    };
    check("vdp_set_startup_mode", adapter.set_startup_mode(mode));
}

#[no_mangle]
pub extern "C" fn vdp_signal_vblank() {
    with_installed("vdp_signal_vblank", |a| {
        check("vdp_signal_vblank", a.signal_vblank())
    });
}

#[no_mangle]
pub extern "C" fn vdp_send_byte(byte: u8) {
    with_installed("vdp_send_byte", |a| check("vdp_send_byte", a.send_byte(byte)));
}

/// Poll one byte from the VDP. Returns false when none is waiting.
///
/// # Safety
///
/// `out` must be valid for a `u8` write.
#[no_mangle]
pub unsafe extern "C" fn vdp_recv_byte(out: *mut u8) -> bool {
    if out.is_null() {
        fatal("vdp_recv_byte", VdpError::Unsupported("null pointer"));
    }
    let byte = with_installed("vdp_recv_byte", |a| match a.recv_byte() {
        Ok(byte) => byte,
        Err(e) => {
            check("vdp_recv_byte", Err(e));
            None
        }
    });
    match byte {
        Some(b) => {
            *out = b;
            true
        }
        None => false,
    }
}

/// Forward one 4-byte PS/2 mouse packet.
///
/// # Safety
///
/// `packet` must point at 4 readable bytes.
#[no_mangle]
pub unsafe extern "C" fn vdp_send_mouse_packet(packet: *const u8) {
    if packet.is_null() {
        fatal("vdp_send_mouse_packet", VdpError::Unsupported("null pointer"));
    }
    let bytes = *(packet as *const [u8; 4]);
    with_installed("vdp_send_mouse_packet", |a| {
        check("vdp_send_mouse_packet", a.send_mouse_packet(MousePacket(bytes)))
    });
}

#[no_mangle]
pub extern "C" fn vdp_set_debug_logging(enabled: bool) {
    with_installed("vdp_set_debug_logging", |a| a.set_debug_logging(enabled));
}

#[no_mangle]
pub extern "C" fn vdp_shutdown() {
    let mut slot = registry_mut();
    let adapter = match slot.as_mut() {
        Some(adapter) => adapter,
        None => fatal("vdp_shutdown", VdpError::NotInstalled),
    };
    check("vdp_shutdown", adapter.shutdown());
}
