//! Drives the C ABI end to end. The registry is process-wide, so the
//! lifecycle runs in one test and the abort cases each re-run this binary
//! in a child process.

use std::process::{Command, Output};
use vdp_adapter::ffi::{self, *};
use vdp_adapter::LifecycleState;
use vdp_core::types::{ScancodeEvent, MAX_FRAMEBUFFER_BYTES};
use vdp_core::{VdpError, VdpSubsystem};
use vdp_soft::SoftVdp;

/// Set in the child process to run the misuse half of an abort test.
const CHILD_ENV: &str = "VDP_FFI_ABORT_CHILD";

fn is_child() -> bool {
    std::env::var_os(CHILD_ENV).is_some()
}

fn run_child(test_name: &str) -> Output {
    Command::new(std::env::current_exe().unwrap())
        .args(["--exact", test_name, "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, "1")
        .output()
        .expect("failed to re-run test binary")
}

fn assert_aborted(output: &Output, op: &str) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        !output.status.success(),
        "child exited cleanly.\nstdout:\n{}\nstderr:\n{}",
        stdout,
        stderr
    );
    assert!(
        stderr.contains(&format!("vdp: {} called out of contract", op)),
        "missing abort message.\nstderr:\n{}",
        stderr
    );
    assert!(!stdout.contains("returned after misuse"));
}

fn copy(buffer: &mut [u8]) -> (u32, u32) {
    let (mut w, mut h) = (0u32, 0u32);
    unsafe { vdp_copy_framebuffer(&mut w, &mut h, buffer.as_mut_ptr()) };
    (w, h)
}

#[test]
fn test_c_abi_lifecycle() {
    assert!(matches!(ffi::uninstall(), Err(VdpError::NotInstalled)));

    let vdp = SoftVdp::new();
    let keyboard = vdp.keyboard();
    let mouse = vdp.mouse();
    ffi::install(Box::new(vdp)).unwrap();
    assert_eq!(
        ffi::install(Box::new(SoftVdp::new())),
        Err(VdpError::AlreadyInitialized)
    );

    // Unknown mode is logged and ignored
    vdp_set_startup_mode(99);
    vdp_set_startup_mode(8);
    vdp_setup();
    assert_eq!(
        ffi::with_adapter(|a| a.state()).unwrap(),
        LifecycleState::Ready
    );

    vdp_send_scancode(0x1C, 1);
    vdp_send_scancode(0x1C, 0);
    assert_eq!(keyboard.next_event(), Some(ScancodeEvent::press(0x1C)));
    assert_eq!(keyboard.next_event(), Some(ScancodeEvent::release(0x1C)));
    // C callers may pass any nonzero byte for "down"
    vdp_send_scancode(0x2A, 0xFF);
    assert_eq!(keyboard.next_event(), Some(ScancodeEvent::press(0x2A)));

    let mut buffer = vec![0u8; MAX_FRAMEBUFFER_BYTES];
    assert_eq!(copy(&mut buffer), (320, 240));

    // Checked variant reports a short buffer instead of writing past it
    let mut small = vec![0u8; 1000];
    let (mut w, mut h) = (7u32, 7u32);
    let status = unsafe {
        vdp_copy_framebuffer_checked(&mut w, &mut h, small.as_mut_ptr(), small.len())
    };
    assert_eq!(status, VdpError::BufferTooSmall { required: 0, actual: 0 }.status_code());
    assert_eq!((w, h), (0, 0));
    let status = unsafe {
        vdp_copy_framebuffer_checked(&mut w, &mut h, buffer.as_mut_ptr(), buffer.len())
    };
    assert_eq!((status, w, h), (0, 320, 240));

    // VDU 22,18 switches to 1024x768 on the next service tick
    vdp_send_byte(22);
    vdp_send_byte(18);
    assert_eq!(copy(&mut buffer), (320, 240));
    vdp_loop();
    assert_eq!(copy(&mut buffer), (1024, 768));

    // General poll is echoed back over the link
    for b in [23, 0, 0x80, 0x42] {
        vdp_send_byte(b);
    }
    vdp_loop();
    let mut reply = Vec::new();
    let mut byte = 0u8;
    while unsafe { vdp_recv_byte(&mut byte) } {
        reply.push(byte);
    }
    assert_eq!(reply, vec![0x80, 1, 0x42]);

    let packet = [0x09u8, 4, 0xFC, 0];
    unsafe { vdp_send_mouse_packet(packet.as_ptr()) };
    assert_eq!(mouse.next_packet().map(|p| p.0), Some(packet));

    vdp_signal_vblank();
    vdp_set_debug_logging(true);
    let state = ffi::with_adapter(|a| a.debug_state()).unwrap();
    assert_eq!(state["subsystem"], "soft-vga");
    assert_eq!(state["vblanks"], 1);
    assert_eq!(state["scancodes"], 3);

    assert!(matches!(ffi::uninstall(), Err(VdpError::AlreadyInitialized)));
    vdp_shutdown();
    let status = unsafe {
        vdp_copy_framebuffer_checked(&mut w, &mut h, buffer.as_mut_ptr(), buffer.len())
    };
    assert_eq!(status, VdpError::ShutDown.status_code());

    let vdp = ffi::uninstall().unwrap();
    assert_eq!(vdp.name(), "soft-vga");
    assert!(matches!(
        ffi::with_adapter(|a| a.state()),
        Err(VdpError::NotInstalled)
    ));
}

#[test]
fn test_scancode_before_setup_aborts() {
    if is_child() {
        ffi::install(Box::new(SoftVdp::new())).unwrap();
        vdp_send_scancode(0x1C, 1);
        println!("returned after misuse");
        return;
    }
    let output = run_child("test_scancode_before_setup_aborts");
    assert_aborted(&output, "vdp_send_scancode");
    assert!(String::from_utf8_lossy(&output.stderr).contains("not initialized"));
}

#[test]
fn test_loop_without_subsystem_aborts() {
    if is_child() {
        vdp_loop();
        println!("returned after misuse");
        return;
    }
    let output = run_child("test_loop_without_subsystem_aborts");
    assert_aborted(&output, "vdp_loop");
    assert!(String::from_utf8_lossy(&output.stderr).contains("No VDP subsystem installed"));
}
