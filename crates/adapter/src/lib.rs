//! VDP boundary adapter
//!
//! Thin synchronous shim between a host (emulator core, test harness, or
//! anything speaking the C ABI) and a display/input subsystem implementing
//! [`vdp_core::VdpSubsystem`].
//!
//! Rust callers own a [`VdpAdapter`] directly. Foreign callers go through
//! [`ffi`], which keeps one process-wide adapter behind a registry.

mod adapter;
pub mod ffi;

pub use adapter::{LifecycleState, VdpAdapter, VdpBoundary};
