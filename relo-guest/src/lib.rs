//! Guest-side glue for relo modules: the exported entry-point dispatcher,
//! the module's private bridge snapshot, and (for builds without std) a
//! minimal runtime shim.
//!
//! A guest module defines a hot implementation of its API table and hands
//! it to [`guest_module!`], which generates the single exported dispatcher
//! the host controller drives through LOAD/STEP/UNLOAD/CLOSE. All
//! dynamically sized data crossing the boundary goes through the
//! [`Bridge`](relo_module::Bridge) snapshot taken at LOAD time.
//!
//! Everything in this crate runs on the host's single polling thread; none
//! of it is reentrant or thread-safe, by contract.

#![cfg_attr(all(feature = "freestanding", not(test)), no_std)]
#![deny(bare_trait_objects)]

pub mod entry;
pub mod freestanding;

mod cell;
mod macros;

pub use crate::cell::{BackupCell, BridgeCell};

// Re-exported so `guest_module!` can name ABI types through `$crate`.
pub use relo_module;

use relo_module::Bridge;

/// The guest's private, reload-safe snapshot of the host bridge.
///
/// Starts fully unset; the dispatcher value-copies the host's table into it
/// at LOAD time. A cdylib guest gets its own instance per loaded image.
pub static GUEST_BRIDGE: BridgeCell = BridgeCell::new();

/// The current bridge snapshot. Before LOAD wiring completes this is the
/// all-unset table, whose operations fail loudly rather than dereference
/// null.
pub fn bridge() -> &'static Bridge {
    GUEST_BRIDGE.get()
}
