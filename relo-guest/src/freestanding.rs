//! Minimal runtime substitutes for guest modules built without std.
//!
//! A freestanding guest has no life-before-main: nothing walks its static
//! initializers at image load, nothing runs destructors at unload, and
//! there is no exception machinery to land in. This module provides the
//! three substitutes actually used — a manual initializer-table walk, an
//! atexit-style destructor stack, and stub landing pads — sharing only
//! wire-level layout with the full-runtime build. Wire the walks into the
//! [`guest_module!`](crate::guest_module) `init`/`deinit` hooks.

use core::cell::UnsafeCell;

/// Walk a manual static-initializer table in order, skipping unpopulated
/// slots. Must complete before any hot pointer is considered callable.
pub fn run_static_ctors(table: &[Option<fn()>]) {
    for ctor in table {
        if let Some(ctor) = ctor {
            ctor();
        }
    }
}

const DTOR_SLOTS: usize = 64;

/// Fixed-capacity, LIFO destructor stack — the atexit substitute. No heap:
/// a freestanding guest cannot allocate for its own bookkeeping.
pub struct DtorStack {
    slots: [Option<fn()>; DTOR_SLOTS],
    len: usize,
}

impl DtorStack {
    pub const fn new() -> DtorStack {
        DtorStack {
            slots: [None; DTOR_SLOTS],
            len: 0,
        }
    }

    /// Register a destructor. Returns `false` when the stack is full.
    pub fn push(&mut self, f: fn()) -> bool {
        if self.len == DTOR_SLOTS {
            return false;
        }
        self.slots[self.len] = Some(f);
        self.len += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Run everything in reverse registration order, emptying the stack.
    pub fn run_lifo(&mut self) {
        while self.len > 0 {
            self.len -= 1;
            if let Some(f) = self.slots[self.len].take() {
                f();
            }
        }
    }
}

struct DtorCell(UnsafeCell<DtorStack>);

// single lifecycle thread by contract
unsafe impl Sync for DtorCell {}

static DTORS: DtorCell = DtorCell(UnsafeCell::new(DtorStack::new()));

/// Register a destructor to run at module UNLOAD/CLOSE, newest first.
/// Returns `false` when the fixed stack is full.
pub fn at_unload(f: fn()) -> bool {
    unsafe { (*DTORS.0.get()).push(f) }
}

/// Run every registered destructor, LIFO. Called from the `deinit` hook
/// strictly before the table restore.
pub fn run_static_dtors() {
    unsafe { (*DTORS.0.get()).run_lifo() }
}

/// Number of destructors currently registered.
pub fn pending_static_dtors() -> usize {
    unsafe { (*DTORS.0.get()).len() }
}

// Landing-pad and panic substitutes. Only for true no_std cdylib builds:
// linked alongside std these would collide with the real lang items.
#[cfg(all(feature = "freestanding", not(test)))]
mod lang_items {
    /// Stub personality routine; no unwinding ever crosses the module
    /// boundary, so this is never entered with a live exception.
    #[no_mangle]
    pub extern "C" fn rust_eh_personality() {}

    #[panic_handler]
    fn panic(_info: &core::panic::PanicInfo) -> ! {
        crate::GUEST_BRIDGE.get().fatal("panic in guest module")
    }
}
