use crate::bridge::Bridge;
use core::ptr;

/// Header every module API table embeds at offset zero: the generation
/// counter (incremented once per successful load) and the reference to the
/// host's bridge table.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct TableHeader {
    pub generation: u32,
    pub bridge: *const Bridge,
}

impl TableHeader {
    pub const fn cold() -> TableHeader {
        TableHeader {
            generation: 0,
            bridge: ptr::null(),
        }
    }
}

/// A module's exposed operations: a POD aggregate of raw function pointers
/// plus a [`TableHeader`].
///
/// Raw function pointers rather than trait objects are intentional — this
/// is the ABI-stable, relocation-safe capability record that crosses
/// independently-compiled-module boundaries. Hosts may wrap it in a
/// higher-level interface internally, but the record itself stays flat.
///
/// [`cold`](ApiTable::cold) returns the safe fallbacks compiled into the
/// current binary; whichever side owns a table instance can always be reset
/// to it. Invariant: after CLOSE/UNLOAD or any fail-safe reset, every field
/// references cold defaults or a previous generation's pointers — never an
/// unmapped image.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` plain data with the header physically
/// embedded, so the table can be value-copied across the module boundary
/// and restored bitwise.
pub unsafe trait ApiTable: Copy {
    fn cold() -> Self;
    fn header(&self) -> &TableHeader;
    fn header_mut(&mut self) -> &mut TableHeader;
}
