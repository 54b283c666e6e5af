use core::ffi::c_void;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Operation driving a guest module through its lifecycle state machine:
/// Unloaded → Loaded via `Load`, Loaded → Reloading via `Unload`, Reloading
/// → Loaded via a following `Load` of the new image, Loaded → Unloaded via
/// `Close`.
///
/// The discriminants are the wire values; the host passes the raw `u32` to
/// the entry point and the guest decodes it with [`try_from_u32`]
/// (`LifecycleOp::try_from_u32`), rejecting anything it does not recognize.
#[repr(u32)]
#[derive(Copy, Clone, Debug, FromPrimitive, PartialEq, Eq)]
pub enum LifecycleOp {
    Load = 0,
    Step = 1,
    Unload = 2,
    Close = 3,
}

impl LifecycleOp {
    pub fn try_from_u32(v: u32) -> Option<LifecycleOp> {
        Self::from_u32(v)
    }
}

/// Context handed to the guest entry point on every lifecycle call.
///
/// `userdata` references a module API table whose layout is a compile-time
/// contract between host and guest (see [`ApiTable`](crate::ApiTable));
/// `version` counts successful loads on the host side, and `generation` is
/// the table's generation counter at the time of the call.
#[repr(C)]
#[derive(Debug)]
pub struct ModuleContext {
    pub userdata: *mut c_void,
    pub version: u32,
    pub generation: u32,
}

/// The single exported dispatcher of a guest module.
///
/// Returns [`STATUS_OK`] on success and a negative status on failure; no
/// exception or unwind ever crosses this boundary.
pub type ModuleEntryFn = unsafe extern "C" fn(ctx: *mut ModuleContext, op: u32) -> i32;

/// Symbol name the host resolves in a loaded image.
pub const ENTRY_SYM: &str = "relo_module_entry";
pub const ENTRY_SYM_BYTES: &[u8] = b"relo_module_entry";

pub const STATUS_OK: i32 = 0;
/// The context pointer itself was null.
pub const ERR_NO_CONTEXT: i32 = -1;
/// The context carried no userdata table.
pub const ERR_NO_USERDATA: i32 = -2;
/// LOAD was issued before the host wired a bridge into the table.
pub const ERR_BRIDGE_UNSET: i32 = -3;
/// The operation value did not decode.
pub const ERR_BAD_OP: i32 = -4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_decodes_from_wire_values() {
        assert_eq!(LifecycleOp::try_from_u32(0), Some(LifecycleOp::Load));
        assert_eq!(LifecycleOp::try_from_u32(1), Some(LifecycleOp::Step));
        assert_eq!(LifecycleOp::try_from_u32(2), Some(LifecycleOp::Unload));
        assert_eq!(LifecycleOp::try_from_u32(3), Some(LifecycleOp::Close));
        assert_eq!(LifecycleOp::try_from_u32(4), None);
        assert_eq!(LifecycleOp::try_from_u32(u32::max_value()), None);
    }

    #[test]
    fn op_round_trips_through_wire_encoding() {
        for &op in &[
            LifecycleOp::Load,
            LifecycleOp::Step,
            LifecycleOp::Unload,
            LifecycleOp::Close,
        ] {
            assert_eq!(LifecycleOp::try_from_u32(op as u32), Some(op));
        }
    }
}
