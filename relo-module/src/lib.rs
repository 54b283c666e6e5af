//! Wire-level ABI shared between the relo host runtime and relo guest
//! modules.
//!
//! Everything here is `#[repr(C)]` plain data: the lifecycle operation and
//! entry-point contract, the ownership bridge of host callbacks, the
//! host-backed buffer types, and the module API table header. The layout is
//! a compile-time contract between independently compiled units, so this
//! crate is `no_std`, performs no allocation of its own, and exchanges no
//! runtime type information. All dynamic storage lives on the host side and
//! is reached exclusively through the [`Bridge`] callbacks.

#![cfg_attr(not(test), no_std)]
#![deny(bare_trait_objects)]

mod bridge;
mod buffer;
mod lifecycle;
mod table;

pub use crate::bridge::{
    Bridge, BridgeNotReady, DestroyFn, ExitFn, LineBuf, LogFn, NowFn, PushFloatFn, RawHandle,
    ResizeFn, WriteFn, FATAL_EXIT_CODE, STREAM_ERR, STREAM_OUT,
};
pub use crate::buffer::{BufKind, HostBuf, HostString, HostVec};
pub use crate::lifecycle::{
    LifecycleOp, ModuleContext, ModuleEntryFn, ENTRY_SYM, ENTRY_SYM_BYTES, ERR_BAD_OP,
    ERR_BRIDGE_UNSET, ERR_NO_CONTEXT, ERR_NO_USERDATA, STATUS_OK,
};
pub use crate::table::{ApiTable, TableHeader};
