//! The API table shared by the pose-filter demo host and guest.
//!
//! Host and guest compile this crate independently; the `#[repr(C)]`
//! layout plus [`POSE_API_VERSION`] is the whole contract between them.

#![cfg_attr(not(test), no_std)]

use relo_module::{ApiTable, Bridge, HostString, HostVec, TableHeader};

/// Bump on any layout or semantic change to [`PoseApi`].
pub const POSE_API_VERSION: u32 = 2;

/// Capability record for a pose post-processing module.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct PoseApi {
    pub header: TableHeader,
    /// The [`POSE_API_VERSION`] the implementation was compiled against.
    pub abi_version: extern "C" fn() -> u32,
    /// Feed one raw sample into the history buffer and return the
    /// processed value.
    pub smooth: unsafe extern "C" fn(history: *mut HostVec, bridge: *const Bridge, sample: f32) -> f32,
    /// Describe the active filter into `out`. Negative on failure.
    pub describe: unsafe extern "C" fn(out: *mut HostString, bridge: *const Bridge) -> i32,
}

unsafe impl ApiTable for PoseApi {
    fn cold() -> PoseApi {
        PoseApi {
            header: TableHeader::cold(),
            abi_version: cold_abi_version,
            smooth: cold_smooth,
            describe: cold_describe,
        }
    }
    fn header(&self) -> &TableHeader {
        &self.header
    }
    fn header_mut(&mut self) -> &mut TableHeader {
        &mut self.header
    }
}

// Cold fallbacks: pass-through behavior that is always safe to call, before
// the first load and after any fail-safe reset.

extern "C" fn cold_abi_version() -> u32 {
    POSE_API_VERSION
}

unsafe extern "C" fn cold_smooth(history: *mut HostVec, bridge: *const Bridge, sample: f32) -> f32 {
    if let (Some(history), Some(bridge)) = (history.as_mut(), bridge.as_ref()) {
        let _ = history.try_push(bridge, sample);
    }
    sample
}

unsafe extern "C" fn cold_describe(out: *mut HostString, bridge: *const Bridge) -> i32 {
    match (out.as_mut(), bridge.as_ref()) {
        (Some(out), Some(bridge)) => match out.try_assign(bridge, "pass-through (no module)") {
            Ok(true) => 0,
            _ => -1,
        },
        _ => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::ptr;

    #[test]
    fn cold_table_is_callable_without_a_module() {
        let api = PoseApi::cold();
        assert_eq!((api.abi_version)(), POSE_API_VERSION);
        assert_eq!(api.header.generation, 0);
        assert!(api.header.bridge.is_null());
    }

    #[test]
    fn cold_smooth_tolerates_null_arguments() {
        let api = PoseApi::cold();
        let out = unsafe { (api.smooth)(ptr::null_mut(), ptr::null(), 0.5) };
        assert_eq!(out, 0.5);
        let rc = unsafe { (api.describe)(ptr::null_mut(), ptr::null()) };
        assert_eq!(rc, -1);
    }
}
