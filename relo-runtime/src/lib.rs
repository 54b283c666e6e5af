//! Host-side runtime for loading, hot-swapping, and unloading relo guest
//! modules inside a long-running process.
//!
//! The host owns all dynamic-buffer storage; guests reach it through the
//! ownership-bridge callbacks in [`bridge`]. [`Reloader`] drives a module
//! image through LOAD/STEP/UNLOAD/CLOSE, detects on-disk changes, and
//! falls back to cold defaults on any failure — the table it exposes never
//! references an unmapped image.

#![deny(bare_trait_objects)]

pub mod bridge;
pub mod error;
pub mod image;
pub mod reloader;

pub use crate::bridge::{host_bridge, live_buffer_counts};
pub use crate::error::Error;
pub use crate::image::{
    DlImage, DlSource, ImageSource, ImageStamp, MockImage, MockSource, ModuleImage,
};
pub use crate::reloader::Reloader;

pub use relo_module::{
    ApiTable, Bridge, HostBuf, HostString, HostVec, LifecycleOp, ModuleContext, ModuleEntryFn,
    TableHeader,
};
