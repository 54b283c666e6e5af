use anyhow::Error as AnyError;
use relo_module::LifecycleOp;
use thiserror::Error;

/// Relo runtime errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid argument: {}", _0)]
    InvalidArgument(&'static str),

    /// IO errors arising while stamping or dynamically loading a module
    /// image. A missing image reports here and leaves the controller
    /// Unloaded; it is not fatal to the host.
    #[error("Dynamic loading error: {}", _0)]
    DlError(#[from] std::io::Error),

    /// The image does not export the required entry point.
    #[error("Symbol not found: {}", _0)]
    SymbolNotFound(String),

    /// The guest entry point returned a negative status. The controller
    /// has already unmapped the image and reset the table to cold defaults
    /// rather than keep calling a half-initialized module.
    #[error("Entry point returned {} during {:?}", _1, _0)]
    EntryFault(LifecycleOp, i32),

    /// A catch-all for internal errors that are likely unrecoverable by
    /// the runtime user.
    #[error("Internal error: {}", _0)]
    InternalError(#[source] AnyError),
}
