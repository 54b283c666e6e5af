//! Module images and where they come from.
//!
//! An [`ImageSource`] answers two questions for the reload controller: has
//! the artifact changed since last time ([`ImageSource::stamp`]), and give
//! me a mapped copy of it ([`ImageSource::load`]). [`DlSource`] is the real
//! on-disk implementation; [`MockSource`] swaps entry functions in-process
//! for tests.

mod dl;
mod mock;

pub use self::dl::{DlImage, DlSource};
pub use self::mock::{MockImage, MockSource};

use crate::error::Error;
use relo_module::ModuleEntryFn;

/// Opaque change stamp for a module artifact. Two equal stamps mean the
/// artifact has not changed; nothing else may be read into the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageStamp(pub u64);

/// A mapped module image with a resolved entry point.
///
/// The entry pointer is only valid while the image value lives; the
/// controller drops the image before mapping a replacement.
pub trait ModuleImage {
    fn entry(&self) -> ModuleEntryFn;
}

pub trait ImageSource {
    type Image: ModuleImage;

    /// Current change stamp of the artifact. `Err` means the artifact is
    /// not observable right now (for instance, mid-rebuild on disk).
    fn stamp(&mut self) -> Result<ImageStamp, Error>;

    /// Map a fresh image of the artifact and resolve its entry point.
    fn load(&mut self) -> Result<Self::Image, Error>;
}
