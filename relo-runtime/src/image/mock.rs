use crate::error::Error;
use crate::image::{ImageSource, ImageStamp, ModuleImage};
use relo_module::ModuleEntryFn;

/// An in-process image source for tests. No dynamic loader involved: the
/// "artifact" is an entry function in the test binary, and [`swap`] stands
/// in for a rebuild on disk.
///
/// [`swap`]: MockSource::swap
pub struct MockSource {
    current: ModuleEntryFn,
    stamp: u64,
    missing: bool,
}

impl MockSource {
    pub fn new(entry: ModuleEntryFn) -> MockSource {
        MockSource {
            current: entry,
            stamp: 0,
            missing: false,
        }
    }

    /// Replace the entry function and bump the stamp, as a rebuild would.
    pub fn swap(&mut self, entry: ModuleEntryFn) {
        self.current = entry;
        self.stamp += 1;
    }

    /// Make the artifact unobservable, as a half-written rebuild would.
    pub fn set_missing(&mut self, missing: bool) {
        self.missing = missing;
    }
}

impl ImageSource for MockSource {
    type Image = MockImage;

    fn stamp(&mut self) -> Result<ImageStamp, Error> {
        if self.missing {
            return Err(not_found());
        }
        Ok(ImageStamp(self.stamp))
    }

    fn load(&mut self) -> Result<MockImage, Error> {
        if self.missing {
            return Err(not_found());
        }
        Ok(MockImage {
            entry: self.current,
        })
    }
}

fn not_found() -> Error {
    Error::DlError(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "mock artifact missing",
    ))
}

pub struct MockImage {
    entry: ModuleEntryFn,
}

impl ModuleImage for MockImage {
    fn entry(&self) -> ModuleEntryFn {
        self.entry
    }
}
