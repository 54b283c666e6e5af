use crate::error::Error;
use crate::image::{ImageSource, ImageStamp, ModuleImage};
use libloading::Library;
use relo_module::{ModuleEntryFn, ENTRY_SYM, ENTRY_SYM_BYTES};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// A module artifact on disk, loaded through the platform dynamic loader.
///
/// Each load maps a numbered side copy of the artifact rather than the
/// artifact itself. The loader caches by path, so reopening the original
/// after a rebuild would hand back the stale mapping; the side copy also
/// leaves the build free to rewrite the original while the old code runs.
pub struct DlSource {
    path: PathBuf,
    copies: u64,
}

impl DlSource {
    pub fn new<P: AsRef<Path>>(path: P) -> DlSource {
        DlSource {
            path: path.as_ref().to_owned(),
            copies: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for DlSource {
    type Image = DlImage;

    /// Stamp from file metadata. Mixing the length in catches rebuilds
    /// that land within the filesystem's mtime granularity.
    fn stamp(&mut self) -> Result<ImageStamp, Error> {
        let meta = fs::metadata(&self.path)?;
        let mtime = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::InternalError(e.into()))?
            .as_nanos() as u64;
        Ok(ImageStamp(mtime.wrapping_mul(31).wrapping_add(meta.len())))
    }

    fn load(&mut self) -> Result<DlImage, Error> {
        let abs = self.path.canonicalize()?;
        if !abs.is_file() {
            return Err(Error::InvalidArgument("module artifact is not a file"));
        }
        self.copies += 1;
        let live = abs.with_extension(format!("live-{}", self.copies));
        fs::copy(&abs, &live)?;

        match map_image(&live) {
            Ok((lib, entry)) => {
                tracing::info!("mapped module image {}", live.display());
                Ok(DlImage { lib, entry, live })
            }
            Err(e) => {
                // a failed mapping must not leave its side copy behind
                let _ = fs::remove_file(&live);
                Err(e)
            }
        }
    }
}

fn map_image(live: &Path) -> Result<(Library, ModuleEntryFn), Error> {
    let lib = Library::new(live.as_os_str())?;
    let entry = unsafe {
        *lib.get::<ModuleEntryFn>(ENTRY_SYM_BYTES)
            .map_err(|e| Error::SymbolNotFound(format!("{}: {}", ENTRY_SYM, e)))?
    };
    Ok((lib, entry))
}

/// A mapped side copy of a module artifact. Dropping it unmaps the library
/// and removes the side copy from disk.
pub struct DlImage {
    lib: Library,
    entry: ModuleEntryFn,
    live: PathBuf,
}

impl DlImage {
    pub fn library(&self) -> &Library {
        &self.lib
    }
}

impl ModuleImage for DlImage {
    fn entry(&self) -> ModuleEntryFn {
        self.entry
    }
}

impl Drop for DlImage {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.live) {
            tracing::warn!("could not remove image copy {}: {}", self.live.display(), e);
        }
    }
}
