//! The reload lifecycle controller.
//!
//! A [`Reloader`] owns one API table, one bridge, and at most one mapped
//! image, and drives the image through LOAD, STEP, UNLOAD, and CLOSE. The
//! table it exposes is always callable: before the first load and after
//! any failure it holds cold defaults, and a successful reload cycle nets
//! exactly one generation increment.

use crate::bridge::host_bridge;
use crate::error::Error;
use crate::image::{ImageSource, ImageStamp, ModuleImage};
use relo_module::{ApiTable, Bridge, LifecycleOp, ModuleContext, ModuleEntryFn};
use std::ffi::c_void;

pub struct Reloader<T: ApiTable, S: ImageSource> {
    source: S,
    image: Option<S::Image>,
    // boxed so the addresses handed to guest images stay stable even if
    // the Reloader value moves
    table: Box<T>,
    bridge: Box<Bridge>,
    version: u32,
    last_stamp: Option<ImageStamp>,
}

impl<T: ApiTable, S: ImageSource> Reloader<T, S> {
    /// A controller in the Unloaded state: cold table, live bridge, no
    /// image mapped.
    pub fn new(source: S) -> Reloader<T, S> {
        let mut table = Box::new(T::cold());
        let bridge = Box::new(host_bridge());
        table.header_mut().bridge = &*bridge;
        Reloader {
            source,
            image: None,
            table,
            bridge,
            version: 0,
            last_stamp: None,
        }
    }

    /// The current API table. Callable in every state.
    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn generation(&self) -> u32 {
        self.table.header().generation
    }

    /// Count of successful hot swaps since open.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Map the image and run its LOAD. Idempotent once loaded. On a
    /// negative LOAD status the image is unmapped and the table reset to
    /// cold defaults before the error returns.
    pub fn open(&mut self) -> Result<(), Error> {
        if self.image.is_some() {
            return Ok(());
        }
        let stamp = self.source.stamp()?;
        let image = self.source.load()?;
        let entry = image.entry();
        self.image = Some(image);

        let rc = self.call(entry, LifecycleOp::Load);
        if rc < 0 {
            self.fail_safe(LifecycleOp::Load, rc);
            return Err(Error::EntryFault(LifecycleOp::Load, rc));
        }
        self.last_stamp = Some(stamp);
        tracing::info!(
            "module open, generation {} version {}",
            self.generation(),
            self.version
        );
        Ok(())
    }

    /// One frame: swap in a rebuilt image when the stamp moved (skipped
    /// with `reload_check` off), then STEP. Returns whether the module is
    /// loaded and stepping afterwards; any failure along the way lands on
    /// the cold table.
    pub fn poll(&mut self, reload_check: bool) -> bool {
        if self.image.is_none() {
            return false;
        }

        if reload_check {
            match self.source.stamp() {
                Ok(stamp) if Some(stamp) != self.last_stamp => {
                    if !self.reload(stamp) {
                        return false;
                    }
                }
                // an unobservable artifact is not a change; keep stepping
                Ok(_) | Err(_) => {}
            }
        }

        let entry = match &self.image {
            Some(image) => image.entry(),
            None => return false,
        };
        let rc = self.call(entry, LifecycleOp::Step);
        if rc < 0 {
            self.fail_safe(LifecycleOp::Step, rc);
            return false;
        }
        true
    }

    /// UNLOAD the old image, map the new one, LOAD it.
    fn reload(&mut self, stamp: ImageStamp) -> bool {
        tracing::info!("module artifact changed, swapping");
        if let Some(image) = &self.image {
            let entry = image.entry();
            let rc = self.call(entry, LifecycleOp::Unload);
            if rc < 0 {
                self.fail_safe(LifecycleOp::Unload, rc);
                return false;
            }
        }
        self.image = None;

        let image = match self.source.load() {
            Ok(image) => image,
            Err(e) => {
                tracing::error!("could not map replacement image: {}", e);
                self.reset_cold();
                return false;
            }
        };
        let entry = image.entry();
        self.image = Some(image);

        let rc = self.call(entry, LifecycleOp::Load);
        if rc < 0 {
            self.fail_safe(LifecycleOp::Load, rc);
            return false;
        }
        self.version += 1;
        self.last_stamp = Some(stamp);
        tracing::info!(
            "module swapped, generation {} version {}",
            self.generation(),
            self.version
        );
        true
    }

    /// Run CLOSE, unmap, and return to cold defaults. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(image) = &self.image {
            let entry = image.entry();
            let rc = self.call(entry, LifecycleOp::Close);
            if rc < 0 {
                tracing::error!("CLOSE returned {}; unmapping anyway", rc);
            }
        }
        self.image = None;
        self.reset_cold();
        tracing::info!("module shut down");
    }

    fn call(&mut self, entry: ModuleEntryFn, op: LifecycleOp) -> i32 {
        let mut ctx = ModuleContext {
            userdata: &mut *self.table as *mut T as *mut c_void,
            version: self.version,
            generation: self.table.header().generation,
        };
        unsafe { entry(&mut ctx, op as u32) }
    }

    fn fail_safe(&mut self, op: LifecycleOp, rc: i32) {
        tracing::error!("entry returned {} during {:?}; resetting to cold table", rc, op);
        self.image = None;
        self.reset_cold();
    }

    fn reset_cold(&mut self) {
        *self.table = T::cold();
        self.table.header_mut().bridge = &*self.bridge;
    }
}
