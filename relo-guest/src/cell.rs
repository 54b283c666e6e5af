use core::cell::UnsafeCell;
use relo_module::Bridge;

/// Holds the guest's value-copied bridge snapshot in a `static`.
///
/// Lifecycle calls and all guest code execute on the host's single polling
/// thread; the `Sync` impl exists only so the cell can be a `static`, not
/// because concurrent access is supported.
pub struct BridgeCell(UnsafeCell<Bridge>);

unsafe impl Sync for BridgeCell {}

impl BridgeCell {
    pub const fn new() -> BridgeCell {
        BridgeCell(UnsafeCell::new(Bridge::unset()))
    }

    /// Value-copy the host's table into this cell.
    ///
    /// # Safety
    ///
    /// `src` must point at a live bridge table, and no other access to the
    /// cell may be in progress.
    pub unsafe fn copy_from(&self, src: *const Bridge) {
        *self.0.get() = *src;
    }

    pub fn get(&self) -> &Bridge {
        unsafe { &*self.0.get() }
    }
}

/// Captures the API table's field values at a module image's first entry
/// call: cold defaults on the first load, the prior generation's hot
/// pointers on a reload. UNLOAD/CLOSE restore from here, so the host is
/// never left holding a pointer into this image.
pub struct BackupCell<T>(UnsafeCell<Option<T>>);

unsafe impl<T> Sync for BackupCell<T> {}

impl<T: Copy> BackupCell<T> {
    pub const fn new() -> BackupCell<T> {
        BackupCell(UnsafeCell::new(None))
    }

    /// Stores `value` only if nothing was captured yet.
    pub fn capture_once(&self, value: T) {
        let slot = unsafe { &mut *self.0.get() };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    pub fn get(&self) -> Option<T> {
        unsafe { *self.0.get() }
    }
}
