use crate::bridge::{Bridge, BridgeNotReady, DestroyFn, RawHandle, ResizeFn};
use core::ptr;
use core::slice;

/// Element kinds the ownership bridge can allocate.
///
/// # Safety
///
/// Implementations must select the bridge callbacks matching their element
/// type exactly; routing one kind's handle through another kind's callbacks
/// is the kind-mismatch contract violation the design leaves undefined.
pub unsafe trait BufKind: Copy + 'static {
    const KIND: &'static str;
    fn resize_cb(bridge: &Bridge) -> Option<ResizeFn<Self>>;
    fn destroy_cb(bridge: &Bridge) -> Option<DestroyFn<Self>>;
}

unsafe impl BufKind for f32 {
    const KIND: &'static str = "floats";
    fn resize_cb(bridge: &Bridge) -> Option<ResizeFn<f32>> {
        bridge.resize_floats
    }
    fn destroy_cb(bridge: &Bridge) -> Option<DestroyFn<f32>> {
        bridge.destroy_floats
    }
}

unsafe impl BufKind for u8 {
    const KIND: &'static str = "bytes";
    fn resize_cb(bridge: &Bridge) -> Option<ResizeFn<u8>> {
        bridge.resize_bytes
    }
    fn destroy_cb(bridge: &Bridge) -> Option<DestroyFn<u8>> {
        bridge.destroy_bytes
    }
}

/// Growable sequence whose backing storage is always allocated and freed by
/// the host, regardless of which side holds the logical handle.
///
/// The `begin`/`end`/`cap` views address host-native storage (valid because
/// host and guest share one address space) and form a borrowed snapshot:
/// any bridge call that may reallocate invalidates previously read
/// pointers, the standard invalidate-on-resize discipline. At most one
/// native allocation backs a handle at any time.
///
/// There is deliberately no `Drop` impl — releasing storage requires the
/// bridge, which a POD cross-ABI type cannot own. Destruction is explicit
/// via [`destroy`](HostBuf::destroy); the host side keeps a live-allocation
/// registry, so a forgotten buffer is observable rather than silent.
#[repr(C)]
#[derive(Debug)]
pub struct HostBuf<T: BufKind> {
    begin: *mut T,
    end: *mut T,
    cap: *mut T,
    guest: RawHandle,
    host: RawHandle,
}

/// Float-vector kind.
pub type HostVec = HostBuf<f32>;
/// String/byte kind.
pub type HostString = HostBuf<u8>;

impl<T: BufKind> HostBuf<T> {
    /// An empty buffer: no handles, no storage. The empty state is the
    /// initial one and is safely re-entered by `destroy`.
    pub const fn new() -> HostBuf<T> {
        HostBuf {
            begin: ptr::null_mut(),
            end: ptr::null_mut(),
            cap: ptr::null_mut(),
            guest: ptr::null_mut(),
            host: ptr::null_mut(),
        }
    }

    pub fn len(&self) -> usize {
        if self.begin.is_null() {
            0
        } else {
            (self.end as usize - self.begin as usize) / core::mem::size_of::<T>()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        if self.begin.is_null() {
            0
        } else {
            (self.cap as usize - self.begin as usize) / core::mem::size_of::<T>()
        }
    }

    /// Whether a native allocation currently backs this handle.
    pub fn has_allocation(&self) -> bool {
        !self.guest.is_null() || !self.host.is_null()
    }

    pub fn as_slice(&self) -> &[T] {
        let len = self.len();
        if len == 0 {
            &[]
        } else {
            unsafe { slice::from_raw_parts(self.begin, len) }
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len();
        if len == 0 {
            &mut []
        } else {
            unsafe { slice::from_raw_parts_mut(self.begin, len) }
        }
    }

    /// Detection layer under [`resize`](HostBuf::resize): reports an unset
    /// callback instead of taking the fatal path. `Ok(false)` means the
    /// host allocator failed and zero capacity was published.
    pub fn try_resize(&mut self, bridge: &Bridge, len: usize) -> Result<bool, BridgeNotReady> {
        let resize = T::resize_cb(bridge).ok_or(BridgeNotReady(T::KIND))?;
        unsafe {
            resize(
                &mut self.guest as *mut RawHandle,
                &mut self.host as *mut RawHandle,
                &mut self.begin as *mut *mut T,
                len,
            );
        }
        Ok(self.capacity() >= len)
    }

    /// Resize through the bridge. Prior content is preserved up to
    /// `min(old_len, len)`; growth policy belongs to the host.
    ///
    /// Returns `false` when the host allocator failed (the views come back
    /// with zero capacity); callers must abort the requesting operation.
    /// An uninstalled callback takes the fatal path — a silent no-op would
    /// desynchronize the views from host storage.
    pub fn resize(&mut self, bridge: &Bridge, len: usize) -> bool {
        match self.try_resize(bridge, len) {
            Ok(ok) => ok,
            Err(BridgeNotReady(kind)) => {
                bridge.log_fmt(format_args!("resize({}) before bridge install", kind));
                bridge.fatal("buffer resize requested before bridge install")
            }
        }
    }

    pub fn try_destroy(&mut self, bridge: &Bridge) -> Result<(), BridgeNotReady> {
        if !self.has_allocation() {
            return Ok(());
        }
        let destroy = T::destroy_cb(bridge).ok_or(BridgeNotReady(T::KIND))?;
        unsafe {
            destroy(
                &mut self.guest as *mut RawHandle,
                &mut self.host as *mut RawHandle,
                &mut self.begin as *mut *mut T,
            );
        }
        Ok(())
    }

    /// Release the native allocation and null every handle and view field.
    /// Idempotent; the buffer is empty and reusable afterward.
    pub fn destroy(&mut self, bridge: &Bridge) {
        if self.try_destroy(bridge).is_err() {
            bridge.fatal("buffer destroy requested before bridge install")
        }
    }

    /// Deep element-wise copy into a freshly resized independent
    /// allocation. Returns an empty buffer if the host allocator fails.
    pub fn duplicate(&self, bridge: &Bridge) -> HostBuf<T> {
        let mut copy = HostBuf::new();
        if copy.resize(bridge, self.len()) {
            copy.as_mut_slice().copy_from_slice(self.as_slice());
        }
        copy
    }

    /// Move-out bookkeeping: transfers the handle and view fields and
    /// leaves `self` empty. Purely local, no bridge round-trip.
    pub fn take(&mut self) -> HostBuf<T> {
        core::mem::replace(self, HostBuf::new())
    }
}

impl HostBuf<f32> {
    pub fn try_push(&mut self, bridge: &Bridge, value: f32) -> Result<(), BridgeNotReady> {
        let push = bridge.push_float.ok_or(BridgeNotReady("push_float"))?;
        unsafe {
            push(
                &mut self.guest as *mut RawHandle,
                &mut self.host as *mut RawHandle,
                &mut self.begin as *mut *mut f32,
                value,
            );
        }
        Ok(())
    }

    /// Amortized single-element append.
    pub fn push(&mut self, bridge: &Bridge, value: f32) {
        if self.try_push(bridge, value).is_err() {
            bridge.fatal("push requested before bridge install")
        }
    }
}

impl HostBuf<u8> {
    /// The contents as UTF-8, if valid.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_slice()).ok()
    }

    pub fn try_assign(&mut self, bridge: &Bridge, s: &str) -> Result<bool, BridgeNotReady> {
        let ok = self.try_resize(bridge, s.len())?;
        if ok {
            self.as_mut_slice().copy_from_slice(s.as_bytes());
        }
        Ok(ok)
    }

    /// Replace the contents. `false` on host allocation failure.
    pub fn assign(&mut self, bridge: &Bridge, s: &str) -> bool {
        match self.try_assign(bridge, s) {
            Ok(ok) => ok,
            Err(_) => bridge.fatal("string assign requested before bridge install"),
        }
    }

    pub fn try_append(&mut self, bridge: &Bridge, s: &str) -> Result<bool, BridgeNotReady> {
        let old = self.len();
        let ok = self.try_resize(bridge, old + s.len())?;
        if ok {
            self.as_mut_slice()[old..].copy_from_slice(s.as_bytes());
        }
        Ok(ok)
    }

    /// Append, relying on the resize prefix-preservation contract.
    pub fn append(&mut self, bridge: &Bridge, s: &str) -> bool {
        match self.try_append(bridge, s) {
            Ok(ok) => ok,
            Err(_) => bridge.fatal("string append requested before bridge install"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoffset::offset_of;

    type FloatBuf = HostBuf<f32>;

    #[test]
    fn view_triple_is_contiguous() {
        // the resize/destroy callbacks write three consecutive element
        // pointers starting at `begin`
        let word = core::mem::size_of::<*mut f32>();
        assert_eq!(offset_of!(FloatBuf, begin), 0);
        assert_eq!(offset_of!(FloatBuf, end), word);
        assert_eq!(offset_of!(FloatBuf, cap), 2 * word);
    }

    #[test]
    fn empty_buffer_has_no_views_or_handles() {
        let buf = HostVec::new();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), 0);
        assert!(buf.as_slice().is_empty());
        assert!(!buf.has_allocation());
    }

    #[test]
    fn unset_bridge_is_detected_not_dereferenced() {
        let bridge = Bridge::unset();
        let mut floats = HostVec::new();
        assert_eq!(floats.try_resize(&bridge, 3), Err(BridgeNotReady("floats")));
        assert_eq!(floats.try_push(&bridge, 1.0), Err(BridgeNotReady("push_float")));

        let mut bytes = HostString::new();
        assert_eq!(bytes.try_assign(&bridge, "hi"), Err(BridgeNotReady("bytes")));
    }

    #[test]
    fn destroy_of_empty_buffer_needs_no_bridge() {
        let bridge = Bridge::unset();
        let mut buf = HostVec::new();
        assert_eq!(buf.try_destroy(&bridge), Ok(()));
    }

    #[test]
    fn take_leaves_source_empty() {
        let mut a = HostVec::new();
        let b = a.take();
        assert!(!a.has_allocation());
        assert!(!b.has_allocation());
    }
}
