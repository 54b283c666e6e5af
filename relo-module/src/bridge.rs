use core::ffi::c_void;
use core::fmt;

/// Opaque identity of a native container on one side of the boundary.
pub type RawHandle = *mut c_void;

/// Grow or shrink native storage to `len` elements, publishing the new
/// {begin, end, capacity} triple through `views` (which addresses three
/// consecutive element pointers inside the buffer). A failed host
/// allocation publishes all-null views (zero capacity) and leaves the
/// native container untouched.
pub type ResizeFn<T> =
    unsafe extern "C" fn(guest: *mut RawHandle, host: *mut RawHandle, views: *mut *mut T, len: usize);

/// Release native storage and null both handles and all three views.
/// Idempotent: a destroy with both handles already null is a no-op.
pub type DestroyFn<T> =
    unsafe extern "C" fn(guest: *mut RawHandle, host: *mut RawHandle, views: *mut *mut T);

/// Amortized single-element append for the float kind.
pub type PushFloatFn = unsafe extern "C" fn(
    guest: *mut RawHandle,
    host: *mut RawHandle,
    views: *mut *mut f32,
    value: f32,
);

/// Forward one line to the host's log sink. Guests have no console or file
/// I/O of their own.
pub type LogFn = unsafe extern "C" fn(ptr: *const u8, len: usize) -> i32;

/// Forward preformatted output to a host-identified stream
/// ([`STREAM_OUT`] or [`STREAM_ERR`]).
pub type WriteFn = unsafe extern "C" fn(stream: i32, ptr: *const u8, len: usize) -> i32;

/// Terminate the whole process via the host's path.
pub type ExitFn = unsafe extern "C" fn(code: i32) -> !;

/// Monotonic seconds; a minimal-runtime guest has no clock API of its own.
pub type NowFn = unsafe extern "C" fn() -> f64;

pub const STREAM_OUT: i32 = 1;
pub const STREAM_ERR: i32 = 2;

/// Process exit code used by [`Bridge::fatal`].
pub const FATAL_EXIT_CODE: i32 = 137;

/// A buffer operation was requested before the matching bridge callback was
/// installed. Names the missing callback.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BridgeNotReady(pub &'static str);

/// The table of host-supplied callbacks through which guest code performs
/// every host-memory-owning operation.
///
/// One instance exists per side: the host's is populated at process start
/// with the true implementations, the guest's starts [`unset`]
/// (`Bridge::unset`) and is value-copied from the host's at LOAD time — a
/// private snapshot, not a pointer indirection, so it stays valid across
/// reloads. Guest code must never call its own allocator or runtime for the
/// element kinds covered here.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct Bridge {
    pub now: Option<NowFn>,
    pub resize_floats: Option<ResizeFn<f32>>,
    pub destroy_floats: Option<DestroyFn<f32>>,
    pub push_float: Option<PushFloatFn>,
    pub resize_bytes: Option<ResizeFn<u8>>,
    pub destroy_bytes: Option<DestroyFn<u8>>,
    pub log: Option<LogFn>,
    pub write: Option<WriteFn>,
    pub exit: Option<ExitFn>,
}

impl Bridge {
    /// The guest-side initial value: every callback absent.
    pub const fn unset() -> Bridge {
        Bridge {
            now: None,
            resize_floats: None,
            destroy_floats: None,
            push_float: None,
            resize_bytes: None,
            destroy_bytes: None,
            log: None,
            write: None,
            exit: None,
        }
    }

    /// Whether every callback is populated.
    pub fn is_ready(&self) -> bool {
        self.now.is_some()
            && self.resize_floats.is_some()
            && self.destroy_floats.is_some()
            && self.push_float.is_some()
            && self.resize_bytes.is_some()
            && self.destroy_bytes.is_some()
            && self.log.is_some()
            && self.write.is_some()
            && self.exit.is_some()
    }

    /// Monotonic seconds, or 0.0 before the clock callback is installed.
    pub fn now(&self) -> f64 {
        match self.now {
            Some(now) => unsafe { now() },
            None => 0.0,
        }
    }

    /// Send one line to the host log sink. Returns a negative value if the
    /// callback is unset.
    pub fn log_str(&self, msg: &str) -> i32 {
        match self.log {
            Some(log) => unsafe { log(msg.as_ptr(), msg.len()) },
            None => -1,
        }
    }

    pub fn write_str(&self, stream: i32, msg: &str) -> i32 {
        match self.write {
            Some(write) => unsafe { write(stream, msg.as_ptr(), msg.len()) },
            None => -1,
        }
    }

    /// Formatted passthrough to a host stream. Formats into a fixed stack
    /// buffer (guests may have no allocator); long lines are truncated.
    pub fn write_fmt(&self, stream: i32, args: fmt::Arguments) -> i32 {
        let mut line = LineBuf::new();
        let _ = fmt::Write::write_fmt(&mut line, args);
        self.write_str(stream, line.as_str())
    }

    /// Formatted line to the log sink, same buffering as [`write_fmt`]
    /// (`Bridge::write_fmt`).
    pub fn log_fmt(&self, args: fmt::Arguments) -> i32 {
        let mut line = LineBuf::new();
        let _ = fmt::Write::write_fmt(&mut line, args);
        self.log_str(line.as_str())
    }

    /// Terminal path for guest-side contract violations.
    ///
    /// Reports through whatever callbacks are present, then exits the
    /// process via the host. Continuing would silently corrupt memory the
    /// guest does not own, so this never returns; with no exit callback
    /// installed either, the only freestanding-safe option left is to spin.
    pub fn fatal(&self, what: &str) -> ! {
        self.log_str(what);
        self.write_str(STREAM_ERR, what);
        if let Some(exit) = self.exit {
            unsafe { exit(FATAL_EXIT_CODE) }
        }
        loop {}
    }
}

impl Default for Bridge {
    fn default() -> Bridge {
        Bridge::unset()
    }
}

/// Fixed-capacity line buffer implementing `core::fmt::Write`, so guests
/// can format without an allocator. Truncates on a UTF-8 boundary.
pub struct LineBuf {
    buf: [u8; 256],
    len: usize,
}

impl LineBuf {
    pub const fn new() -> LineBuf {
        LineBuf {
            buf: [0; 256],
            len: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl fmt::Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buf.len() - self.len;
        let mut take = s.len().min(room);
        while take > 0 && !s.is_char_boundary(take) {
            take -= 1;
        }
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn unset_bridge_reports_not_ready() {
        let bridge = Bridge::unset();
        assert!(!bridge.is_ready());
        assert_eq!(bridge.log_str("nobody home"), -1);
        assert_eq!(bridge.write_str(STREAM_OUT, "nobody home"), -1);
        assert_eq!(bridge.now(), 0.0);
    }

    #[test]
    fn line_buf_formats_and_truncates() {
        let mut line = LineBuf::new();
        write!(line, "gen={} t={:.1}", 3, 0.5).unwrap();
        assert_eq!(line.as_str(), "gen=3 t=0.5");

        line.clear();
        for _ in 0..40 {
            let _ = write!(line, "0123456789");
        }
        assert_eq!(line.len(), 256);
    }

    #[test]
    fn line_buf_truncates_on_char_boundary() {
        let mut line = LineBuf::new();
        for _ in 0..255 {
            let _ = write!(line, "x");
        }
        // two-byte char does not fit in the one remaining byte
        let _ = write!(line, "é");
        assert_eq!(line.len(), 255);
        assert!(line.as_str().is_char_boundary(255));
    }
}
