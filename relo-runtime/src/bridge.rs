//! Host implementations of the ownership bridge.
//!
//! Guest modules never allocate: every growable container they hold is
//! backed by a native `Vec` created here, reachable only through an opaque
//! handle. Each callback honors the `relo_module::Bridge` contract —
//! resize and destroy republish the {begin, end, capacity} view triple,
//! destroy nulls the handles, and a failed allocation publishes zero
//! capacity instead of partial state. A live-allocation registry makes
//! every create/release observable.

use lazy_static::lazy_static;
use relo_module::{Bridge, RawHandle, STREAM_ERR, STREAM_OUT};
use std::io::Write;
use std::ptr;
use std::slice;
use std::sync::Mutex;
use std::time::Instant;

lazy_static! {
    static ref CLOCK_BASE: Instant = Instant::now();
    static ref LIVE: Mutex<LiveCounts> = Mutex::new(LiveCounts::default());
}

#[derive(Default, Clone, Copy)]
struct LiveCounts {
    floats: usize,
    bytes: usize,
}

#[derive(Clone, Copy, Debug)]
enum Kind {
    Floats,
    Bytes,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Floats => "floats",
            Kind::Bytes => "bytes",
        }
    }
}

fn with_live<R>(f: impl FnOnce(&mut LiveCounts) -> R) -> R {
    let mut guard = LIVE.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut guard)
}

fn count(kind: Kind, delta: isize) {
    with_live(|live| {
        let slot = match kind {
            Kind::Floats => &mut live.floats,
            Kind::Bytes => &mut live.bytes,
        };
        *slot = (*slot as isize + delta) as usize;
    });
}

/// Live native allocations per element kind, `(floats, bytes)`. Tests use
/// this to prove destroy releases exactly what resize created.
pub fn live_buffer_counts() -> (usize, usize) {
    with_live(|live| (live.floats, live.bytes))
}

/// The true bridge implementations, populated at host process start.
pub fn host_bridge() -> Bridge {
    // pin the clock base to the first bridge construction
    lazy_static::initialize(&CLOCK_BASE);
    Bridge {
        now: Some(host_now),
        resize_floats: Some(resize_floats),
        destroy_floats: Some(destroy_floats),
        push_float: Some(push_float),
        resize_bytes: Some(resize_bytes),
        destroy_bytes: Some(destroy_bytes),
        log: Some(host_log),
        write: Some(host_write),
        exit: Some(host_exit),
    }
}

unsafe fn publish<T>(views: *mut *mut T, v: &mut Vec<T>) {
    let base = v.as_mut_ptr();
    *views = base;
    *views.add(1) = base.add(v.len());
    *views.add(2) = base.add(v.capacity());
}

unsafe fn publish_empty<T>(views: *mut *mut T) {
    *views = ptr::null_mut();
    *views.add(1) = ptr::null_mut();
    *views.add(2) = ptr::null_mut();
}

/// Get the native container behind `guest`, allocating it on first use.
unsafe fn get_or_create<'a, T>(guest: *mut RawHandle, kind: Kind) -> &'a mut Vec<T> {
    if (*guest).is_null() {
        let raw = Box::into_raw(Box::new(Vec::<T>::new()));
        *guest = raw as RawHandle;
        count(kind, 1);
        tracing::debug!("bridge: allocate {} buffer {:p}", kind.name(), raw);
        &mut *raw
    } else {
        &mut *(*guest as *mut Vec<T>)
    }
}

unsafe fn resize_impl<T: Default + Clone>(
    guest: *mut RawHandle,
    views: *mut *mut T,
    len: usize,
    kind: Kind,
) {
    let v = get_or_create::<T>(guest, kind);
    if len > v.len() && v.try_reserve_exact(len - v.len()).is_err() {
        tracing::error!("bridge: {} resize to {} refused by allocator", kind.name(), len);
        publish_empty(views);
        return;
    }
    v.resize(len, T::default());
    publish(views, v);
}

unsafe fn destroy_impl<T>(
    guest: *mut RawHandle,
    host: *mut RawHandle,
    views: *mut *mut T,
    kind: Kind,
) {
    // A buffer whose logical ownership migrated leaves only the host-side
    // handle populated; either way exactly one allocation is released.
    if (*guest).is_null() && !(*host).is_null() {
        let raw = *host as *mut Vec<T>;
        tracing::debug!("bridge: release migrated {} buffer {:p}", kind.name(), raw);
        drop(Box::from_raw(raw));
        *host = ptr::null_mut();
        count(kind, -1);
    }
    if !(*guest).is_null() {
        let raw = *guest as *mut Vec<T>;
        tracing::debug!("bridge: release {} buffer {:p}", kind.name(), raw);
        drop(Box::from_raw(raw));
        *guest = ptr::null_mut();
        count(kind, -1);
    }
    publish_empty(views);
}

unsafe extern "C" fn resize_floats(
    guest: *mut RawHandle,
    _host: *mut RawHandle,
    views: *mut *mut f32,
    len: usize,
) {
    resize_impl::<f32>(guest, views, len, Kind::Floats)
}

unsafe extern "C" fn destroy_floats(
    guest: *mut RawHandle,
    host: *mut RawHandle,
    views: *mut *mut f32,
) {
    destroy_impl::<f32>(guest, host, views, Kind::Floats)
}

unsafe extern "C" fn push_float(
    guest: *mut RawHandle,
    _host: *mut RawHandle,
    views: *mut *mut f32,
    value: f32,
) {
    let v = get_or_create::<f32>(guest, Kind::Floats);
    if v.len() == v.capacity() && v.try_reserve(1).is_err() {
        tracing::error!("bridge: float push refused by allocator");
        publish_empty(views);
        return;
    }
    v.push(value);
    publish(views, v);
}

unsafe extern "C" fn resize_bytes(
    guest: *mut RawHandle,
    _host: *mut RawHandle,
    views: *mut *mut u8,
    len: usize,
) {
    resize_impl::<u8>(guest, views, len, Kind::Bytes)
}

unsafe extern "C" fn destroy_bytes(
    guest: *mut RawHandle,
    host: *mut RawHandle,
    views: *mut *mut u8,
) {
    destroy_impl::<u8>(guest, host, views, Kind::Bytes)
}

unsafe extern "C" fn host_log(ptr: *const u8, len: usize) -> i32 {
    if ptr.is_null() {
        return -1;
    }
    let msg = String::from_utf8_lossy(slice::from_raw_parts(ptr, len));
    tracing::info!(target: "guest", "{}", msg.trim_end());
    len as i32
}

unsafe extern "C" fn host_write(stream: i32, ptr: *const u8, len: usize) -> i32 {
    if ptr.is_null() {
        return -1;
    }
    let bytes = slice::from_raw_parts(ptr, len);
    let res = match stream {
        STREAM_OUT => std::io::stdout().write_all(bytes),
        STREAM_ERR => std::io::stderr().write_all(bytes),
        _ => return -1,
    };
    match res {
        Ok(()) => len as i32,
        Err(_) => -1,
    }
}

unsafe extern "C" fn host_exit(code: i32) -> ! {
    tracing::error!("bridge: guest requested process exit with code {}", code);
    std::process::exit(code)
}

unsafe extern "C" fn host_now() -> f64 {
    CLOCK_BASE.elapsed().as_secs_f64()
}
