//! Ownership-bridge buffer tests: guest-held handles, host-owned storage.

use lazy_static::lazy_static;
use relo_runtime::{host_bridge, live_buffer_counts, HostString, HostVec};
use std::sync::Mutex;

lazy_static! {
    // the live-allocation registry is process-global; serialize the tests
    // that assert on it
    static ref REGISTRY_LOCK: Mutex<()> = Mutex::new(());
}

#[test]
fn resize_allocates_and_zero_fills() {
    let _guard = REGISTRY_LOCK.lock().unwrap();
    let bridge = host_bridge();
    let mut buf = HostVec::new();

    assert!(buf.resize(&bridge, 3));
    assert_eq!(buf.len(), 3);
    assert!(buf.capacity() >= 3);
    assert!(buf.has_allocation());
    assert_eq!(buf.as_slice(), &[0.0, 0.0, 0.0]);

    buf.destroy(&bridge);
}

#[test]
fn zero_length_resize_allocates_then_grows() {
    let _guard = REGISTRY_LOCK.lock().unwrap();
    let bridge = host_bridge();
    let mut buf = HostVec::new();

    // resize(0) creates the native container and publishes an empty but
    // valid view triple
    assert!(buf.resize(&bridge, 0));
    assert_eq!(buf.len(), 0);
    assert!(buf.has_allocation());

    assert!(buf.resize(&bridge, 3));
    assert_eq!(buf.len(), 3);

    buf.destroy(&bridge);
}

#[test]
fn push_appends_in_order() {
    let _guard = REGISTRY_LOCK.lock().unwrap();
    let bridge = host_bridge();
    let mut buf = HostVec::new();

    buf.push(&bridge, 1.0);
    buf.push(&bridge, 2.0);
    buf.push(&bridge, 3.0);
    assert_eq!(buf.as_slice(), &[1.0, 2.0, 3.0]);

    buf.destroy(&bridge);
}

#[test]
fn resize_preserves_the_surviving_prefix() {
    let _guard = REGISTRY_LOCK.lock().unwrap();
    let bridge = host_bridge();
    let mut buf = HostVec::new();

    assert!(buf.resize(&bridge, 5));
    for (i, slot) in buf.as_mut_slice().iter_mut().enumerate() {
        *slot = i as f32;
    }

    assert!(buf.resize(&bridge, 3));
    assert_eq!(buf.as_slice(), &[0.0, 1.0, 2.0]);

    assert!(buf.resize(&bridge, 7));
    assert_eq!(buf.len(), 7);
    assert_eq!(&buf.as_slice()[..3], &[0.0, 1.0, 2.0]);
    assert_eq!(&buf.as_slice()[3..], &[0.0, 0.0, 0.0, 0.0]);

    buf.destroy(&bridge);
}

#[test]
fn destroy_releases_exactly_once() {
    let _guard = REGISTRY_LOCK.lock().unwrap();
    let bridge = host_bridge();
    let baseline = live_buffer_counts();

    let mut floats = HostVec::new();
    let mut bytes = HostString::new();
    assert!(floats.resize(&bridge, 4));
    assert!(bytes.assign(&bridge, "abc"));
    assert_eq!(
        live_buffer_counts(),
        (baseline.0 + 1, baseline.1 + 1)
    );

    floats.destroy(&bridge);
    bytes.destroy(&bridge);
    assert_eq!(live_buffer_counts(), baseline);
    assert!(!floats.has_allocation());
    assert_eq!(floats.len(), 0);

    // destroy is idempotent
    floats.destroy(&bridge);
    assert_eq!(live_buffer_counts(), baseline);
}

#[test]
fn duplicate_is_independent_storage() {
    let _guard = REGISTRY_LOCK.lock().unwrap();
    let bridge = host_bridge();
    let mut a = HostVec::new();
    a.push(&bridge, 10.0);
    a.push(&bridge, 20.0);

    let mut b = a.duplicate(&bridge);
    assert_eq!(b.as_slice(), a.as_slice());

    b.as_mut_slice()[0] = 99.0;
    assert_eq!(a.as_slice(), &[10.0, 20.0]);
    assert_eq!(b.as_slice(), &[99.0, 20.0]);

    a.destroy(&bridge);
    b.destroy(&bridge);
}

#[test]
fn take_moves_the_allocation_not_the_storage() {
    let _guard = REGISTRY_LOCK.lock().unwrap();
    let bridge = host_bridge();
    let baseline = live_buffer_counts();

    let mut a = HostVec::new();
    a.push(&bridge, 7.0);
    let mut b = a.take();

    assert!(!a.has_allocation());
    assert_eq!(b.as_slice(), &[7.0]);
    // still one allocation: the handle moved, the storage did not
    assert_eq!(live_buffer_counts().0, baseline.0 + 1);

    b.destroy(&bridge);
    assert_eq!(live_buffer_counts(), baseline);
}

#[test]
fn string_assign_and_append_round_trip() {
    let _guard = REGISTRY_LOCK.lock().unwrap();
    let bridge = host_bridge();
    let mut s = HostString::new();

    assert!(s.assign(&bridge, "pose"));
    assert!(s.append(&bridge, "-filter"));
    assert_eq!(s.as_str(), Some("pose-filter"));
    assert_eq!(s.len(), 11);

    assert!(s.assign(&bridge, ""));
    assert!(s.is_empty());
    assert!(s.has_allocation());

    s.destroy(&bridge);
}

#[test]
fn partially_wired_bridge_is_detected() {
    let mut bridge = host_bridge();
    bridge.push_float = None;

    let mut buf = HostVec::new();
    assert!(buf.try_push(&bridge, 1.0).is_err());
    assert!(!buf.has_allocation());
}
