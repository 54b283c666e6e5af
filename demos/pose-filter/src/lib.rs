//! The hot side of the pose demo: an exponential-moving-average filter
//! over a bounded sample history. Rebuild this crate while the demo host
//! runs and the swap takes effect on the next poll.

use core::fmt::Write;
use core::sync::atomic::{AtomicU32, Ordering};
use pose_api::{PoseApi, POSE_API_VERSION};
use relo_module::{Bridge, HostString, HostVec, LineBuf, TableHeader};

const ALPHA: f32 = 0.25;
const WINDOW: usize = 8;

// per-image step counter; resets naturally when a rebuilt image loads
static STEPS: AtomicU32 = AtomicU32::new(0);

fn hot() -> PoseApi {
    PoseApi {
        header: TableHeader::cold(),
        abi_version,
        smooth,
        describe,
    }
}

extern "C" fn abi_version() -> u32 {
    POSE_API_VERSION
}

/// EWMA over the whole window; seeded by the oldest sample.
fn ewma(samples: &[f32]) -> Option<f32> {
    let mut acc = None;
    for &x in samples {
        acc = Some(match acc {
            None => x,
            Some(a) => a + ALPHA * (x - a),
        });
    }
    acc
}

unsafe extern "C" fn smooth(history: *mut HostVec, bridge: *const Bridge, sample: f32) -> f32 {
    let (history, bridge) = match (history.as_mut(), bridge.as_ref()) {
        (Some(h), Some(b)) => (h, b),
        _ => return sample,
    };
    history.push(bridge, sample);
    let len = history.len();
    if len > WINDOW {
        history.as_mut_slice().copy_within(len - WINDOW.., 0);
        if !history.resize(bridge, WINDOW) {
            return sample;
        }
    }
    ewma(history.as_slice()).unwrap_or(sample)
}

unsafe extern "C" fn describe(out: *mut HostString, bridge: *const Bridge) -> i32 {
    let (out, bridge) = match (out.as_mut(), bridge.as_ref()) {
        (Some(o), Some(b)) => (o, b),
        _ => return -1,
    };
    let mut line = LineBuf::new();
    let _ = write!(line, "ewma alpha={} window={}", ALPHA, WINDOW);
    match out.try_assign(bridge, line.as_str()) {
        Ok(true) => 0,
        _ => -1,
    }
}

fn init(bridge: &Bridge) {
    bridge.log_fmt(format_args!("pose-filter up, alpha={}", ALPHA));
}

fn deinit(bridge: &Bridge) {
    bridge.log_fmt(format_args!(
        "pose-filter down after {} steps",
        STEPS.load(Ordering::Relaxed)
    ));
}

fn step(_: &Bridge) {
    STEPS.fetch_add(1, Ordering::Relaxed);
}

relo_guest::guest_module! {
    table: PoseApi,
    hot: hot,
    init: init,
    deinit: deinit,
    step: step,
}
