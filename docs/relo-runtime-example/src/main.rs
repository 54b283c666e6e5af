use pose_api::PoseApi;
use relo_runtime::image::DlSource;
use relo_runtime::{HostString, HostVec, Reloader};
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // path to the compiled pose-filter cdylib; rebuild it while this runs
    // to see a hot swap
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "target/debug/libpose_filter.so".to_owned());

    let mut reloader: Reloader<PoseApi, DlSource> = Reloader::new(DlSource::new(&path));
    reloader.open()?;

    // host-owned storage the module reads and writes through the bridge
    let mut history = HostVec::new();
    let mut label = HostString::new();
    let bridge = relo_runtime::host_bridge();

    for frame in 0..600u32 {
        // swap in a rebuilt module if the artifact changed, then step it
        reloader.poll(true);

        let raw = (frame as f32 * 0.1).sin();
        let api = reloader.table();
        let smoothed = unsafe { (api.smooth)(&mut history, api.header.bridge, raw) };

        if frame % 60 == 0 {
            let rc = unsafe { (api.describe)(&mut label, api.header.bridge) };
            tracing::info!(
                "frame {}: raw {:.3} smoothed {:.3} filter {:?} (rc {}, generation {})",
                frame,
                raw,
                smoothed,
                label.as_str().unwrap_or("?"),
                rc,
                reloader.generation(),
            );
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    reloader.shutdown();
    // buffers have no Drop; release their host storage explicitly
    history.destroy(&bridge);
    label.destroy(&bridge);
    Ok(())
}
