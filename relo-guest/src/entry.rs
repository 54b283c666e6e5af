//! The single exported dispatcher of a guest module.

use crate::cell::{BackupCell, BridgeCell};
use relo_module::{
    ApiTable, Bridge, LifecycleOp, ModuleContext, ERR_BAD_OP, ERR_BRIDGE_UNSET, ERR_NO_CONTEXT,
    ERR_NO_USERDATA, STATUS_OK, STREAM_OUT,
};

/// Optional per-module lifecycle hooks.
#[derive(Copy, Clone, Default)]
pub struct Hooks {
    /// Runs after the hot table is installed and the bridge snapshot is
    /// taken; freestanding builds walk their manual static-initializer
    /// table here.
    pub init: Option<fn(&Bridge)>,
    /// Runs before the table is restored on UNLOAD/CLOSE; freestanding
    /// builds run their static-destructor stack here.
    pub deinit: Option<fn(&Bridge)>,
    /// Reserved per-tick hook, driven once per host poll.
    pub step: Option<fn(&Bridge)>,
}

/// Drive one lifecycle operation against the table referenced by `ctx`.
///
/// LOAD snapshots the current field values as the backup (cold defaults on
/// a first load, the prior generation's hot pointers on a reload), installs
/// the hot table, bumps the generation by one, and value-copies the host
/// bridge into `snapshot`. UNLOAD/CLOSE restore the backed-up fields but
/// keep the entry-time generation, so a full reload cycle nets exactly one
/// increment. Every failure is a negative status; nothing here panics or
/// unwinds across the boundary.
///
/// # Safety
///
/// `ctx` must be null or point at a live [`ModuleContext`] whose `userdata`
/// is null or references a `T`. Must be called from the host's single
/// lifecycle thread.
pub unsafe fn dispatch<T: ApiTable>(
    ctx: *mut ModuleContext,
    op: u32,
    backup: &BackupCell<T>,
    snapshot: &BridgeCell,
    hot: fn() -> T,
    hooks: Hooks,
) -> i32 {
    if ctx.is_null() {
        return ERR_NO_CONTEXT;
    }
    let ctx = &mut *ctx;
    if ctx.userdata.is_null() {
        return ERR_NO_USERDATA;
    }
    let op = match LifecycleOp::try_from_u32(op) {
        Some(op) => op,
        None => return ERR_BAD_OP,
    };

    let table = &mut *(ctx.userdata as *mut T);
    let entry_generation = table.header().generation;
    backup.capture_once(*table);
    let backup_table = backup.get().unwrap_or_else(|| *table);

    match op {
        LifecycleOp::Load => {
            let bridge_src = backup_table.header().bridge;
            if bridge_src.is_null() {
                // a static initializer racing LOAD wiring lands here; fail
                // the load rather than dereference null later
                return ERR_BRIDGE_UNSET;
            }
            // Private value copy: the snapshot stays valid for the lifetime
            // of this image even after a prior image unmaps.
            snapshot.copy_from(bridge_src);

            *table = hot();
            table.header_mut().generation = entry_generation + 1;
            table.header_mut().bridge = bridge_src;

            let bridge = snapshot.get();
            bridge.write_fmt(
                STREAM_OUT,
                format_args!(
                    "[guest] load generation={} version={}\n",
                    entry_generation + 1,
                    ctx.version
                ),
            );
            if let Some(init) = hooks.init {
                init(bridge);
            }
        }
        LifecycleOp::Step => {
            if let Some(step) = hooks.step {
                step(snapshot.get());
            }
        }
        LifecycleOp::Unload | LifecycleOp::Close => {
            let bridge = snapshot.get();
            if let Some(deinit) = hooks.deinit {
                deinit(bridge);
            }
            bridge.write_fmt(
                STREAM_OUT,
                format_args!("[guest] {:?}: restoring backed-up table\n", op),
            );
            *table = backup_table;
            // the generation survives restore, so the next image's LOAD
            // observes exactly one increment per reload cycle
            table.header_mut().generation = entry_generation;
        }
    }
    STATUS_OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::ptr;
    use relo_module::TableHeader;

    #[repr(C)]
    #[derive(Copy, Clone)]
    struct TestApi {
        header: TableHeader,
        answer: extern "C" fn() -> u32,
    }

    extern "C" fn cold_answer() -> u32 {
        0
    }

    extern "C" fn hot_answer() -> u32 {
        41
    }

    unsafe impl ApiTable for TestApi {
        fn cold() -> TestApi {
            TestApi {
                header: TableHeader::cold(),
                answer: cold_answer,
            }
        }
        fn header(&self) -> &TableHeader {
            &self.header
        }
        fn header_mut(&mut self) -> &mut TableHeader {
            &mut self.header
        }
    }

    fn hot() -> TestApi {
        TestApi {
            header: TableHeader::cold(),
            answer: hot_answer,
        }
    }

    fn ctx_for(table: &mut TestApi) -> ModuleContext {
        ModuleContext {
            userdata: table as *mut TestApi as *mut _,
            version: 0,
            generation: table.header.generation,
        }
    }

    #[test]
    fn rejects_null_context_and_userdata() {
        let backup = BackupCell::new();
        let snapshot = BridgeCell::new();
        let rc = unsafe {
            dispatch::<TestApi>(
                ptr::null_mut(),
                LifecycleOp::Load as u32,
                &backup,
                &snapshot,
                hot,
                Hooks::default(),
            )
        };
        assert_eq!(rc, ERR_NO_CONTEXT);

        let mut ctx = ModuleContext {
            userdata: ptr::null_mut(),
            version: 0,
            generation: 0,
        };
        let rc = unsafe {
            dispatch::<TestApi>(
                &mut ctx,
                LifecycleOp::Load as u32,
                &backup,
                &snapshot,
                hot,
                Hooks::default(),
            )
        };
        assert_eq!(rc, ERR_NO_USERDATA);
    }

    #[test]
    fn rejects_unknown_operation() {
        let backup = BackupCell::new();
        let snapshot = BridgeCell::new();
        let mut table = TestApi::cold();
        let mut ctx = ctx_for(&mut table);
        let rc = unsafe { dispatch(&mut ctx, 99, &backup, &snapshot, hot, Hooks::default()) };
        assert_eq!(rc, ERR_BAD_OP);
    }

    #[test]
    fn load_without_bridge_fails_loudly() {
        let backup = BackupCell::new();
        let snapshot = BridgeCell::new();
        let mut table = TestApi::cold(); // cold header has a null bridge
        let mut ctx = ctx_for(&mut table);
        let rc = unsafe {
            dispatch(
                &mut ctx,
                LifecycleOp::Load as u32,
                &backup,
                &snapshot,
                hot,
                Hooks::default(),
            )
        };
        assert_eq!(rc, ERR_BRIDGE_UNSET);
        // table untouched
        assert_eq!(table.answer as usize, cold_answer as usize);
    }

    #[test]
    fn load_installs_and_unload_restores() {
        let backup = BackupCell::new();
        let snapshot = BridgeCell::new();
        let host_bridge = Bridge::unset();
        let mut table = TestApi::cold();
        table.header.bridge = &host_bridge;

        let mut ctx = ctx_for(&mut table);
        let rc = unsafe {
            dispatch(
                &mut ctx,
                LifecycleOp::Load as u32,
                &backup,
                &snapshot,
                hot,
                Hooks::default(),
            )
        };
        assert_eq!(rc, STATUS_OK);
        assert_eq!((table.answer)(), 41);
        assert_eq!(table.header.generation, 1);
        assert_eq!(table.header.bridge, &host_bridge as *const Bridge);

        let mut ctx = ctx_for(&mut table);
        let rc = unsafe {
            dispatch(
                &mut ctx,
                LifecycleOp::Unload as u32,
                &backup,
                &snapshot,
                hot,
                Hooks::default(),
            )
        };
        assert_eq!(rc, STATUS_OK);
        // fields restored to the backup, generation kept at its entry value
        assert_eq!(table.answer as usize, cold_answer as usize);
        assert_eq!(table.header.generation, 1);
    }

    #[test]
    fn step_runs_the_hook() {
        use core::sync::atomic::{AtomicU32, Ordering};
        static TICKS: AtomicU32 = AtomicU32::new(0);
        fn tick(_: &Bridge) {
            TICKS.fetch_add(1, Ordering::SeqCst);
        }

        let backup = BackupCell::new();
        let snapshot = BridgeCell::new();
        let mut table = TestApi::cold();
        let mut ctx = ctx_for(&mut table);
        let hooks = Hooks {
            step: Some(tick),
            ..Hooks::default()
        };
        let rc =
            unsafe { dispatch(&mut ctx, LifecycleOp::Step as u32, &backup, &snapshot, hot, hooks) };
        assert_eq!(rc, STATUS_OK);
        assert_eq!(TICKS.load(Ordering::SeqCst), 1);
    }
}
