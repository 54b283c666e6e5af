/// Define a guest module's exported entry point.
///
/// Generates the `relo_module_entry` symbol the host controller resolves,
/// wired to [`entry::dispatch`](crate::entry::dispatch) with this module's
/// table type, hot implementations, and optional lifecycle hooks. The
/// backup of the previous table lives in a per-image static, so a freshly
/// loaded image always captures whatever the host handed it.
///
/// ```ignore
/// relo_guest::guest_module! {
///     table: PoseApi,
///     hot: hot,
///     init: init,
///     deinit: deinit,
/// }
/// ```
#[macro_export]
macro_rules! guest_module {
    (
        table: $table:ty,
        hot: $hot:expr
        $(, init: $init:expr)?
        $(, deinit: $deinit:expr)?
        $(, step: $step:expr)?
        $(,)?
    ) => {
        #[no_mangle]
        pub unsafe extern "C" fn relo_module_entry(
            ctx: *mut $crate::relo_module::ModuleContext,
            op: u32,
        ) -> i32 {
            static BACKUP: $crate::BackupCell<$table> = $crate::BackupCell::new();
            #[allow(unused_mut)]
            let mut hooks = $crate::entry::Hooks::default();
            $(hooks.init = Some($init);)?
            $(hooks.deinit = Some($deinit);)?
            $(hooks.step = Some($step);)?
            $crate::entry::dispatch(ctx, op, &BACKUP, &$crate::GUEST_BRIDGE, $hot, hooks)
        }
    };
}
