//! 入口函数
extern crate sel4_panicking;

use core::ptr;
use sel4_ctors_dtors::run_ctors;
use sel4_panicking::catch_unwind;
use sel4_panicking_env::abort;

sel4_panicking_env::register_debug_put_char!(sel4::sys::seL4_DebugPutChar);

/// rust 入口，由 `sel4-runtime-common` 的 `_start` 调用
///
/// 在启动栈上初始化 TLS，设置 IPC Buffer，运行全局构造函数，
/// 然后进入 [crate::entry_point] 声明的 `main`。
#[unsafe(export_name = "sel4_runtime_rust_entry")]
unsafe extern "C" fn main_entry() -> ! {
    unsafe extern "Rust" {
        fn _impl_main() -> !;
    }

    let cont_fn = |_| {
        sel4::set_ipc_buffer(crate::layout::ipc_buffer());
        run_ctors();

        match catch_unwind(|| unsafe { _impl_main() }) {
            Ok(never) => never,
            Err(_) => abort!("sdio main() panicked"),
        }
    };

    unsafe { sel4_runtime_common::initialize_tls_on_stack_and_continue(cont_fn, ptr::null_mut()) }
}

/// 声明任务的 `main`，并在进入之前安装日志
///
/// 不指定日志级别时使用 `Info`。
#[macro_export]
macro_rules! entry_point {
    ($main:path) => {
        $crate::entry_point!($main, $crate::LevelFilter::Info);
    };
    ($main:path, $level:expr) => {
        #[unsafe(no_mangle)]
        extern "Rust" fn _impl_main() -> ! {
            $crate::logging::init($level);
            $main()
        }
    };
}
