//! 内存布局
//!
//! - 启动栈的栈顶固定在 [config::SERVICE_BOOT_STACK_TOP]
//! - 堆是一块静态数组，只给 panic 信息和 virtio 的地址表使用
//! - IPC Buffer 放在程序结尾之后的第一个页

use config::SERVICE_HEAP_SIZE;
use sel4::CapTypeForFrameObjectOfFixedSize;
use sel4_dlmalloc::{StaticDlmallocGlobalAlloc, StaticHeap};
use sel4_sync::PanickingRawMutex;

/// `sel4-runtime-common` 的 `_start` 把这个符号里的地址当作栈顶
#[unsafe(export_name = "__sel4_runtime_common__stack_bottom")]
static STACK_TOP: usize = config::SERVICE_BOOT_STACK_TOP;

static HEAP: StaticHeap<SERVICE_HEAP_SIZE> = StaticHeap::new();

/// 堆分配器，发生重入时 panic
#[global_allocator]
static ALLOCATOR: StaticDlmallocGlobalAlloc<PanickingRawMutex, &StaticHeap<SERVICE_HEAP_SIZE>> =
    StaticDlmallocGlobalAlloc::new(PanickingRawMutex::new(), &HEAP);

/// IPC Buffer 所在的虚拟地址
pub fn ipc_buffer_addr() -> usize {
    unsafe extern "C" {
        static _end: usize;
    }
    let granule = sel4::cap_type::Granule::FRAME_OBJECT_TYPE.bytes();
    (core::ptr::addr_of!(_end) as usize).next_multiple_of(granule)
}

/// IPC Buffer
///
/// sdio 任务只有一个线程，只在入口处取一次。
pub fn ipc_buffer() -> &'static mut sel4::IpcBuffer {
    // SAFETY: 加载器在程序结尾之后映射了一个页作为 IPC Buffer
    unsafe { &mut *(ipc_buffer_addr() as *mut sel4::IpcBuffer) }
}
