//! sdio-thread 配置 crate
//!
//! 这个 crate 中包含了存储任务在编译期确定的配置，需要在多个 crate 中共享。
#![no_std]
#![deny(missing_docs)]
#![deny(warnings)]

/// 服务任务在启动的时候使用的栈的地址。
pub const SERVICE_BOOT_STACK_TOP: usize = 0x1_0000_0000;

/// 服务任务默认的堆大小，只用于 panic 信息和 DMA 地址表
pub const SERVICE_HEAP_SIZE: usize = 0x4_0000;

/// 与 crypto 任务共享的 DMA 缓冲区大小
pub const SDIO_BUF_SIZE: usize = 8192;

/// 存储设备的扇区大小
pub const SECTOR_SIZE: usize = 512;

/// crypto 任务在 supervisor 中登记的名字
pub const CRYPTO_TASK_NAME: &str = "crypto";

/// 本任务在 supervisor 中登记的名字
pub const SDIO_TASK_NAME: &str = "sdio";

/// 握手结束之后，等待同步消息全部落地的时间（毫秒）
pub const QUIESCE_MS: u32 = 2000;

/// 将要被映射的偏移地址，设备虚拟地址 = VIRT_ADDR + 设备物理地址
pub const VIRTIO_MMIO_VIRT_ADDR: usize = 0x1_2000_0000;

const VIRTIO_BLK_OFFSET: usize = 0x3e00;

/// VIRTIO 块设备使用的虚拟地址
pub const VIRTIO_MMIO_BLK_VIRT_ADDR: usize = VIRTIO_MMIO_VIRT_ADDR + VIRTIO_BLK_OFFSET;

/// 默认的 DMA 分配开始的地址
pub const DMA_ADDR_START: usize = 0x1_0000_3000;

/// 默认的物理页大小
pub const PAGE_SIZE: usize = 0x1000;

/// supervisor 的 Endpoint 所在的 slot
pub const DEFAULT_PARENT_EP: u64 = 18;
