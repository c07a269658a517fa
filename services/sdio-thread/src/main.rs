#![no_std]
#![no_main]

extern crate alloc;

use config::{SDIO_BUF_SIZE, SDIO_TASK_NAME, VIRTIO_MMIO_BLK_VIRT_ADDR};
use sdio_proto::TaskId;
use sdio_thread::{CancelToken, Dispatcher, Handshake, SdioConfig, SharedBuffer, ShmRegion, TaskDirectory};

use blk::VirtioBlk;
use kernel::Supervisor;

mod blk;
mod kernel;
mod virtio;

/// 与 crypto 共享的 DMA 缓冲区
static SDIO_BUF: SharedBuffer<SDIO_BUF_SIZE> = SharedBuffer::new();

/// 没有人会取消数据面循环
static NEVER: CancelToken = CancelToken::new();

sel4_runtime::entry_point!(main, sel4_runtime::LevelFilter::Info);

fn main() -> ! {
    let config = SdioConfig::default();
    let mut kernel = Supervisor;
    let self_id = kernel.task_id(SDIO_TASK_NAME).unwrap_or_else(|err| {
        log::error!("can't resolve own task id: {err}");
        TaskId::INVALID
    });
    log::info!("hello, I'm sdio, my id is {self_id}");

    let mem = SDIO_BUF.take().expect("sdio buffer taken twice");
    let paddr = common::root::translate_addr(mem.as_ptr() as usize);
    let shm = ShmRegion::new(mem, paddr);
    if let Some(vaddr) = shm.first_discontiguous_page(common::root::translate_addr) {
        log::error!("sdio buffer is not physically contiguous at {vaddr:#x}");
    }
    let mut storage = VirtioBlk::new(VIRTIO_MMIO_BLK_VIRT_ADDR);

    let session = match Handshake::new(&mut kernel, &mut storage, config, self_id).run(&shm) {
        Ok(session) => session,
        Err(err) => {
            log::error!("{err}");
            common::root::shutdown()
        }
    };
    if !session.degraded.is_empty() {
        log::warn!("continuing with failed steps: {:?}", session.degraded);
    }

    let mut dispatcher = Dispatcher::new(&mut kernel, &mut storage, shm, session.peer, config);
    if let Err(err) = dispatcher.run(&NEVER) {
        log::error!("dataplane stopped: {err}");
    }
    common::root::shutdown()
}
