//! virtio-blk 存储后端
//!
//! 没有向 supervisor 申请中断，读写都用阻塞的轮询接口。

use core::ptr::NonNull;

use sdio_thread::{BlockDevice, BlockError};
use virtio_drivers::{
    Error as VirtIoError,
    device::blk::VirtIOBlk,
    transport::mmio::{MmioTransport, VirtIOHeader},
};

use crate::virtio::HalImpl;

pub struct VirtioBlk {
    addr: usize,
    transport: Option<MmioTransport>,
    device: Option<VirtIOBlk<HalImpl, MmioTransport>>,
}

impl VirtioBlk {
    pub const fn new(addr: usize) -> Self {
        Self {
            addr,
            transport: None,
            device: None,
        }
    }

    fn device(&mut self) -> Result<&mut VirtIOBlk<HalImpl, MmioTransport>, BlockError> {
        self.device.as_mut().ok_or(BlockError::NotReady)
    }
}

fn block_error(err: VirtIoError) -> BlockError {
    log::debug!("virtio-blk: {err:?}");
    match err {
        VirtIoError::InvalidParam => BlockError::OutOfRange,
        VirtIoError::NotReady => BlockError::NotReady,
        _ => BlockError::Io,
    }
}

impl BlockDevice for VirtioBlk {
    /// 检查 MMIO 区域上是否有 virtio 设备
    fn early_init(&mut self) -> Result<(), BlockError> {
        let header = NonNull::new(self.addr as *mut VirtIOHeader).ok_or(BlockError::NotReady)?;
        // SAFETY: supervisor 已经把设备的 MMIO 区域映射到了这个地址
        let transport = unsafe { MmioTransport::new(header) }.map_err(|err| {
            log::error!("no virtio device at {:#x}: {err:?}", self.addr);
            BlockError::NotReady
        })?;
        self.transport = Some(transport);
        Ok(())
    }

    fn init(&mut self) -> Result<(), BlockError> {
        let transport = self.transport.take().ok_or(BlockError::NotReady)?;
        let device = VirtIOBlk::<HalImpl, MmioTransport>::new(transport).map_err(block_error)?;
        log::debug!("block device capacity: {:#x} sectors", device.capacity());
        self.device = Some(device);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], sector: u32) -> Result<(), BlockError> {
        self.device()?
            .read_blocks(sector as usize, buf)
            .map_err(block_error)
    }

    fn write(&mut self, buf: &[u8], sector: u32) -> Result<(), BlockError> {
        self.device()?
            .write_blocks(sector as usize, buf)
            .map_err(block_error)
    }
}
