//! 块设备
//!
//! `sector` 都以 [config::SECTOR_SIZE] 字节为单位，缓冲区长度是扇区大小的整数倍。

use config::SECTOR_SIZE;

use crate::error::BlockError;

pub trait BlockDevice {
    /// 探测设备，在握手开始之前调用
    fn early_init(&mut self) -> Result<(), BlockError>;

    /// 初始化设备，在 crypto 准备好之后调用
    fn init(&mut self) -> Result<(), BlockError>;

    /// 从 `sector` 开始读取 `buf.len()` 字节
    fn read(&mut self, buf: &mut [u8], sector: u32) -> Result<(), BlockError>;

    /// 把 `buf` 写到 `sector` 开始的位置
    fn write(&mut self, buf: &[u8], sector: u32) -> Result<(), BlockError>;
}

impl<B: BlockDevice + ?Sized> BlockDevice for &mut B {
    fn early_init(&mut self) -> Result<(), BlockError> {
        (**self).early_init()
    }

    fn init(&mut self) -> Result<(), BlockError> {
        (**self).init()
    }

    fn read(&mut self, buf: &mut [u8], sector: u32) -> Result<(), BlockError> {
        (**self).read(buf, sector)
    }

    fn write(&mut self, buf: &[u8], sector: u32) -> Result<(), BlockError> {
        (**self).write(buf, sector)
    }
}

/// 内存里的块设备
pub struct RamDisk<'a> {
    disk: &'a mut [u8],
    ready: bool,
}

impl<'a> RamDisk<'a> {
    pub fn new(disk: &'a mut [u8]) -> Self {
        Self { disk, ready: false }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &*self.disk
    }

    fn range(&self, sector: u32, len: usize) -> Result<core::ops::Range<usize>, BlockError> {
        if !self.ready {
            return Err(BlockError::NotReady);
        }
        let start = (sector as usize)
            .checked_mul(SECTOR_SIZE)
            .ok_or(BlockError::OutOfRange)?;
        let end = start.checked_add(len).ok_or(BlockError::OutOfRange)?;
        if end > self.disk.len() {
            return Err(BlockError::OutOfRange);
        }
        Ok(start..end)
    }
}

impl BlockDevice for RamDisk<'_> {
    fn early_init(&mut self) -> Result<(), BlockError> {
        Ok(())
    }

    fn init(&mut self) -> Result<(), BlockError> {
        self.ready = true;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], sector: u32) -> Result<(), BlockError> {
        let range = self.range(sector, buf.len())?;
        buf.copy_from_slice(&self.disk[range]);
        Ok(())
    }

    fn write(&mut self, buf: &[u8], sector: u32) -> Result<(), BlockError> {
        let range = self.range(sector, buf.len())?;
        self.disk[range].copy_from_slice(buf);
        Ok(())
    }
}
