use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, byteorder::little_endian::U32,
};

use crate::Magic;

/// 数据面的读写命令和回应，12 字节
///
/// 真正的数据放在共享缓冲区中，这里只描述扇区地址和扇区数量。
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct DataplaneCommand {
    magic: u8,
    reserved: [u8; 3],
    sector_address: U32,
    num_sectors: U32,
}

impl DataplaneCommand {
    /// 线上长度
    pub const SIZE: usize = size_of::<Self>();

    /// 创建一个数据面命令
    pub fn new(magic: Magic, sector_address: u32, num_sectors: u32) -> Self {
        Self {
            magic: magic.into(),
            reserved: [0; 3],
            sector_address: U32::new(sector_address),
            num_sectors: U32::new(num_sectors),
        }
    }

    /// 从收到的字节中解析，长度不足时返回 `None`
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        Self::read_from_prefix(bytes).ok().map(|(cmd, _)| cmd)
    }

    /// 命令的 magic
    pub fn magic(&self) -> Magic {
        Magic::from(self.magic)
    }

    /// 覆盖 magic，回应消息在整个生命周期中复用
    pub fn set_magic(&mut self, magic: Magic) {
        self.magic = magic.into();
    }

    /// 起始扇区
    pub fn sector_address(&self) -> u32 {
        self.sector_address.get()
    }

    /// 扇区数量
    pub fn num_sectors(&self) -> u32 {
        self.num_sectors.get()
    }

    /// 命令覆盖的字节数，溢出时返回 `None`
    pub fn byte_len(&self, sector_size: usize) -> Option<usize> {
        usize::try_from(self.num_sectors())
            .ok()?
            .checked_mul(sector_size)
    }
}
