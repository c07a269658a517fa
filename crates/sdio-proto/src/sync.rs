use num_enum::{FromPrimitive, IntoPrimitive};
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::little_endian::{U16, U32},
};

use crate::Magic;

/// 握手过程中携带的任务状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum SyncState {
    /// 已经准备好
    Ready = 0,
    /// 忙
    Busy = 1,
    /// 等待
    Wait = 2,
    /// 请求数据
    AskForData = 3,
    /// 完成
    Done = 4,
    /// 确认
    Acknowledge = 5,
    /// 状态未知
    Unknown = 6,
    /// 失败
    Failure = 7,
    /// 协议之外的数值
    #[num_enum(catch_all)]
    Invalid(u8),
}

/// 握手消息，2 字节
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct SyncCommand {
    magic: u8,
    state: u8,
}

impl SyncCommand {
    /// 线上长度
    pub const SIZE: usize = size_of::<Self>();

    /// 创建一个握手消息
    pub fn new(magic: Magic, state: SyncState) -> Self {
        Self {
            magic: magic.into(),
            state: state.into(),
        }
    }

    /// 从收到的字节中解析，长度不足时返回 `None`
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        Self::read_from_prefix(bytes).ok().map(|(cmd, _)| cmd)
    }

    /// 消息的 magic
    pub fn magic(&self) -> Magic {
        Magic::from(self.magic)
    }

    /// 消息携带的状态
    pub fn state(&self) -> SyncState {
        SyncState::from(self.state)
    }

    /// 判断是否是期望的 (magic, state) 组合
    pub fn is(&self, magic: Magic, state: SyncState) -> bool {
        self.magic() == magic && self.state() == state
    }
}

/// 共享内存的地址和大小，握手最后一步发给 crypto 任务，8 字节
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct DmaShmInfo {
    addr: U32,
    size: U16,
    reserved: [u8; 2],
}

impl DmaShmInfo {
    /// 线上长度
    pub const SIZE: usize = size_of::<Self>();

    /// 创建共享内存描述
    pub fn new(addr: u32, size: u16) -> Self {
        Self {
            addr: U32::new(addr),
            size: U16::new(size),
            reserved: [0; 2],
        }
    }

    /// 共享内存的物理地址
    pub fn addr(&self) -> u32 {
        self.addr.get()
    }

    /// 共享内存的大小
    pub fn size(&self) -> u16 {
        self.size.get()
    }
}
