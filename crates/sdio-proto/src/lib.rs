//! sdio-proto
//!
//! sdio 任务与 crypto 任务、supervisor 之间使用的线上格式。
//!
//! 所有消息都是定长的二进制结构，字段按小端序排列，中间没有隐式填充。
//! 这是两端私有的协议，字段宽度必须和 crypto 任务保持一致：
//!
//! | 消息                 | 布局                                              | 字节 |
//! |----------------------|---------------------------------------------------|------|
//! | [SyncCommand]        | magic u8, state u8                                | 2    |
//! | [DmaShmInfo]         | addr u32, size u16, reserved [u8; 2]              | 8    |
//! | [DataplaneCommand]   | magic u8, reserved [u8; 3], sector u32, count u32 | 12   |
#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

mod dataplane;
mod status;
mod sync;

use core::fmt;

use num_enum::{FromPrimitive, IntoPrimitive};

pub use dataplane::DataplaneCommand;
pub use status::{ShmAccess, SleepMode, SysError, SysStatus};
pub use sync::{DmaShmInfo, SyncCommand, SyncState};

/// 任务编号，由 supervisor 通过名字查询得到
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(pub u8);

impl TaskId {
    /// 查询失败但仍然继续运行时使用的占位编号
    pub const INVALID: Self = Self(u8::MAX);

    /// 原始编号
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// 消息的第一个字节，标识消息的种类
///
/// 不认识的数值会落到 [Magic::Unknown]，由接收方决定丢弃与否。
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum Magic {
    /// 握手阶段的命令
    TaskStateCmd = 0x01,
    /// 握手阶段的回应
    TaskStateResp = 0x02,
    /// 写请求：把共享缓冲区写到存储设备
    DataWrDmaReq = 0x10,
    /// 写请求完成
    DataWrDmaAck = 0x11,
    /// 读请求：从存储设备读到共享缓冲区
    DataRdDmaReq = 0x12,
    /// 读请求完成
    DataRdDmaAck = 0x13,
    /// 未知的 magic
    #[num_enum(catch_all)]
    Unknown(u8),
}
