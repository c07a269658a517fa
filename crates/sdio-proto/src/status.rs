use num_enum::{FromPrimitive, IntoPrimitive};

/// supervisor 回复消息的 label
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u64)]
pub enum SysStatus {
    /// 执行成功
    Done = 0,
    /// 参数错误
    Inval = 1,
    /// 没有权限
    Denied = 2,
    /// 通道暂时繁忙，需要重试
    Busy = 3,
    /// 其他错误码
    #[num_enum(catch_all)]
    Unknown(u64),
}

impl SysStatus {
    /// 转换为 [Result]
    pub fn into_result(self) -> Result<(), SysError> {
        match self {
            SysStatus::Done => Ok(()),
            SysStatus::Inval => Err(SysError::Inval),
            SysStatus::Denied => Err(SysError::Denied),
            SysStatus::Busy => Err(SysError::Busy),
            SysStatus::Unknown(code) => Err(SysError::Unknown(code)),
        }
    }
}

/// 内核设施返回的错误
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SysError {
    /// 参数错误
    #[error("invalid argument")]
    Inval,
    /// 没有权限
    #[error("permission denied")]
    Denied,
    /// 通道暂时繁忙
    #[error("channel busy")]
    Busy,
    /// 其他错误码
    #[error("unknown status {0:#x}")]
    Unknown(u64),
}

/// 授予对端的 DMA 访问方向
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive)]
#[repr(u64)]
pub enum ShmAccess {
    /// 对端 DMA 从缓冲区读取
    Read = 0,
    /// 对端 DMA 写入缓冲区
    Write = 1,
}

/// 睡眠的方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive)]
#[repr(u64)]
pub enum SleepMode {
    /// 可以被外部事件提前唤醒
    Interruptible = 0,
    /// 一直睡到时间结束
    Deep = 1,
}
