//! 繁忙重发
//!
//! supervisor 在通道繁忙时返回 [SysError::Busy]，发送方需要原样重发，
//! 直到消息被接受或者遇到其他错误。

use sdio_proto::{SysError, TaskId};

use crate::sys::Channel;

/// 重发次数的上限，不包括第一次发送
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryLimit {
    Unbounded,
    Attempts(u32),
}

impl RetryLimit {
    /// 只发送一次
    pub const ONCE: Self = Self::Attempts(0);

    #[inline]
    fn allows(self, retries: u32) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Attempts(max) => retries < max,
        }
    }
}

/// 最后一次尝试的结果和重发次数
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub retries: u32,
}

/// 反复执行 `op`，直到 `is_busy` 不成立或者超过 `limit`
pub fn retry_while<T>(
    limit: RetryLimit,
    is_busy: impl Fn(&T) -> bool,
    mut op: impl FnMut() -> T,
) -> Retried<T> {
    let mut retries = 0u32;
    loop {
        let value = op();
        if !is_busy(&value) || !limit.allows(retries) {
            return Retried { value, retries };
        }
        retries = retries.saturating_add(1);
        core::hint::spin_loop();
    }
}

/// 发送 `payload`，繁忙时按 `limit` 重发，成功时返回重发次数
pub fn send_retrying<C: Channel + ?Sized>(
    channel: &mut C,
    to: TaskId,
    payload: &[u8],
    limit: RetryLimit,
) -> Result<u32, SysError> {
    let Retried { value, retries } = retry_while(
        limit,
        |res: &Result<(), SysError>| matches!(res, Err(SysError::Busy)),
        || channel.send(to, payload),
    );
    if retries > 0 {
        log::debug!("send to {to} retried {retries} times");
    }
    value.map(|()| retries)
}
