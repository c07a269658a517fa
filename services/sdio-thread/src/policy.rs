//! 运行时策略
//!
//! 遗留实现遇到致命错误时只打印日志然后继续执行，收到不认识的消息时直接忽略。
//! [SdioConfig::legacy] 保持这种行为，[SdioConfig::hardened] 则在错误处停止。

use crate::retry::RetryLimit;

/// 致命错误之后的处理方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// 记录日志后继续执行
    Continue,
    /// 立即返回错误
    Stop,
}

/// 收到不符合预期的消息时的处理方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strictness {
    /// 记录日志后忽略
    Lenient,
    /// 当作错误处理
    Strict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SdioConfig {
    /// crypto 任务的名字
    pub peer_name: &'static str,
    pub on_fatal: ErrorPolicy,
    pub strictness: Strictness,
    /// 握手消息的重发上限
    pub sync_retry: RetryLimit,
    /// 数据面回应的重发上限
    pub ack_retry: RetryLimit,
    /// 握手结束前的等待时间（毫秒）
    pub quiesce_ms: u32,
}

impl SdioConfig {
    /// 与遗留实现一致的行为
    pub const fn legacy() -> Self {
        Self {
            peer_name: config::CRYPTO_TASK_NAME,
            on_fatal: ErrorPolicy::Continue,
            strictness: Strictness::Lenient,
            sync_retry: RetryLimit::Unbounded,
            ack_retry: RetryLimit::ONCE,
            quiesce_ms: config::QUIESCE_MS,
        }
    }

    /// 出错即停，严格检查消息，回应也在繁忙时重发
    pub const fn hardened() -> Self {
        Self {
            on_fatal: ErrorPolicy::Stop,
            strictness: Strictness::Strict,
            ack_retry: RetryLimit::Unbounded,
            ..Self::legacy()
        }
    }
}

impl Default for SdioConfig {
    fn default() -> Self {
        Self::legacy()
    }
}
