//! 内核设施
//!
//! sdio 任务依赖的四类内核能力：任务查询、DMA 共享内存登记、同步 IPC 和睡眠。
//! 在 seL4 上由 supervisor 代理实现，测试中由假的内核实现。

use sdio_proto::{SleepMode, SysError, TaskId};

use crate::shm::DmaShmDescriptor;

/// 通过名字查询任务编号
pub trait TaskDirectory {
    fn task_id(&mut self, name: &str) -> Result<TaskId, SysError>;
}

/// 登记 DMA 共享内存
pub trait DmaRegistrar {
    fn register_dma_shm(&mut self, desc: &DmaShmDescriptor) -> Result<(), SysError>;

    /// 声明当前任务的初始化阶段已经结束
    fn init_done(&mut self) -> Result<(), SysError>;
}

/// 一次接收的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Received {
    pub sender: TaskId,
    pub len: usize,
}

/// 同步消息通道
pub trait Channel {
    /// 发送消息，[SysError::Busy] 表示通道暂时繁忙，可以原样重发
    fn send(&mut self, to: TaskId, payload: &[u8]) -> Result<(), SysError>;

    /// 阻塞接收一个消息到 `buf`
    ///
    /// `from` 只是期望的发送者，返回的 [Received::sender] 才是真正的发送者。
    fn recv(&mut self, from: TaskId, buf: &mut [u8]) -> Result<Received, SysError>;
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn send(&mut self, to: TaskId, payload: &[u8]) -> Result<(), SysError> {
        (**self).send(to, payload)
    }

    fn recv(&mut self, from: TaskId, buf: &mut [u8]) -> Result<Received, SysError> {
        (**self).recv(from, buf)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleepOutcome {
    Elapsed,
    /// 被外部事件提前唤醒
    Interrupted,
}

pub trait Sleeper {
    fn sleep(&mut self, ms: u32, mode: SleepMode) -> Result<SleepOutcome, SysError>;
}

/// 握手过程需要的全部内核设施
pub trait Kernel: TaskDirectory + DmaRegistrar + Channel + Sleeper {}

impl<T: TaskDirectory + DmaRegistrar + Channel + Sleeper> Kernel for T {}
