//! 数据面
//!
//! 握手结束后 crypto 只会发送读写请求。写请求把共享缓冲区写到存储设备，
//! 读请求把存储设备的数据读到共享缓冲区，完成后各回一个 ack。
//! 不符合要求的消息直接丢弃，不回复。

use core::sync::atomic::{AtomicBool, Ordering};

use config::SECTOR_SIZE;
use sdio_proto::{DataplaneCommand, Magic, SysError, TaskId};
use thiserror::Error;
use zerocopy::IntoBytes;

use crate::{
    error::{BlockError, DispatchError},
    policy::{ErrorPolicy, SdioConfig, Strictness},
    retry,
    shm::ShmRegion,
    storage::BlockDevice,
    sys::Channel,
};

/// 预览缓冲区时打印的字节数
const PREVIEW_LEN: usize = 16;

/// 请求退出数据面循环
///
/// 循环只在两次接收之间检查它。
#[derive(Debug, Default)]
pub struct CancelToken(AtomicBool);

impl CancelToken {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 消息被丢弃的原因
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("receive failed: {0}")]
    Recv(SysError),
    #[error("message from foreign task {0}")]
    ForeignSender(TaskId),
    #[error("short command ({0} bytes)")]
    Truncated(usize),
    #[error("unexpected magic {0:#x}")]
    UnknownMagic(u8),
    #[error("{num_sectors} sectors do not fit a {capacity} byte buffer")]
    Oversized { num_sectors: u32, capacity: usize },
}

/// 一次 [Dispatcher::poll] 的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Written { sector: u32, len: usize },
    Read { sector: u32, len: usize },
    Dropped(DropReason),
}

pub struct Dispatcher<'a, C, B> {
    channel: C,
    storage: B,
    shm: ShmRegion<'a>,
    peer: TaskId,
    config: SdioConfig,
    /// 回复用的消息，只有 magic 会变
    ack: DataplaneCommand,
}

impl<'a, C: Channel, B: BlockDevice> Dispatcher<'a, C, B> {
    pub fn new(channel: C, storage: B, shm: ShmRegion<'a>, peer: TaskId, config: SdioConfig) -> Self {
        Self {
            channel,
            storage,
            shm,
            peer,
            config,
            ack: DataplaneCommand::new(Magic::DataWrDmaAck, 0, 0),
        }
    }

    /// 处理直到 `cancel` 被触发
    ///
    /// 严格模式下丢弃消息会结束循环；[ErrorPolicy::Stop] 下存储或回复失败会结束循环。
    pub fn run(&mut self, cancel: &CancelToken) -> Result<(), DispatchError> {
        log::info!("dataplane loop starting, peer {}", self.peer);
        while !cancel.is_cancelled() {
            match self.poll() {
                Ok(Dispatch::Dropped(reason)) if self.config.strictness == Strictness::Strict => {
                    return Err(DispatchError::Rejected(reason));
                }
                Ok(_) => {}
                Err(err) => match self.config.on_fatal {
                    ErrorPolicy::Stop => return Err(err),
                    ErrorPolicy::Continue => log::error!("{err}"),
                },
            }
        }
        log::info!("dataplane loop cancelled");
        Ok(())
    }

    /// 接收并处理一个请求
    pub fn poll(&mut self) -> Result<Dispatch, DispatchError> {
        let mut buf = [0u8; DataplaneCommand::SIZE];
        let received = match self.channel.recv(self.peer, &mut buf) {
            Ok(received) => received,
            Err(err) => return Ok(self.dropped(DropReason::Recv(err))),
        };
        if received.sender != self.peer {
            return Ok(self.dropped(DropReason::ForeignSender(received.sender)));
        }
        let Some(cmd) = DataplaneCommand::decode(&buf[..received.len.min(buf.len())]) else {
            return Ok(self.dropped(DropReason::Truncated(received.len)));
        };

        match cmd.magic() {
            Magic::DataWrDmaReq => self.write(&cmd),
            Magic::DataRdDmaReq => self.read(&cmd),
            other => Ok(self.dropped(DropReason::UnknownMagic(other.into()))),
        }
    }

    fn write(&mut self, cmd: &DataplaneCommand) -> Result<Dispatch, DispatchError> {
        let data = match cmd.byte_len(SECTOR_SIZE).and_then(|len| self.shm.span(len)) {
            Some(data) => data,
            None => return Ok(self.dropped(self.oversized(cmd))),
        };
        let (sector, len) = (cmd.sector_address(), data.len());
        log::debug!(
            "DMA write: @{sector:#x} sectors: {}",
            cmd.num_sectors()
        );

        log::trace!("shm head: {:02x?}", &data[..len.min(PREVIEW_LEN)]);
        let res = self.storage.write(data, sector);
        self.complete(res, Magic::DataWrDmaAck)?;
        Ok(Dispatch::Written { sector, len })
    }

    fn read(&mut self, cmd: &DataplaneCommand) -> Result<Dispatch, DispatchError> {
        let data = match cmd.byte_len(SECTOR_SIZE).and_then(|len| self.shm.span_mut(len)) {
            Some(data) => data,
            None => return Ok(self.dropped(self.oversized(cmd))),
        };
        let (sector, len) = (cmd.sector_address(), data.len());
        log::debug!(
            "DMA read: @{sector:#x} sectors: {}",
            cmd.num_sectors()
        );

        let res = self.storage.read(data, sector);
        log::trace!("shm head: {:02x?}", &data[..len.min(PREVIEW_LEN)]);
        self.complete(res, Magic::DataRdDmaAck)?;
        Ok(Dispatch::Read { sector, len })
    }

    fn oversized(&self, cmd: &DataplaneCommand) -> DropReason {
        DropReason::Oversized {
            num_sectors: cmd.num_sectors(),
            capacity: self.shm.len(),
        }
    }

    /// 存储操作结束后回复 ack
    ///
    /// [ErrorPolicy::Continue] 下即使存储失败也照常回复。
    fn complete(&mut self, res: Result<(), BlockError>, ack: Magic) -> Result<(), DispatchError> {
        if let Err(err) = res {
            log::error!("storage backend failed: {err}");
            if self.config.on_fatal == ErrorPolicy::Stop {
                return Err(err.into());
            }
        }
        self.ack.set_magic(ack);
        retry::send_retrying(
            &mut self.channel,
            self.peer,
            self.ack.as_bytes(),
            self.config.ack_retry,
        )?;
        Ok(())
    }

    fn dropped(&self, reason: DropReason) -> Dispatch {
        match reason {
            DropReason::Recv(_) => log::debug!("dropping command: {reason}"),
            _ => log::warn!("dropping command: {reason}"),
        }
        Dispatch::Dropped(reason)
    }
}
