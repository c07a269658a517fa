//! 与 crypto 任务的握手
//!
//! 步骤依次执行：
//!
//! 1. 探测存储设备
//! 2. 查询 crypto 的任务编号
//! 3. 分别以读、写方向登记共享缓冲区，然后声明初始化结束
//! 4. 发送 `(TaskStateCmd, Ready)`，等待 `(TaskStateResp, Acknowledge)`
//! 5. 等待 `(TaskStateCmd, Ready)`，初始化存储设备，回复 `(TaskStateResp, Ready)`
//! 6. 等待一段时间，然后把共享缓冲区的地址和大小发给 crypto
//!
//! 某一步失败之后怎么办由 [SdioConfig::on_fatal] 决定。

use core::fmt;

use bitflags::bitflags;
use sdio_proto::{DmaShmInfo, Magic, SleepMode, SyncCommand, SyncState, TaskId};
use zerocopy::IntoBytes;

use crate::{
    error::{HandshakeError, HandshakeErrorKind},
    policy::{ErrorPolicy, SdioConfig, Strictness},
    retry,
    shm::ShmRegion,
    storage::BlockDevice,
    sys::{Kernel, Received, SleepOutcome},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    EarlyInit,
    ResolvePeer,
    RegisterShm,
    InitDone,
    SignalReady,
    AwaitAck,
    AwaitPeerReady,
    InitStorage,
    AckPeer,
    Quiesce,
    PublishGeometry,
}

bitflags! {
    /// 步骤的集合，用来记录哪些步骤失败后被跳过
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Steps: u16 {
        const EARLY_INIT = 1 << 0;
        const RESOLVE_PEER = 1 << 1;
        const REGISTER_SHM = 1 << 2;
        const INIT_DONE = 1 << 3;
        const SIGNAL_READY = 1 << 4;
        const AWAIT_ACK = 1 << 5;
        const AWAIT_PEER_READY = 1 << 6;
        const INIT_STORAGE = 1 << 7;
        const ACK_PEER = 1 << 8;
        const QUIESCE = 1 << 9;
        const PUBLISH_GEOMETRY = 1 << 10;
    }
}

impl Step {
    pub const fn flag(self) -> Steps {
        match self {
            Self::EarlyInit => Steps::EARLY_INIT,
            Self::ResolvePeer => Steps::RESOLVE_PEER,
            Self::RegisterShm => Steps::REGISTER_SHM,
            Self::InitDone => Steps::INIT_DONE,
            Self::SignalReady => Steps::SIGNAL_READY,
            Self::AwaitAck => Steps::AWAIT_ACK,
            Self::AwaitPeerReady => Steps::AWAIT_PEER_READY,
            Self::InitStorage => Steps::INIT_STORAGE,
            Self::AckPeer => Steps::ACK_PEER,
            Self::Quiesce => Steps::QUIESCE,
            Self::PublishGeometry => Steps::PUBLISH_GEOMETRY,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EarlyInit => "storage probe",
            Self::ResolvePeer => "peer lookup",
            Self::RegisterShm => "shm registration",
            Self::InitDone => "init done",
            Self::SignalReady => "ready signal",
            Self::AwaitAck => "ready acknowledgement",
            Self::AwaitPeerReady => "peer ready",
            Self::InitStorage => "storage init",
            Self::AckPeer => "peer acknowledgement",
            Self::Quiesce => "quiesce",
            Self::PublishGeometry => "shm geometry",
        })
    }
}

/// 握手的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
    /// crypto 的任务编号，查询失败时是 [TaskId::INVALID]
    pub peer: TaskId,
    /// 发给 crypto 的共享缓冲区信息
    pub geometry: Option<DmaShmInfo>,
    /// 失败后被跳过的步骤
    pub degraded: Steps,
}

pub struct Handshake<'a, K, B> {
    kernel: &'a mut K,
    storage: &'a mut B,
    config: SdioConfig,
    self_id: TaskId,
    degraded: Steps,
}

impl<'a, K: Kernel, B: BlockDevice> Handshake<'a, K, B> {
    pub fn new(kernel: &'a mut K, storage: &'a mut B, config: SdioConfig, self_id: TaskId) -> Self {
        Self {
            kernel,
            storage,
            config,
            self_id,
            degraded: Steps::empty(),
        }
    }

    pub fn run(mut self, shm: &ShmRegion<'_>) -> Result<Session, HandshakeError> {
        let res = self.storage.early_init().map_err(Into::into);
        self.settle(Step::EarlyInit, res)?;

        let res = self.kernel.task_id(self.config.peer_name).map_err(Into::into);
        let peer = self
            .settle(Step::ResolvePeer, res)?
            .unwrap_or(TaskId::INVALID);
        log::info!("{} is task {peer}", self.config.peer_name);

        for desc in shm.descriptors(peer, self.self_id) {
            log::info!(
                "declaring DMA shm for {:?} flow ({:#x}, {:#x} bytes)",
                desc.mode,
                desc.paddr,
                desc.size
            );
            let res = self.kernel.register_dma_shm(&desc).map_err(Into::into);
            self.settle(Step::RegisterShm, res)?;
        }

        let res = self.kernel.init_done().map_err(Into::into);
        self.settle(Step::InitDone, res)?;

        log::info!("sending end of init synchronization to {peer}");
        let res = self.send_sync(peer, SyncCommand::new(Magic::TaskStateCmd, SyncState::Ready));
        self.settle(Step::SignalReady, res)?;

        let res = self.await_sync(peer, Magic::TaskStateResp, SyncState::Acknowledge);
        if self.settle(Step::AwaitAck, res)? == Some(true) {
            log::info!("{peer} has acknowledged end of init");
        }

        let res = self.await_sync(peer, Magic::TaskStateCmd, SyncState::Ready);
        if self.settle(Step::AwaitPeerReady, res)? == Some(true) {
            log::info!("{peer} is ready");
        }

        let res = self.storage.init().map_err(Into::into);
        self.settle(Step::InitStorage, res)?;

        let res = self.send_sync(peer, SyncCommand::new(Magic::TaskStateResp, SyncState::Ready));
        self.settle(Step::AckPeer, res)?;

        let res = self.quiesce();
        self.settle(Step::Quiesce, res)?;

        log::info!("informing {peer} about DMA shm");
        let res = self.publish_geometry(peer, shm);
        let geometry = self.settle(Step::PublishGeometry, res)?;
        if geometry.is_some() {
            log::info!("{peer} informed");
        }

        Ok(Session {
            peer,
            geometry,
            degraded: self.degraded,
        })
    }

    /// 按策略处理一个步骤的结果
    fn settle<T>(
        &mut self,
        step: Step,
        res: Result<T, HandshakeErrorKind>,
    ) -> Result<Option<T>, HandshakeError> {
        match res {
            Ok(value) => Ok(Some(value)),
            Err(kind) => {
                log::error!("{step} failed: {kind}");
                match self.config.on_fatal {
                    ErrorPolicy::Stop => Err(HandshakeError { step, kind }),
                    ErrorPolicy::Continue => {
                        self.degraded |= step.flag();
                        Ok(None)
                    }
                }
            }
        }
    }

    fn send_sync(&mut self, peer: TaskId, cmd: SyncCommand) -> Result<(), HandshakeErrorKind> {
        retry::send_retrying(&mut *self.kernel, peer, cmd.as_bytes(), self.config.sync_retry)?;
        Ok(())
    }

    /// 接收一个握手消息，返回它是否是期望的组合
    ///
    /// 宽松模式下不符合预期的消息只打印警告并返回 `false`，握手照常进行。
    fn await_sync(
        &mut self,
        peer: TaskId,
        magic: Magic,
        state: SyncState,
    ) -> Result<bool, HandshakeErrorKind> {
        let mut buf = [0u8; SyncCommand::SIZE];
        let Received { sender, len } = self.kernel.recv(peer, &mut buf)?;
        let mismatch = if sender != peer {
            Some(HandshakeErrorKind::ForeignSender(sender))
        } else {
            match SyncCommand::decode(&buf[..len.min(buf.len())]) {
                None => Some(HandshakeErrorKind::Truncated(len)),
                Some(cmd) if cmd.is(magic, state) => None,
                Some(cmd) => Some(HandshakeErrorKind::ProtocolMismatch {
                    magic: cmd.magic().into(),
                    state: cmd.state().into(),
                }),
            }
        };

        match (mismatch, self.config.strictness) {
            (None, _) => Ok(true),
            (Some(kind), Strictness::Strict) => Err(kind),
            (Some(kind), Strictness::Lenient) => {
                log::warn!("waiting for {magic:?}/{state:?}, ignoring {kind}");
                Ok(false)
            }
        }
    }

    fn quiesce(&mut self) -> Result<(), HandshakeErrorKind> {
        match self
            .kernel
            .sleep(self.config.quiesce_ms, SleepMode::Interruptible)?
        {
            SleepOutcome::Elapsed => log::debug!("quiesced for {}ms", self.config.quiesce_ms),
            SleepOutcome::Interrupted => log::debug!("quiesce interrupted"),
        }
        Ok(())
    }

    fn publish_geometry(
        &mut self,
        peer: TaskId,
        shm: &ShmRegion<'_>,
    ) -> Result<DmaShmInfo, HandshakeErrorKind> {
        let info = shm.geometry().ok_or(HandshakeErrorKind::GeometryOverflow)?;
        retry::send_retrying(&mut *self.kernel, peer, info.as_bytes(), self.config.sync_retry)?;
        Ok(info)
    }
}
