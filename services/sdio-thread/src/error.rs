use sdio_proto::{SysError, TaskId};
use thiserror::Error;

use crate::{dataplane::DropReason, handshake::Step};

/// 块设备返回的错误
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("device not ready")]
    NotReady,
    #[error("i/o error")]
    Io,
    #[error("request beyond device capacity")]
    OutOfRange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum HandshakeErrorKind {
    #[error("kernel: {0}")]
    Sys(#[from] SysError),
    #[error("storage: {0}")]
    Storage(#[from] BlockError),
    #[error("unexpected sync message (magic {magic:#x}, state {state:#x})")]
    ProtocolMismatch { magic: u8, state: u8 },
    #[error("sync message from foreign task {0}")]
    ForeignSender(TaskId),
    #[error("short sync message ({0} bytes)")]
    Truncated(usize),
    #[error("shared buffer does not fit the geometry message")]
    GeometryOverflow,
}

/// 握手失败，只有在 [crate::ErrorPolicy::Stop] 下才会返回
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("handshake failed at {step}: {kind}")]
pub struct HandshakeError {
    pub step: Step,
    pub kind: HandshakeErrorKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("storage backend failed: {0}")]
    Storage(#[from] BlockError),
    #[error("acknowledgement not delivered: {0}")]
    Send(#[from] SysError),
    #[error("command rejected: {0}")]
    Rejected(DropReason),
}
