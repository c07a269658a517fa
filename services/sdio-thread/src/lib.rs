//! sdio 存储任务
//!
//! 与 crypto 任务握手，登记两者共享的 DMA 缓冲区，然后在数据面循环中
//! 把 crypto 发来的读写请求转换成块设备操作。
//!
//! 内核设施 ([sys]) 和块设备 ([storage]) 都以 trait 的形式注入，
//! seL4 上的实现在 `sdio-thread` 可执行文件里。
#![cfg_attr(not(test), no_std)]

pub mod dataplane;
pub mod error;
pub mod handshake;
pub mod policy;
pub mod retry;
pub mod shm;
pub mod storage;
pub mod sys;

pub use dataplane::{CancelToken, Dispatch, Dispatcher, DropReason};
pub use error::{BlockError, DispatchError, HandshakeError, HandshakeErrorKind};
pub use handshake::{Handshake, Session, Step, Steps};
pub use policy::{ErrorPolicy, SdioConfig, Strictness};
pub use retry::RetryLimit;
pub use sdio_proto as proto;
pub use shm::{DmaShmDescriptor, SharedBuffer, ShmRegion};
pub use storage::{BlockDevice, RamDisk};
pub use sys::{Channel, DmaRegistrar, Kernel, Received, SleepOutcome, Sleeper, TaskDirectory};
