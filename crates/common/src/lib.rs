//! common
//!
//! sdio 任务访问 supervisor 的客户端：任务查询、DMA 共享内存登记、
//! 经由 supervisor 转发的同步 IPC、睡眠等。
//!
//! supervisor 是本任务的父任务，所有请求都通过 [consts::DEFAULT_PARENT_EP]
//! 发送，回复消息的 label 是 [sdio_proto::SysStatus]。
#![no_std]

pub mod consts;
pub mod ipcrw;
pub mod root;
