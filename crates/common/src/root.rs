use num_enum::{IntoPrimitive, TryFromPrimitive};
use sdio_proto::{ShmAccess, SleepMode, SysError, SysStatus, TaskId};
use sel4::{MessageInfo, MessageInfoBuilder, with_ipc_buffer, with_ipc_buffer_mut};

use crate::ipcrw::{IpcTypeReader, IpcTypeWriter, read_bytes_into};

#[derive(Debug, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum RootEvent {
    FindTask = 0x200,
    RegisterDmaShm,
    InitDone,
    IpcSend,
    IpcRecv,
    Sleep,
    TranslateAddr,
    Shutdown,
}

macro_rules! call_ep {
    ($msg:expr) => {
        $crate::consts::DEFAULT_PARENT_EP.call($msg)
    };
}

#[inline]
fn request(event: RootEvent, length: usize) -> MessageInfo {
    MessageInfoBuilder::default()
        .label(event.into())
        .length(length)
        .build()
}

#[inline]
fn status_of(msg: &MessageInfo) -> SysStatus {
    SysStatus::from(msg.label())
}

/// 通过名字查询任务编号
pub fn find_task(name: &str) -> Result<TaskId, SysError> {
    let wlen = &mut 0;
    with_ipc_buffer_mut(|ib| name.write_buffer(ib, wlen));

    let reply = call_ep!(request(RootEvent::FindTask, *wlen));
    status_of(&reply).into_result()?;
    Ok(TaskId(with_ipc_buffer(|ib| u8::read_buffer(ib, &mut 0))))
}

/// 登记一块可以被 `target` 通过 DMA 访问的共享内存
///
/// - `target`  被授权的任务
/// - `source`  内存的所有者，也就是当前任务
/// - `paddr`   共享内存的物理地址
/// - `size`    共享内存的大小
/// - `mode`    授权的访问方向
pub fn register_dma_shm(
    target: TaskId,
    source: TaskId,
    paddr: usize,
    size: usize,
    mode: ShmAccess,
) -> Result<(), SysError> {
    let wlen = &mut 0;
    with_ipc_buffer_mut(|ib| {
        target.raw().write_buffer(ib, wlen);
        source.raw().write_buffer(ib, wlen);
        paddr.write_buffer(ib, wlen);
        size.write_buffer(ib, wlen);
        u64::from(mode).write_buffer(ib, wlen);
    });

    let reply = call_ep!(request(RootEvent::RegisterDmaShm, *wlen));
    status_of(&reply).into_result()
}

/// 通知 supervisor 当前任务的初始化阶段已经结束
pub fn init_done() -> Result<(), SysError> {
    let reply = call_ep!(request(RootEvent::InitDone, 0));
    status_of(&reply).into_result()
}

/// 向 `to` 发送一个同步消息
///
/// 返回 [SysStatus::Busy] 时调用者需要重新发送
pub fn ipc_send(to: TaskId, payload: &[u8]) -> SysStatus {
    let wlen = &mut 0;
    with_ipc_buffer_mut(|ib| {
        to.raw().write_buffer(ib, wlen);
        payload.write_buffer(ib, wlen);
    });
    status_of(&call_ep!(request(RootEvent::IpcSend, *wlen)))
}

/// 阻塞接收一个同步消息，返回发送者和消息长度
///
/// `from` 是期望的发送者，supervisor 可能转发其他任务的消息，
/// 调用者需要自己检查返回的发送者。
pub fn ipc_recv(from: TaskId, buf: &mut [u8]) -> Result<(TaskId, usize), SysError> {
    let wlen = &mut 0;
    with_ipc_buffer_mut(|ib| from.raw().write_buffer(ib, wlen));

    let reply = call_ep!(request(RootEvent::IpcRecv, *wlen));
    status_of(&reply).into_result()?;
    Ok(with_ipc_buffer(|ib| {
        let off = &mut 0;
        let sender = u8::read_buffer(ib, off);
        let len = read_bytes_into(ib, off, buf);
        (TaskId(sender), len)
    }))
}

/// 睡眠 `ms` 毫秒，被提前唤醒时返回 `true`
pub fn sleep(ms: u32, mode: SleepMode) -> Result<bool, SysError> {
    let wlen = &mut 0;
    with_ipc_buffer_mut(|ib| {
        ms.write_buffer(ib, wlen);
        u64::from(mode).write_buffer(ib, wlen);
    });

    let reply = call_ep!(request(RootEvent::Sleep, *wlen));
    status_of(&reply).into_result()?;
    Ok(with_ipc_buffer(|ib| u64::read_buffer(ib, &mut 0)) != 0)
}

/// 查询虚拟地址对应的物理地址
pub fn translate_addr(vaddr: usize) -> usize {
    let addr = &mut (vaddr as u64);
    sel4::sys::seL4_CallWithMRsWithoutIPCBuffer(
        crate::consts::DEFAULT_PARENT_EP.bits(),
        sel4::sys::seL4_MessageInfo::new(RootEvent::TranslateAddr.into(), 0, 0, 1),
        Some(addr),
        None,
        None,
        None,
    );
    *addr as _
}

/// 向 supervisor 请求结束当前任务
pub fn shutdown() -> ! {
    sel4::sys::seL4_CallWithMRsWithoutIPCBuffer(
        crate::consts::DEFAULT_PARENT_EP.bits(),
        sel4::sys::seL4_MessageInfo::new(RootEvent::Shutdown.into(), 0, 0, 0),
        None,
        None,
        None,
        None,
    );
    unreachable!()
}
