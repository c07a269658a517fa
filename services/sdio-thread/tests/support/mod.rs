#![allow(dead_code)]

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use sdio_thread::{
    BlockDevice, BlockError, CancelToken, Channel, DmaRegistrar, DmaShmDescriptor, Received,
    SleepOutcome, Sleeper, TaskDirectory,
    proto::{DataplaneCommand, Magic, SleepMode, SyncCommand, SyncState, SysError, TaskId},
};
use zerocopy::IntoBytes;

pub const PEER: TaskId = TaskId(7);
pub const SELF: TaskId = TaskId(1);

/// 假内核和假磁盘共同记录的事件
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Lookup(String),
    Register(DmaShmDescriptor),
    InitDone,
    Send { to: TaskId, bytes: Vec<u8> },
    Recv { from: TaskId },
    Sleep { ms: u32, mode: SleepMode },
    EarlyInit,
    InitStorage,
    Read { sector: u32, len: usize },
    Write { sector: u32, len: usize },
}

pub type Trace = Rc<RefCell<Vec<Event>>>;

pub fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn sent(trace: &Trace) -> Vec<Vec<u8>> {
    trace
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Send { bytes, .. } => Some(bytes.clone()),
            _ => None,
        })
        .collect()
}

pub fn count(trace: &Trace, pred: impl Fn(&Event) -> bool) -> usize {
    trace.borrow().iter().filter(|e| pred(e)).count()
}

pub fn position(trace: &Trace, pred: impl Fn(&Event) -> bool) -> Option<usize> {
    trace.borrow().iter().position(pred)
}

pub fn sync(magic: Magic, state: SyncState) -> Vec<u8> {
    SyncCommand::new(magic, state).as_bytes().to_vec()
}

pub fn command(magic: Magic, sector: u32, num_sectors: u32) -> Vec<u8> {
    DataplaneCommand::new(magic, sector, num_sectors).as_bytes().to_vec()
}

pub fn ack(magic: Magic) -> Vec<u8> {
    command(magic, 0, 0)
}

/// 按脚本回复的内核
pub struct FakeKernel {
    pub trace: Trace,
    pub tasks: Vec<(&'static str, TaskId)>,
    pub inbox: VecDeque<Result<(TaskId, Vec<u8>), SysError>>,
    /// 接下来的这么多次发送返回繁忙
    pub busy_sends: u32,
    pub send_attempts: u32,
    pub send_result: Result<(), SysError>,
    pub register_result: Result<(), SysError>,
    pub init_done_result: Result<(), SysError>,
    pub sleep_outcome: SleepOutcome,
    /// 收件箱空了之后触发，没有设置时直接 panic
    pub cancel_on_empty: Option<Rc<CancelToken>>,
}

impl FakeKernel {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
            tasks: vec![("crypto", PEER), ("sdio", SELF)],
            inbox: VecDeque::new(),
            busy_sends: 0,
            send_attempts: 0,
            send_result: Ok(()),
            register_result: Ok(()),
            init_done_result: Ok(()),
            sleep_outcome: SleepOutcome::Elapsed,
            cancel_on_empty: None,
        }
    }

    /// crypto 正常完成握手时发来的两条消息
    pub fn with_peer_handshake(mut self) -> Self {
        self.push(PEER, sync(Magic::TaskStateResp, SyncState::Acknowledge));
        self.push(PEER, sync(Magic::TaskStateCmd, SyncState::Ready));
        self
    }

    pub fn push(&mut self, from: TaskId, bytes: Vec<u8>) {
        self.inbox.push_back(Ok((from, bytes)));
    }

    fn record(&self, event: Event) {
        self.trace.borrow_mut().push(event);
    }
}

impl TaskDirectory for FakeKernel {
    fn task_id(&mut self, name: &str) -> Result<TaskId, SysError> {
        self.record(Event::Lookup(name.to_string()));
        self.tasks
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, id)| *id)
            .ok_or(SysError::Inval)
    }
}

impl DmaRegistrar for FakeKernel {
    fn register_dma_shm(&mut self, desc: &DmaShmDescriptor) -> Result<(), SysError> {
        self.record(Event::Register(*desc));
        self.register_result
    }

    fn init_done(&mut self) -> Result<(), SysError> {
        self.record(Event::InitDone);
        self.init_done_result
    }
}

impl Channel for FakeKernel {
    fn send(&mut self, to: TaskId, payload: &[u8]) -> Result<(), SysError> {
        self.send_attempts += 1;
        if self.busy_sends > 0 {
            self.busy_sends -= 1;
            return Err(SysError::Busy);
        }
        if self.send_result.is_ok() {
            self.record(Event::Send {
                to,
                bytes: payload.to_vec(),
            });
        }
        self.send_result
    }

    fn recv(&mut self, from: TaskId, buf: &mut [u8]) -> Result<Received, SysError> {
        self.record(Event::Recv { from });
        match self.inbox.pop_front() {
            Some(Ok((sender, bytes))) => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok(Received { sender, len })
            }
            Some(Err(err)) => Err(err),
            None => match &self.cancel_on_empty {
                Some(token) => {
                    token.cancel();
                    Err(SysError::Unknown(0xdead))
                }
                None => panic!("inbox exhausted"),
            },
        }
    }
}

impl Sleeper for FakeKernel {
    fn sleep(&mut self, ms: u32, mode: SleepMode) -> Result<SleepOutcome, SysError> {
        self.record(Event::Sleep { ms, mode });
        Ok(self.sleep_outcome)
    }
}

/// 记录所有操作的磁盘，读出来的数据都是 `fill`
pub struct FakeDisk {
    pub trace: Trace,
    pub fill: u8,
    pub written: Vec<(u32, Vec<u8>)>,
    pub early_init_result: Result<(), BlockError>,
    pub init_result: Result<(), BlockError>,
    pub io_result: Result<(), BlockError>,
}

impl FakeDisk {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
            fill: 0x5a,
            written: Vec::new(),
            early_init_result: Ok(()),
            init_result: Ok(()),
            io_result: Ok(()),
        }
    }

    fn record(&self, event: Event) {
        self.trace.borrow_mut().push(event);
    }
}

impl BlockDevice for FakeDisk {
    fn early_init(&mut self) -> Result<(), BlockError> {
        self.record(Event::EarlyInit);
        self.early_init_result
    }

    fn init(&mut self) -> Result<(), BlockError> {
        self.record(Event::InitStorage);
        self.init_result
    }

    fn read(&mut self, buf: &mut [u8], sector: u32) -> Result<(), BlockError> {
        self.record(Event::Read {
            sector,
            len: buf.len(),
        });
        self.io_result?;
        buf.fill(self.fill);
        Ok(())
    }

    fn write(&mut self, buf: &[u8], sector: u32) -> Result<(), BlockError> {
        self.record(Event::Write {
            sector,
            len: buf.len(),
        });
        self.io_result?;
        self.written.push((sector, buf.to_vec()));
        Ok(())
    }
}
