//! 通过 supervisor 实现的内核设施

use common::root;
use sdio_proto::{SleepMode, SysError, TaskId};
use sdio_thread::{
    Channel, DmaRegistrar, DmaShmDescriptor, Received, SleepOutcome, Sleeper, TaskDirectory,
};

pub struct Supervisor;

impl TaskDirectory for Supervisor {
    fn task_id(&mut self, name: &str) -> Result<TaskId, SysError> {
        root::find_task(name)
    }
}

impl DmaRegistrar for Supervisor {
    fn register_dma_shm(&mut self, desc: &DmaShmDescriptor) -> Result<(), SysError> {
        root::register_dma_shm(desc.target, desc.source, desc.paddr, desc.size, desc.mode)
    }

    fn init_done(&mut self) -> Result<(), SysError> {
        root::init_done()
    }
}

impl Channel for Supervisor {
    fn send(&mut self, to: TaskId, payload: &[u8]) -> Result<(), SysError> {
        root::ipc_send(to, payload).into_result()
    }

    fn recv(&mut self, from: TaskId, buf: &mut [u8]) -> Result<Received, SysError> {
        root::ipc_recv(from, buf).map(|(sender, len)| Received { sender, len })
    }
}

impl Sleeper for Supervisor {
    fn sleep(&mut self, ms: u32, mode: SleepMode) -> Result<SleepOutcome, SysError> {
        Ok(match root::sleep(ms, mode)? {
            true => SleepOutcome::Interrupted,
            false => SleepOutcome::Elapsed,
        })
    }
}
