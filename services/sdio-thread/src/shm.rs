//! 共享 DMA 缓冲区
//!
//! sdio 和 crypto 通过一块静态分配的缓冲区交换扇区数据。缓冲区本身
//! 放在静态存储里，通过 [SharedBuffer::take] 取出唯一的可变句柄，
//! 之后只通过 [ShmRegion] 访问。

use core::{
    cell::UnsafeCell,
    sync::atomic::{AtomicBool, Ordering},
};

use config::PAGE_SIZE;
use sdio_proto::{DmaShmInfo, ShmAccess, TaskId};

/// 页对齐的静态缓冲区，只能取出一次
#[repr(C, align(4096))]
pub struct SharedBuffer<const N: usize> {
    data: UnsafeCell<[u8; N]>,
    taken: AtomicBool,
}

// SAFETY: 数据只能通过 take() 取出一次，之后不存在别的访问路径
unsafe impl<const N: usize> Sync for SharedBuffer<N> {}

impl<const N: usize> SharedBuffer<N> {
    pub const fn new() -> Self {
        Self {
            data: UnsafeCell::new([0; N]),
            taken: AtomicBool::new(false),
        }
    }

    /// 取出缓冲区的可变引用，第二次调用返回 `None`
    pub fn take(&'static self) -> Option<&'static mut [u8; N]> {
        if self.taken.swap(true, Ordering::AcqRel) {
            return None;
        }
        // SAFETY: taken 保证这是唯一的一次借用
        Some(unsafe { &mut *self.data.get() })
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}

impl<const N: usize> Default for SharedBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// 向 supervisor 登记共享内存时使用的描述
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DmaShmDescriptor {
    /// 被授权访问的任务
    pub target: TaskId,
    /// 内存的所有者
    pub source: TaskId,
    pub paddr: usize,
    pub size: usize,
    pub mode: ShmAccess,
}

/// 共享缓冲区的句柄，同时记录它的物理地址
pub struct ShmRegion<'a> {
    mem: &'a mut [u8],
    paddr: usize,
}

impl<'a> ShmRegion<'a> {
    pub fn new(mem: &'a mut [u8], paddr: usize) -> Self {
        Self { mem, paddr }
    }

    pub fn len(&self) -> usize {
        self.mem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mem.is_empty()
    }

    /// 缓冲区开头的 `len` 字节，超出缓冲区时返回 `None`
    pub fn span(&self, len: usize) -> Option<&[u8]> {
        self.mem.get(..len)
    }

    pub fn span_mut(&mut self, len: usize) -> Option<&mut [u8]> {
        self.mem.get_mut(..len)
    }

    /// 按页检查缓冲区的物理地址是否连续
    ///
    /// `translate` 把虚拟地址换成物理地址，返回第一个不连续页的虚拟地址。
    pub fn first_discontiguous_page(
        &self,
        mut translate: impl FnMut(usize) -> usize,
    ) -> Option<usize> {
        let vaddr = self.mem.as_ptr() as usize;
        (1..self.mem.len().div_ceil(PAGE_SIZE))
            .map(|page| page * PAGE_SIZE)
            .find(|offset| translate(vaddr + offset) != self.paddr + offset)
            .map(|offset| vaddr + offset)
    }

    /// 读、写两个方向的登记描述，顺序固定为先读后写
    pub fn descriptors(&self, target: TaskId, source: TaskId) -> [DmaShmDescriptor; 2] {
        [ShmAccess::Read, ShmAccess::Write].map(|mode| DmaShmDescriptor {
            target,
            source,
            paddr: self.paddr,
            size: self.mem.len(),
            mode,
        })
    }

    /// 发给 crypto 的地址和大小，超出线上格式的表示范围时返回 `None`
    pub fn geometry(&self) -> Option<DmaShmInfo> {
        let addr = u32::try_from(self.paddr).ok()?;
        let size = u16::try_from(self.mem.len()).ok()?;
        Some(DmaShmInfo::new(addr, size))
    }
}
