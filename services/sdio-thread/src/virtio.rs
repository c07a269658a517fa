use alloc::collections::BTreeMap;
use common::root::translate_addr;
use config::{DMA_ADDR_START, VIRTIO_MMIO_VIRT_ADDR};
use core::{
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};
use spin::Mutex;
use virtio_drivers::{BufferDirection, Hal, PAGE_SIZE, PhysAddr};

static DMA_ADDR: AtomicUsize = AtomicUsize::new(DMA_ADDR_START);
/// 虚拟页号 -> 物理页号
static ADDR_MAP: Mutex<BTreeMap<usize, usize>> = Mutex::new(BTreeMap::new());

/// 查询物理地址，按页缓存 supervisor 的结果
pub fn translate_address(vaddr: usize) -> usize {
    let vp_index = vaddr / PAGE_SIZE;
    let offset = vaddr % PAGE_SIZE;

    let mut map = ADDR_MAP.lock();
    match map.get(&vp_index) {
        Some(ppn) => ppn * PAGE_SIZE + offset,
        None => {
            let paddr = translate_addr(vaddr);
            map.insert(vp_index, paddr / PAGE_SIZE);
            paddr
        }
    }
}

pub struct HalImpl;

unsafe impl Hal for HalImpl {
    fn dma_alloc(pages: usize, _direction: BufferDirection) -> (PhysAddr, NonNull<u8>) {
        let vaddr = DMA_ADDR.fetch_add(pages * PAGE_SIZE, Ordering::AcqRel);
        // SAFETY: DMA 窗口从 DMA_ADDR_START 开始，不会是空指针
        let ptr = unsafe { NonNull::new_unchecked(vaddr as *mut u8) };
        (translate_address(vaddr), ptr)
    }

    unsafe fn dma_dealloc(_paddr: PhysAddr, _vaddr: NonNull<u8>, _pages: usize) -> i32 {
        0
    }

    unsafe fn mmio_phys_to_virt(paddr: PhysAddr, _size: usize) -> NonNull<u8> {
        // 设备虚拟地址 = VIRTIO_MMIO_VIRT_ADDR + 设备物理地址
        unsafe { NonNull::new_unchecked((VIRTIO_MMIO_VIRT_ADDR + paddr) as *mut u8) }
    }

    unsafe fn share(buffer: NonNull<[u8]>, _direction: BufferDirection) -> PhysAddr {
        translate_address(buffer.as_ptr() as *const u8 as _)
    }

    unsafe fn unshare(_paddr: PhysAddr, _buffer: NonNull<[u8]>, _direction: BufferDirection) {
        // 共享缓冲区本身就是 DMA 的目标，没有拷贝
    }
}
