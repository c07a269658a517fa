use sel4::IpcBuffer;

use crate::consts::{IPC_DATA_LEN, REG_LEN};

macro_rules! impl_ipc_rw {
    ($($name:ident),*) => {
        $(
            impl IpcTypeReader for $name {
                #[inline]
                fn read_buffer(ib: &IpcBuffer, off: &mut usize) -> Self {
                    *off += 1;
                    ib.msg_regs()[*off - 1] as _
                }
            }

            impl IpcTypeWriter for $name {
                #[inline]
                fn write_buffer(&self, ib: &mut IpcBuffer, off: &mut usize) {
                    ib.msg_regs_mut()[*off] = *self as _;
                    *off += 1;
                }
            }
        )*
    };
}

/// 从 IPC Buffer 的消息寄存器中读取一个值，`off` 是寄存器下标
pub trait IpcTypeReader: Sized {
    fn read_buffer(ib: &IpcBuffer, off: &mut usize) -> Self;
}

/// 向 IPC Buffer 的消息寄存器中写入一个值，写完之后 `off` 就是消息长度
pub trait IpcTypeWriter {
    fn write_buffer(&self, ib: &mut IpcBuffer, off: &mut usize);
}

impl_ipc_rw!(u8, u16, u32, u64, usize);

/// 字节串：一个寄存器存放长度，后面跟着按寄存器对齐的数据
///
/// 超出 IPC Buffer 容量的部分会被截断
impl IpcTypeWriter for [u8] {
    #[inline]
    fn write_buffer(&self, ib: &mut IpcBuffer, off: &mut usize) {
        let start = (*off + 1) * REG_LEN;
        let len = self.len().min(IPC_DATA_LEN.saturating_sub(start));
        ib.msg_regs_mut()[*off] = len as _;
        ib.msg_bytes_mut()[start..start + len].copy_from_slice(&self[..len]);
        *off += 1 + len.div_ceil(REG_LEN);
    }
}

impl IpcTypeWriter for str {
    #[inline]
    fn write_buffer(&self, ib: &mut IpcBuffer, off: &mut usize) {
        self.as_bytes().write_buffer(ib, off)
    }
}

/// 读取一个字节串到 `dst` 中，返回实际拷贝的长度
///
/// 发送方写入的长度超过 `dst` 时只拷贝前面的部分。
pub fn read_bytes_into(ib: &IpcBuffer, off: &mut usize, dst: &mut [u8]) -> usize {
    let start = (*off + 1) * REG_LEN;
    let len = (ib.msg_regs()[*off] as usize).min(IPC_DATA_LEN.saturating_sub(start));
    let copied = len.min(dst.len());
    dst[..copied].copy_from_slice(&ib.msg_bytes()[start..start + copied]);
    *off += 1 + len.div_ceil(REG_LEN);
    copied
}
