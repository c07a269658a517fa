use sel4::{Word, cap::Endpoint};

/// 通过 [sel4::cap::Endpoint] 发送一次数据最大数量
pub const IPC_DATA_LEN: usize = 120 * 8;

/// 通过 [sel4::cap::Endpoint] 发送数据时，reg 的大小
pub const REG_LEN: usize = size_of::<Word>();

/// 与 supervisor 通信使用的 [Endpoint]
pub const DEFAULT_PARENT_EP: Endpoint = Endpoint::from_bits(config::DEFAULT_PARENT_EP);
