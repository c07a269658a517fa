//! sel4-runtime 库
//!
//! 为 sdio 任务提供基础运行环境：入口函数、内存布局和日志。
//!
//! ```ignore
//! sel4_runtime::entry_point!(main, log::LevelFilter::Info);
//!
//! fn main() -> ! { ... }
//! ```
#![no_std]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod entry;
pub mod layout;
pub mod logging;

pub use log::LevelFilter;
