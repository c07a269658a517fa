//! 日志
//!
//! 通过 `seL4_DebugPutChar` 输出，每一行带有颜色、任务名和日志级别。

use core::fmt;

use log::{Level, LevelFilter, Record};
use sel4_logging::{Logger, LoggerBuilder};

static LOGGER: Logger = LoggerBuilder::const_default()
    .write(|s| sel4::debug_print!("{}", s))
    .level_filter(LevelFilter::Trace)
    .fmt(fmt_with_color)
    .build();

fn color_code(level: Level) -> u8 {
    match level {
        Level::Error => 31, // Red
        Level::Warn => 93,  // BrightYellow
        Level::Info => 34,  // Blue
        Level::Debug => 32, // Green
        Level::Trace => 90, // BrightBlack
    }
}

fn fmt_with_color(record: &Record, f: &mut fmt::Formatter) -> fmt::Result {
    write!(
        f,
        "\u{1B}[{}m[{} {}] {}\u{1B}[0m",
        color_code(record.level()),
        config::SDIO_TASK_NAME,
        record.level(),
        record.args()
    )
}

/// 安装日志并设置级别，重复调用只会修改级别
pub fn init(level: LevelFilter) {
    if LOGGER.set().is_err() {
        log::debug!("logger already installed");
    }
    log::set_max_level(level);
}
