// log 後端：輸出到 stderr，並附加寫入 logs/emulator.log

use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "emulator.log";

#[derive(Debug)]
pub struct FileLogger {
    level: LevelFilter,
    // 全域 log 檔案鎖，避免多執行緒寫入衝突
    file: Mutex<Option<File>>,
}

impl FileLogger {
    pub fn new(level: LevelFilter, dir: Option<&Path>) -> Self {
        let file = dir.and_then(|dir| {
            if !dir.exists() {
                let _ = std::fs::create_dir_all(dir);
            }
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_FILE))
                .ok()
        });
        FileLogger {
            level,
            file: Mutex::new(file),
        }
    }

    pub fn format(record: &Record) -> String {
        format!("[{} {}] {}", record.level(), record.target(), record.args())
    }

    /// 所有等級都寫到 console，並附加到 log 檔
    fn emit(&self, console: &mut dyn Write, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format(record);
        let _ = writeln!(console, "{}", line);
        if let Ok(mut file) = self.file.lock() {
            if let Some(f) = file.as_mut() {
                let _ = writeln!(f, "{}", line);
            }
        }
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        self.emit(&mut std::io::stderr().lock(), record);
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            if let Some(f) = file.as_mut() {
                let _ = f.flush();
            }
        }
    }
}

/// "trace" / "debug" / "info" / "warn" / "error" / "off"，無法辨識時用 info
pub fn parse_filter(filter: &str) -> LevelFilter {
    filter.trim().parse().unwrap_or(LevelFilter::Info)
}

/// 安裝全域 logger；重複呼叫時保留第一個
pub fn init(filter: &str) {
    let level = parse_filter(filter);
    let logger = FileLogger::new(level, Some(Path::new(LOG_DIR)));
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
    }
}
