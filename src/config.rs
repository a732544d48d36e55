// 前端設定 - JSON 設定檔，不存在時以預設值建立

use crate::error::{Error, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "sdl3-config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RendererConfig {
    pub use_hw_renderer: bool,
    pub use_frame_limit: bool,
    pub frame_limit: u16,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            use_hw_renderer: false,
            use_frame_limit: true,
            frame_limit: 100,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub fullscreen: bool,
    pub scale: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            fullscreen: false,
            scale: 2,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MemoryConfig {
    pub fcram_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            fcram_size: crate::memory::FCRAM_SIZE,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_filter: "info".into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub renderer: RendererConfig,
    pub layout: LayoutConfig,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        if config.layout.scale == 0 {
            return Err(Error::Config("layout.scale must be at least 1".into()));
        }
        Ok(config)
    }

    /// 讀取設定檔；不存在時寫入預設值並重讀一次
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_retry(path, true)
    }

    fn load_with_retry(path: &Path, retry: bool) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let config = Self::from_json(&text)?;
                info!(target: "Config", "Successfully loaded {}", path.display());
                Ok(config)
            }
            Err(e) if retry && e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    target: "Config",
                    "Failed to load {}. Creating file from defaults...", path.display()
                );
                Config::default().save(path)?;
                Self::load_with_retry(path, false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    pub fn log_settings(&self) {
        info!(target: "Config", "Renderer_UseHwRenderer: {}", self.renderer.use_hw_renderer);
        info!(target: "Config", "Renderer_UseFrameLimit: {}", self.renderer.use_frame_limit);
        info!(target: "Config", "Renderer_FrameLimit: {}", self.renderer.frame_limit);
        info!(target: "Layout", "Layout_Fullscreen: {}", self.layout.fullscreen);
        info!(target: "Layout", "Layout_Scale: {}", self.layout.scale);
        info!(target: "Config", "Memory_FcramSize: {:#x}", self.memory.fcram_size);
        info!(target: "Config", "Logging_Filter: {}", self.logging.log_filter);
    }
}
