//! 呈現層介面

use crate::error::Result;

pub trait EmuWindow {
    /// 把本幀的 surface 交給視窗；參考只在這次呼叫內有效
    fn upload(&mut self, surface: &[u32]) -> Result<()>;
    /// 處理待處理的視窗 / 輸入事件
    fn poll_events(&mut self);
    /// 顯示已上傳的畫面
    fn swap_buffers(&mut self) -> Result<()>;
    fn is_open(&self) -> bool;
    /// 視窗期望的 surface 像素數
    fn surface_size(&self) -> usize;
}

/// 無視窗實作：保留最後一幀並記錄呼叫次數
#[derive(Debug)]
pub struct HeadlessWindow {
    framebuffer: Vec<u32>,
    pub uploads: u32,
    pub polls: u32,
    pub swaps: u32,
    is_open: bool,
}

impl HeadlessWindow {
    pub fn new(surface_size: usize) -> Self {
        Self {
            framebuffer: vec![0xFF00_0000; surface_size],
            uploads: 0,
            polls: 0,
            swaps: 0,
            is_open: true,
        }
    }

    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }
}

impl EmuWindow for HeadlessWindow {
    fn upload(&mut self, surface: &[u32]) -> Result<()> {
        if surface.len() != self.framebuffer.len() {
            return Err(crate::error::Error::Window("framebuffer size mismatch".into()));
        }
        self.framebuffer.copy_from_slice(surface);
        self.uploads += 1;
        Ok(())
    }

    fn poll_events(&mut self) {
        self.polls += 1;
    }

    fn swap_buffers(&mut self) -> Result<()> {
        self.swaps += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.is_open
    }

    fn surface_size(&self) -> usize {
        self.framebuffer.len()
    }
}
