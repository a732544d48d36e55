// 螢幕合成 - 每幀為上下兩個螢幕選擇純色填充或記憶體中的 framebuffer

use crate::error::{Error, Result};
use crate::gpu_regs::{ColorFill, PixelFormat, RegisterSource, SCREEN_HEIGHT, Screen};
use crate::memory::PhysicalMemory;
use crate::transpose::{Rotation, memcpy_transpose};
use log::{trace, warn};

/// 記憶體轉換失敗時填入的顏色（不透明黑）
pub const BLANK_COLOR: u32 = 0xFF00_0000;

/// 本幀某個螢幕實際呈現的內容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenContent {
    Filled(ColorFill),
    Framebuffer { address: u32, format: PixelFormat },
    Blanked,
}

/// 依序合成上、下螢幕。致命錯誤立即中止；
/// 可恢復的錯誤只影響該螢幕，另一個螢幕照常合成，最後回傳第一個錯誤
pub fn compose_frame(
    surface: &mut [u32],
    regs: &dyn RegisterSource,
    memory: &dyn PhysicalMemory,
) -> Result<[ScreenContent; 2]> {
    let mut first_error = None;
    let mut contents = [ScreenContent::Blanked; 2];
    for screen in [Screen::Top, Screen::Bottom] {
        match compose_screen(surface, screen, regs, memory) {
            Ok(content) => contents[screen.index()] = content,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(target: "Render_Software", "{:?} screen skipped: {}", screen, e);
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(contents),
    }
}

/// 只寫入該螢幕在 surface 中的範圍
pub fn compose_screen(
    surface: &mut [u32],
    screen: Screen,
    regs: &dyn RegisterSource,
    memory: &dyn PhysicalMemory,
) -> Result<ScreenContent> {
    let range = screen.surface_range();
    if surface.len() < range.end {
        return Err(Error::DestinationOutOfBounds {
            index: range.end - 1,
        });
    }

    let color_fill = regs.color_fill(screen);
    if color_fill.is_enabled {
        trace!(
            target: "Render_Software",
            "{:?} screen color fill {:#010x}",
            screen,
            color_fill.raw()
        );
        surface[range].fill(color_fill.argb());
        return Ok(ScreenContent::Filled(color_fill));
    }

    load_framebuffer(surface, screen, regs, memory)
}

fn load_framebuffer(
    surface: &mut [u32],
    screen: Screen,
    regs: &dyn RegisterSource,
    memory: &dyn PhysicalMemory,
) -> Result<ScreenContent> {
    let framebuffer = regs.framebuffer_config(screen);
    let format = framebuffer.color_format;
    let address = framebuffer.active_address();

    trace!(
        target: "Render_Software",
        "{:#010x} bytes from {:#010x}({}x{}), fmt {:?}",
        framebuffer.byte_len(), address, framebuffer.width, framebuffer.height, format
    );

    framebuffer.validate_stride()?;

    // 原生掃描為直向：寬 240，高等於螢幕橫向寬度
    if framebuffer.width != SCREEN_HEIGHT || framebuffer.height != screen.width() {
        return Err(Error::GeometryMismatch {
            width: framebuffer.width,
            height: framebuffer.height,
            expected_width: SCREEN_HEIGHT,
            expected_height: screen.width(),
        });
    }

    match format {
        PixelFormat::Rgba8 | PixelFormat::Rgb8 | PixelFormat::Rgb565 => {}
        other => return Err(Error::UnsupportedFormat(other)),
    }

    let src = match memory.physical_span(address, framebuffer.byte_len()) {
        Ok(src) => src,
        Err(e) => {
            warn!(target: "Render_Software", "{:?} screen blanked: {}", screen, e);
            surface[screen.surface_range()].fill(BLANK_COLOR);
            return Ok(ScreenContent::Blanked);
        }
    };

    let rotation = Rotation::portrait_to_landscape(
        framebuffer.pixel_stride() as usize,
        screen.width() as usize,
        screen.height() as usize,
    );
    memcpy_transpose(surface, screen.surface_offset(), src, format, rotation)?;

    Ok(ScreenContent::Framebuffer { address, format })
}
