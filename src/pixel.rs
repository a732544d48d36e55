// 像素解碼 - framebuffer 原生格式轉為不透明 ARGB8888

use crate::error::{Error, Result};
use crate::gpu_regs::PixelFormat;

const OPAQUE: u32 = 0xFF00_0000;

/// 解碼一個像素。bytes 至少需有 bytes_per_pixel 個位元組。
///
/// RGB8/RGBA8 在記憶體中依 B, G, R 排列；RGBA8 的第四個位元組 (alpha) 忽略。
/// RGB565 為小端 16 位元，各通道左移補齊至 8 位元，不做位元複製。
pub fn decode_pixel(format: PixelFormat, bytes: &[u8]) -> Result<u32> {
    match format {
        PixelFormat::Rgba8 | PixelFormat::Rgb8 => {
            let [b, g, r] = match bytes {
                [b, g, r, ..] => [*b, *g, *r],
                _ => return Err(Error::SourceOutOfBounds { index: 0 }),
            };
            Ok(OPAQUE | (r as u32) << 16 | (g as u32) << 8 | b as u32)
        }
        PixelFormat::Rgb565 => {
            let value = match bytes {
                [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]) as u32,
                _ => return Err(Error::SourceOutOfBounds { index: 0 }),
            };
            let b = (value & 0x1F) << 3;
            let g = ((value >> 5) & 0x3F) << 2;
            let r = ((value >> 11) & 0x1F) << 3;
            Ok(OPAQUE | r << 16 | g << 8 | b)
        }
        other => Err(Error::UnsupportedFormat(other)),
    }
}
