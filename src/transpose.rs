// 區塊複製 + 轉置 - 直向掃描的 framebuffer 轉成橫向逐列的輸出
// 以一次走訪完成對角轉置：目的 (row, col) 取自來源 (col, row)

use crate::error::{Error, Result};
use crate::gpu_regs::PixelFormat;
use crate::pixel::decode_pixel;

/// 走訪方式，步進單位都是「來源像素」
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    pub x_modifier: isize, // 群組內每個像素的步進
    pub y_modifier: isize, // 每個群組結束後的額外步進
    pub x_count: usize,    // 每組像素數（目的列寬）
    pub y_count: usize,    // 組數（目的列數）
}

impl Rotation {
    /// 對角轉置的走訪。來源每列 src_pixel_stride 像素、共 landscape_width 列；
    /// 目的為 landscape_width x landscape_height 的逐列 buffer。
    /// 目的 (row, col) 取自來源第 col 列、第 row 個像素。
    pub fn portrait_to_landscape(
        src_pixel_stride: usize,
        landscape_width: usize,
        landscape_height: usize,
    ) -> Self {
        let stride = src_pixel_stride as isize;
        Rotation {
            x_modifier: stride,
            y_modifier: 1 - landscape_width as isize * stride,
            x_count: landscape_width,
            y_count: landscape_height,
        }
    }

    /// 幾何反向：把橫向 buffer 還原成緊密排列的直向 framebuffer。
    /// 只適用於 portrait_to_landscape 且 stride == landscape_height 的情況。
    pub fn inverse(&self) -> Self {
        Rotation::portrait_to_landscape(self.x_count, self.y_count, self.x_count)
    }

    pub fn pixel_count(&self) -> usize {
        self.x_count * self.y_count
    }
}

/// 依 rotation 走訪 src，解碼後依序寫入 dst[dst_offset..]。
/// 所有索引都會檢查邊界，越界時回傳錯誤而不寫入剩餘像素。
pub fn memcpy_transpose(
    dst: &mut [u32],
    dst_offset: usize,
    src: &[u8],
    format: PixelFormat,
    rotation: Rotation,
) -> Result<()> {
    let total = rotation.pixel_count();
    if total == 0 {
        return Ok(());
    }
    let end = dst_offset
        .checked_add(total)
        .ok_or(Error::DestinationOutOfBounds { index: usize::MAX })?;
    let dst = dst
        .get_mut(dst_offset..end)
        .ok_or(Error::DestinationOutOfBounds { index: end - 1 })?;

    let bpp = format.bytes_per_pixel() as usize;
    let mut src_index: isize = 0;
    for row in dst.chunks_exact_mut(rotation.x_count) {
        for out in row.iter_mut() {
            let pixel = usize::try_from(src_index)
                .ok()
                .and_then(|i| i.checked_mul(bpp))
                .and_then(|offset| src.get(offset..offset + bpp))
                .ok_or(Error::SourceOutOfBounds { index: src_index })?;
            *out = decode_pixel(format, pixel)?;
            src_index += rotation.x_modifier;
        }
        src_index += rotation.y_modifier;
    }
    Ok(())
}
