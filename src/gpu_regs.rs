// GPU / LCD 暫存器 - framebuffer 描述與純色填充
// 每幀由 RegisterSource 重新讀取，不做快取

use crate::error::{Error, Result};

/// 上螢幕（橫向）寬度
pub const TOP_SCREEN_WIDTH: u32 = 400;
/// 下螢幕（橫向）寬度
pub const BOTTOM_SCREEN_WIDTH: u32 = 320;
/// 兩個螢幕共同的高度
pub const SCREEN_HEIGHT: u32 = 240;

/// 兩個實體螢幕
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Top,
    Bottom,
}

impl Screen {
    pub const fn index(self) -> usize {
        match self {
            Screen::Top => 0,
            Screen::Bottom => 1,
        }
    }

    /// 橫向寬度（像素）
    pub const fn width(self) -> u32 {
        match self {
            Screen::Top => TOP_SCREEN_WIDTH,
            Screen::Bottom => BOTTOM_SCREEN_WIDTH,
        }
    }

    pub const fn height(self) -> u32 {
        SCREEN_HEIGHT
    }

    pub const fn pixel_count(self) -> usize {
        (self.width() * self.height()) as usize
    }

    /// 在輸出 surface 中的起始位置：下螢幕緊接在上螢幕之後
    pub fn surface_offset(self) -> usize {
        match self {
            Screen::Top => 0,
            Screen::Bottom => Screen::Top.pixel_count(),
        }
    }

    pub fn surface_range(self) -> std::ops::Range<usize> {
        let start = self.surface_offset();
        start..start + self.pixel_count()
    }
}

/// Framebuffer 像素格式（格式暫存器 bit 0-2）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    Rgb8,
    Rgb565,
    Rgb5A1,
    Rgba4,
}

impl PixelFormat {
    pub fn from_register(raw: u32) -> Result<Self> {
        match raw & 0x7 {
            0 => Ok(PixelFormat::Rgba8),
            1 => Ok(PixelFormat::Rgb8),
            2 => Ok(PixelFormat::Rgb565),
            3 => Ok(PixelFormat::Rgb5A1),
            4 => Ok(PixelFormat::Rgba4),
            _ => Err(Error::InvalidFormatRegister(raw)),
        }
    }

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgb565 | PixelFormat::Rgb5A1 | PixelFormat::Rgba4 => 2,
        }
    }
}

/// 單一螢幕的 framebuffer 設定快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferConfig {
    pub address_left1: u32,
    pub address_left2: u32,
    pub active_fb: u32, // 雙緩衝選擇：0 = left1，其餘 = left2
    pub width: u32,
    pub height: u32,
    pub stride: u32, // 以位元組計
    pub color_format: PixelFormat,
}

impl FramebufferConfig {
    /// 緊密排列（stride = width * bpp）的設定
    pub fn packed(address: u32, width: u32, height: u32, color_format: PixelFormat) -> Self {
        FramebufferConfig {
            address_left1: address,
            address_left2: address,
            active_fb: 0,
            width,
            height,
            stride: width.saturating_mul(color_format.bytes_per_pixel()),
            color_format,
        }
    }

    pub fn active_address(&self) -> u32 {
        if self.active_fb == 0 {
            self.address_left1
        } else {
            self.address_left2
        }
    }

    pub fn pixel_stride(&self) -> u32 {
        self.stride / self.color_format.bytes_per_pixel()
    }

    pub fn validate_stride(&self) -> Result<()> {
        let bpp = self.color_format.bytes_per_pixel();
        // 寬度來自暫存器，溢位視同不符
        if self.width.checked_mul(bpp) != Some(self.stride) {
            return Err(Error::StrideMismatch {
                stride: self.stride,
                width: self.width,
                bpp,
            });
        }
        Ok(())
    }

    /// 整個 framebuffer 佔用的位元組數
    pub fn byte_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }
}

/// LCD 純色填充暫存器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorFill {
    pub is_enabled: bool,
    pub color_r: u8,
    pub color_g: u8,
    pub color_b: u8,
}

impl ColorFill {
    pub fn from_raw(raw: u32) -> Self {
        ColorFill {
            color_r: (raw & 0xFF) as u8,
            color_g: ((raw >> 8) & 0xFF) as u8,
            color_b: ((raw >> 16) & 0xFF) as u8,
            is_enabled: (raw >> 24) & 1 != 0,
        }
    }

    pub fn raw(&self) -> u32 {
        (self.color_r as u32)
            | (self.color_g as u32) << 8
            | (self.color_b as u32) << 16
            | (self.is_enabled as u32) << 24
    }

    pub fn solid(color_r: u8, color_g: u8, color_b: u8) -> Self {
        ColorFill {
            is_enabled: true,
            color_r,
            color_g,
            color_b,
        }
    }

    /// 不透明 ARGB8888
    pub fn argb(&self) -> u32 {
        0xFF00_0000 | (self.color_r as u32) << 16 | (self.color_g as u32) << 8 | self.color_b as u32
    }
}

/// 唯讀暫存器來源
pub trait RegisterSource {
    fn framebuffer_config(&self, screen: Screen) -> FramebufferConfig;
    fn color_fill(&self, screen: Screen) -> ColorFill;
}

/// 簡單的暫存器檔案，前端與測試使用
#[derive(Debug, Clone)]
pub struct GpuRegs {
    pub framebuffer_config: [FramebufferConfig; 2],
    pub color_fill: [ColorFill; 2],
}

impl GpuRegs {
    /// 兩個螢幕都指向 base 開始的直向 framebuffer（寬 240）
    pub fn new(top_address: u32, bottom_address: u32, format: PixelFormat) -> Self {
        GpuRegs {
            framebuffer_config: [
                FramebufferConfig::packed(top_address, SCREEN_HEIGHT, TOP_SCREEN_WIDTH, format),
                FramebufferConfig::packed(
                    bottom_address,
                    SCREEN_HEIGHT,
                    BOTTOM_SCREEN_WIDTH,
                    format,
                ),
            ],
            color_fill: [ColorFill::default(); 2],
        }
    }

    pub fn set_color_fill_raw(&mut self, screen: Screen, raw: u32) {
        self.color_fill[screen.index()] = ColorFill::from_raw(raw);
    }

    pub fn set_format_raw(&mut self, screen: Screen, raw: u32) -> Result<()> {
        let format = PixelFormat::from_register(raw)?;
        let fb = &mut self.framebuffer_config[screen.index()];
        fb.color_format = format;
        fb.stride = fb.width.saturating_mul(format.bytes_per_pixel());
        Ok(())
    }
}

impl RegisterSource for GpuRegs {
    fn framebuffer_config(&self, screen: Screen) -> FramebufferConfig {
        self.framebuffer_config[screen.index()]
    }

    fn color_fill(&self, screen: Screen) -> ColorFill {
        self.color_fill[screen.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_address_follows_selector() {
        let mut fb = FramebufferConfig::packed(0x1800_0000, 240, 400, PixelFormat::Rgb8);
        fb.address_left2 = 0x1804_6500;
        assert_eq!(fb.active_address(), 0x1800_0000);
        fb.active_fb = 1;
        assert_eq!(fb.active_address(), 0x1804_6500);
    }

    #[test]
    fn test_stride_validation() {
        let mut fb = FramebufferConfig::packed(0, 240, 400, PixelFormat::Rgb565);
        assert_eq!(fb.stride, 480);
        assert!(fb.validate_stride().is_ok());
        assert_eq!(fb.pixel_stride(), 240);
        fb.stride = 512;
        assert!(matches!(
            fb.validate_stride(),
            Err(Error::StrideMismatch { stride: 512, .. })
        ));
    }

    #[test]
    fn test_oversized_width_is_stride_mismatch() {
        let mut fb = FramebufferConfig::packed(0, 240, 400, PixelFormat::Rgba8);
        fb.width = 0x4000_0000;
        assert!(matches!(
            fb.validate_stride(),
            Err(Error::StrideMismatch { width: 0x4000_0000, bpp: 4, .. })
        ));

        let fb = FramebufferConfig::packed(0, 0x4000_0000, 400, PixelFormat::Rgba8);
        assert_eq!(fb.stride, u32::MAX);
        assert!(fb.validate_stride().is_err());

        let mut regs = GpuRegs::new(0, 0, PixelFormat::Rgb565);
        regs.framebuffer_config[0].width = u32::MAX;
        regs.set_format_raw(Screen::Top, 0).unwrap();
        assert!(regs.framebuffer_config[0].validate_stride().is_err());
    }

    #[test]
    fn test_format_register_decoding() {
        assert_eq!(PixelFormat::from_register(0x80341).unwrap(), PixelFormat::Rgb8);
        assert_eq!(PixelFormat::from_register(2).unwrap().bytes_per_pixel(), 2);
        assert!(matches!(
            PixelFormat::from_register(5),
            Err(Error::InvalidFormatRegister(5))
        ));
    }

    #[test]
    fn test_color_fill_register_layout() {
        let fill = ColorFill::from_raw(0x0130_2010);
        assert!(fill.is_enabled);
        assert_eq!((fill.color_r, fill.color_g, fill.color_b), (0x10, 0x20, 0x30));
        assert_eq!(fill.raw(), 0x0130_2010);
        assert_eq!(fill.argb(), 0xFF10_2030);
        assert!(!ColorFill::from_raw(0x00FF_FFFF).is_enabled);
    }

    #[test]
    fn test_screen_ranges_are_adjacent() {
        assert_eq!(Screen::Top.surface_range(), 0..96_000);
        assert_eq!(Screen::Bottom.surface_range(), 96_000..172_800);
    }
}
