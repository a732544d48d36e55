// 錯誤型別 - 畫面合成與呈現流程共用

use crate::gpu_regs::PixelFormat;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unimplemented framebuffer format {0:?}")]
    UnsupportedFormat(PixelFormat),

    #[error("invalid framebuffer format register value {0:#x}")]
    InvalidFormatRegister(u32),

    #[error("stride {stride} does not match width {width} x {bpp} bytes per pixel")]
    StrideMismatch { stride: u32, width: u32, bpp: u32 },

    #[error("framebuffer is {width}x{height}, screen expects {expected_width}x{expected_height}")]
    GeometryMismatch {
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("cannot translate {len:#x} bytes at physical address {addr:#010x}")]
    MemoryTranslation { addr: u32, len: usize },

    #[error("source pixel index {index} is outside the framebuffer")]
    SourceOutOfBounds { index: isize },

    #[error("destination index {index} is outside the output surface")]
    DestinationOutOfBounds { index: usize },

    #[error("{op} is not valid while the renderer is {state:?}")]
    InvalidState {
        op: &'static str,
        state: crate::renderer::RendererState,
    },

    #[error("window error: {0}")]
    Window(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// 不可恢復：本幀合成中止，前端應結束
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat(_)
                | Error::SourceOutOfBounds { .. }
                | Error::DestinationOutOfBounds { .. }
                | Error::InvalidState { .. }
                | Error::Window(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_is_fatal() {
        assert!(Error::UnsupportedFormat(PixelFormat::Rgba4).is_fatal());
        assert!(Error::SourceOutOfBounds { index: -1 }.is_fatal());
    }

    #[test]
    fn test_configuration_errors_are_recoverable() {
        let e = Error::StrideMismatch {
            stride: 481,
            width: 240,
            bpp: 2,
        };
        assert!(!e.is_fatal());
        assert!(!Error::MemoryTranslation { addr: 0, len: 4 }.is_fatal());
        assert_eq!(
            e.to_string(),
            "stride 481 does not match width 240 x 2 bytes per pixel"
        );
    }
}
