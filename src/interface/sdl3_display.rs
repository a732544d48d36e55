use crate::error::{Error, Result};
use crate::gpu_regs::{BOTTOM_SCREEN_WIDTH, SCREEN_HEIGHT, TOP_SCREEN_WIDTH};
use crate::interface::window::EmuWindow;
use sdl3::Sdl;
use sdl3::event::Event;
use sdl3::keyboard::Keycode;
use sdl3::pixels::PixelFormat;
use sdl3::rect::Rect;
use sdl3::render::Canvas;
use sdl3::video::Window;

const LAYOUT_WIDTH: u32 = TOP_SCREEN_WIDTH;
const LAYOUT_HEIGHT: u32 = SCREEN_HEIGHT * 2;
// 下螢幕較窄，水平置中
const BOTTOM_X: usize = ((TOP_SCREEN_WIDTH - BOTTOM_SCREEN_WIDTH) / 2) as usize;

/// SDL3 視窗：上螢幕在上半部，下螢幕在下半部
pub struct SdlWindow {
    _sdl: Sdl,
    canvas: Canvas<Window>,
    event_pump: sdl3::EventPump,
    is_open: bool,
}

impl std::fmt::Debug for SdlWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdlWindow")
            .field("is_open", &self.is_open)
            .finish_non_exhaustive()
    }
}

impl SdlWindow {
    pub fn new(title: &str, scale: u32, fullscreen: bool) -> Result<Self> {
        let sdl = sdl3::init().map_err(|e| Error::Window(format!("SDL init error: {:?}", e)))?;
        let video = sdl
            .video()
            .map_err(|e| Error::Window(format!("SDL video error: {:?}", e)))?;
        let scale = scale.max(1);
        let mut builder = video.window(title, LAYOUT_WIDTH * scale, LAYOUT_HEIGHT * scale);
        builder.position_centered();
        if fullscreen {
            builder.fullscreen();
        }
        let window = builder
            .build()
            .map_err(|e| Error::Window(format!("SDL build window error: {:?}", e)))?;
        let canvas = window.into_canvas();
        let event_pump = sdl
            .event_pump()
            .map_err(|e| Error::Window(format!("SDL event pump error: {:?}", e)))?;
        Ok(Self {
            _sdl: sdl,
            canvas,
            event_pump,
            is_open: true,
        })
    }
}

impl EmuWindow for SdlWindow {
    /// surface 為上螢幕 400x240 接著下螢幕 320x240，轉成 ARGB8888 texture
    fn upload(&mut self, surface: &[u32]) -> Result<()> {
        let top_len = (TOP_SCREEN_WIDTH * SCREEN_HEIGHT) as usize;
        if surface.len() != self.surface_size() {
            return Err(Error::Window("framebuffer size mismatch".into()));
        }
        let (top, bottom) = surface.split_at(top_len);

        let texture_creator = self.canvas.texture_creator();
        let mut texture = texture_creator
            .create_texture_streaming(PixelFormat::ARGB8888, LAYOUT_WIDTH, LAYOUT_HEIGHT)
            .map_err(|e| Error::Window(format!("SDL texture error: {:?}", e)))?;
        texture
            .with_lock(None, |buf: &mut [u8], pitch: usize| {
                buf.fill(0);
                let rows = top
                    .chunks_exact(TOP_SCREEN_WIDTH as usize)
                    .map(|row| (row, 0usize))
                    .chain(
                        bottom
                            .chunks_exact(BOTTOM_SCREEN_WIDTH as usize)
                            .map(|row| (row, BOTTOM_X)),
                    );
                for (y, (row, x0)) in rows.enumerate() {
                    let line = &mut buf[y * pitch..(y + 1) * pitch];
                    for (x, px) in row.iter().enumerate() {
                        let o = (x0 + x) * 4;
                        line[o..o + 4].copy_from_slice(&px.to_le_bytes());
                    }
                }
            })
            .map_err(|e| Error::Window(format!("lock texture error: {:?}", e)))?;

        self.canvas.clear();
        // 整數縮放並置中
        let (ww, wh) = self.canvas.window().size();
        let scale = (ww / LAYOUT_WIDTH).min(wh / LAYOUT_HEIGHT).max(1);
        let dst_w = LAYOUT_WIDTH * scale;
        let dst_h = LAYOUT_HEIGHT * scale;
        let dst_x = (ww.saturating_sub(dst_w) / 2) as i32;
        let dst_y = (wh.saturating_sub(dst_h) / 2) as i32;
        let dst = Rect::new(dst_x, dst_y, dst_w, dst_h);
        self.canvas
            .copy(&texture, None, dst)
            .map_err(|e| Error::Window(format!("copy texture error: {:?}", e)))?;
        Ok(())
    }

    fn poll_events(&mut self) {
        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => self.is_open = false,
                _ => {}
            }
        }
    }

    fn swap_buffers(&mut self) -> Result<()> {
        self.canvas.present();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.is_open
    }

    fn surface_size(&self) -> usize {
        ((TOP_SCREEN_WIDTH + BOTTOM_SCREEN_WIDTH) * SCREEN_HEIGHT) as usize
    }
}
