#[cfg(feature = "sdl")]
pub mod sdl3_display;
pub mod window;
