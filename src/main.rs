mod compositor;
mod config;
mod error;
mod frame_limiter;
mod gpu_regs;
mod interface;
mod memory;
mod perf_stats;
mod pixel;
mod recorder;
mod renderer;
mod transpose;
mod utils;

use clap::{Parser, ValueEnum};
use config::Config;
use error::Result;
use frame_limiter::FrameLimiter;
use gpu_regs::{GpuRegs, PixelFormat, Screen};
use interface::window::{EmuWindow, HeadlessWindow};
use log::{info, warn};
use memory::{PhysicalRam, VRAM_PADDR};
use perf_stats::PerfStats;
use recorder::FrameRecorder;
use renderer::{Renderer, RendererSettings, RendererSoftware, ResultStatus, SystemView};
use std::cell::RefCell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Instant;

const TOP_FB_ADDR: u32 = VRAM_PADDR;
const BOTTOM_FB_ADDR: u32 = VRAM_PADDR + 0x0010_0000;
// 啟用 + B=0x80 G=0x40 R=0x20
const BOTTOM_FILL: u32 = 0x0180_4020;
const FRAME_US: u64 = 16_667;
const HEADLESS_DEFAULT_FRAMES: u64 = 60;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Rgba8,
    Rgb8,
    Rgb565,
}

impl From<FormatArg> for PixelFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Rgba8 => PixelFormat::Rgba8,
            FormatArg::Rgb8 => PixelFormat::Rgb8,
            FormatArg::Rgb565 => PixelFormat::Rgb565,
        }
    }
}

/// 雙螢幕軟體 framebuffer 呈現器
#[derive(Parser, Debug)]
#[command(name = "dualscreen_sw", version)]
struct Args {
    /// 設定檔路徑
    #[arg(long)]
    config: Option<PathBuf>,
    /// 執行的幀數，0 = 直到視窗關閉
    #[arg(long, default_value_t = 0)]
    frames: u64,
    /// 不開視窗
    #[arg(long)]
    headless: bool,
    /// 上螢幕的原始 framebuffer 影像（直向 240 寬）
    #[arg(long)]
    top: Option<PathBuf>,
    /// 下螢幕的原始 framebuffer 影像；未指定時以純色填充
    #[arg(long)]
    bottom: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = FormatArg::Rgb8)]
    format: FormatArg,
    /// 附加幀追蹤紀錄
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("錯誤: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)?;
    utils::logger::init(&config.logging.log_filter);
    config.log_settings();

    let (regs, ram) = build_system(&args, &config)?;

    if !args.headless {
        return run_windowed(&args, &config, &regs, &ram);
    }

    let frames = if args.frames == 0 {
        warn!("headless run without --frames, rendering {} frames", HEADLESS_DEFAULT_FRAMES);
        HEADLESS_DEFAULT_FRAMES
    } else {
        args.frames
    };
    let args = Args { frames, ..args };
    run_loop(
        HeadlessWindow::new(renderer::SURFACE_SIZE),
        &args,
        &config,
        &regs,
        &ram,
    )
}

#[cfg(feature = "sdl")]
fn run_windowed(args: &Args, config: &Config, regs: &GpuRegs, ram: &PhysicalRam) -> Result<()> {
    let window = interface::sdl3_display::SdlWindow::new(
        "dualscreen_sw",
        config.layout.scale,
        config.layout.fullscreen,
    )?;
    run_loop(window, args, config, regs, ram)
}

#[cfg(not(feature = "sdl"))]
fn run_windowed(_: &Args, _: &Config, _: &GpuRegs, _: &PhysicalRam) -> Result<()> {
    Err(error::Error::Window(
        "built without SDL support, run with --headless".into(),
    ))
}

/// 建立暫存器與記憶體；沒有影像時上螢幕畫測試圖樣
fn build_system(args: &Args, config: &Config) -> Result<(GpuRegs, PhysicalRam)> {
    let format: PixelFormat = args.format.into();
    let mut regs = GpuRegs::new(TOP_FB_ADDR, BOTTOM_FB_ADDR, format);
    let mut ram = PhysicalRam::with_default_regions(config.memory.fcram_size);
    for region in ram.regions() {
        info!(
            "{} at {:#010x}, {:#x} bytes",
            region.name,
            region.base,
            region.bytes.len()
        );
    }

    match &args.top {
        Some(path) => ram.write_bytes(TOP_FB_ADDR, &std::fs::read(path)?)?,
        None => {
            let fb = regs.framebuffer_config[Screen::Top.index()];
            let pattern = test_pattern(fb.width, fb.height, format);
            ram.write_bytes(TOP_FB_ADDR, &pattern)?;
        }
    }
    match &args.bottom {
        Some(path) => ram.write_bytes(BOTTOM_FB_ADDR, &std::fs::read(path)?)?,
        None => regs.set_color_fill_raw(Screen::Bottom, BOTTOM_FILL),
    }
    Ok((regs, ram))
}

/// 直向 framebuffer：藍色隨列增加，綠色隨行增加
fn test_pattern(width: u32, height: u32, format: PixelFormat) -> Vec<u8> {
    let mut bytes = Vec::with_capacity((width * height * format.bytes_per_pixel()) as usize);
    for row in 0..height {
        for col in 0..width {
            let b = (row * 255 / height.max(1)) as u8;
            let g = (col * 255 / width.max(1)) as u8;
            let r = 0x40u8;
            match format {
                PixelFormat::Rgb565 => {
                    let v = (r as u16 >> 3) << 11 | (g as u16 >> 2) << 5 | b as u16 >> 3;
                    bytes.extend_from_slice(&v.to_le_bytes());
                }
                PixelFormat::Rgba8 => bytes.extend_from_slice(&[b, g, r, 0xFF]),
                _ => bytes.extend_from_slice(&[b, g, r]),
            }
        }
    }
    bytes
}

fn run_loop<W: EmuWindow>(
    window: W,
    args: &Args,
    config: &Config,
    regs: &GpuRegs,
    ram: &PhysicalRam,
) -> Result<()> {
    let perf_stats = Rc::new(RefCell::new(PerfStats::new()));
    let limiter = FrameLimiter::new(config.renderer.use_frame_limit, config.renderer.frame_limit);
    let mut renderer = RendererSoftware::new(
        window,
        RendererSettings {
            use_hw_renderer: config.renderer.use_hw_renderer,
        },
        Box::new(perf_stats.clone()),
        Box::new(limiter),
    );

    let trace_thread = if args.trace {
        let (recorder, rx) = FrameRecorder::channel();
        renderer.attach_recorder(recorder);
        Some(std::thread::spawn(move || rx.iter().count()))
    } else {
        None
    };

    if renderer.init() != ResultStatus::Success {
        return Err(error::Error::Window("renderer init failed".into()));
    }

    let mut global_time_us = 0u64;
    let mut frame = 0u64;
    while renderer.window().is_open() && (args.frames == 0 || frame < args.frames) {
        global_time_us += FRAME_US;
        let view = SystemView {
            regs,
            memory: ram,
            global_time_us,
        };
        match renderer.swap_buffers(&view) {
            Ok(()) => {}
            Err(e) if e.is_fatal() => {
                renderer.shut_down()?;
                return Err(e);
            }
            Err(e) => warn!("frame {}: {}", frame, e),
        }
        frame += 1;

        if frame % 60 == 0 {
            let stats = perf_stats
                .borrow_mut()
                .get_and_reset_stats(Instant::now(), global_time_us);
            info!(
                "fps {:.1} | frametime {:.2} ms | speed {:.0}%",
                stats.system_fps,
                stats.frametime * 1000.0,
                stats.emulation_speed * 100.0
            );
        }
    }

    renderer.shut_down()?;
    drop(renderer);
    if let Some(handle) = trace_thread {
        let recorded = handle.join().unwrap_or(0);
        info!("trace recorder saw {} frames", recorded);
    }
    Ok(())
}
