// 軟體渲染器 - 擁有輸出 surface，負責每幀的合成 → 呈現 → 限速 → 後端檢查

use crate::compositor::{BLANK_COLOR, ScreenContent, compose_frame};
use crate::error::{Error, Result};
use crate::frame_limiter::FrameLimiting;
use crate::gpu_regs::{RegisterSource, Screen};
use crate::interface::window::EmuWindow;
use crate::memory::PhysicalMemory;
use crate::perf_stats::PerfStatsSink;
use crate::recorder::FrameRecorder;
use log::{error, info, warn};

/// 400x240 + 320x240
pub const SURFACE_SIZE: usize = Screen::Top.pixel_count() + Screen::Bottom.pixel_count();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    Success,
    ErrorVideoCore,
}

/// 渲染器生命週期：Uninitialized → Ready → ShutDown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Ready,
    ShutDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Software,
    Hardware,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RendererSettings {
    pub use_hw_renderer: bool,
}

/// 每幀由模擬核心提供的唯讀快照
pub struct SystemView<'a> {
    pub regs: &'a dyn RegisterSource,
    pub memory: &'a dyn PhysicalMemory,
    pub global_time_us: u64,
}

pub trait Renderer {
    fn init(&mut self) -> ResultStatus;
    fn swap_buffers(&mut self, system: &SystemView<'_>) -> Result<()>;
    fn shut_down(&mut self) -> Result<()>;
    fn refresh_backend_setting(&mut self) -> Backend;
}

pub struct RendererSoftware<W: EmuWindow> {
    render_window: W,
    settings: RendererSettings,
    state: RendererState,
    render_buffer: Option<Vec<u32>>,
    perf_stats: Box<dyn PerfStatsSink>,
    frame_limiter: Box<dyn FrameLimiting>,
    recorder: Option<FrameRecorder>,
    backend: Option<Backend>,
    hw_request_logged: bool,
    last_frame: Option<[ScreenContent; 2]>,
    frame_count: u64,
}

impl<W: EmuWindow> std::fmt::Debug for RendererSoftware<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererSoftware")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .field("backend", &self.backend)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

impl<W: EmuWindow> RendererSoftware<W> {
    pub fn new(
        render_window: W,
        settings: RendererSettings,
        perf_stats: Box<dyn PerfStatsSink>,
        frame_limiter: Box<dyn FrameLimiting>,
    ) -> Self {
        RendererSoftware {
            render_window,
            settings,
            state: RendererState::Uninitialized,
            render_buffer: None,
            perf_stats,
            frame_limiter,
            recorder: None,
            backend: None,
            hw_request_logged: false,
            last_frame: None,
            frame_count: 0,
        }
    }

    pub fn attach_recorder(&mut self, recorder: FrameRecorder) {
        self.recorder = Some(recorder);
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    /// 只在 Ready 狀態下存在
    pub fn surface(&self) -> Option<&[u32]> {
        self.render_buffer.as_deref()
    }

    pub fn window(&self) -> &W {
        &self.render_window
    }

    pub fn backend(&self) -> Option<Backend> {
        self.backend
    }

    /// 最近一次成功合成的內容
    pub fn last_frame(&self) -> Option<[ScreenContent; 2]> {
        self.last_frame
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl<W: EmuWindow> Renderer for RendererSoftware<W> {
    fn init(&mut self) -> ResultStatus {
        if self.state != RendererState::Uninitialized {
            error!(target: "Render_Software", "init called while {:?}", self.state);
            return ResultStatus::ErrorVideoCore;
        }
        let expected = self.render_window.surface_size();
        if expected != SURFACE_SIZE {
            error!(
                target: "Render_Software",
                "window expects {} pixels, renderer produces {}", expected, SURFACE_SIZE
            );
            return ResultStatus::ErrorVideoCore;
        }

        self.render_buffer = Some(vec![BLANK_COLOR; SURFACE_SIZE]);
        self.refresh_backend_setting();
        self.state = RendererState::Ready;
        info!(target: "Render_Software", "software renderer ready ({} pixels)", SURFACE_SIZE);
        ResultStatus::Success
    }

    fn swap_buffers(&mut self, system: &SystemView<'_>) -> Result<()> {
        let state = self.state;
        let surface = match (state, self.render_buffer.as_mut()) {
            (RendererState::Ready, Some(surface)) => surface,
            _ => {
                return Err(Error::InvalidState {
                    op: "swap_buffers",
                    state,
                });
            }
        };

        let deferred = match compose_frame(surface, system.regs, system.memory) {
            Ok(contents) => {
                self.last_frame = Some(contents);
                None
            }
            Err(e) if e.is_fatal() => {
                error!(target: "Render_Software", "frame {} aborted: {}", self.frame_count, e);
                return Err(e);
            }
            Err(e) => {
                warn!(target: "Render_Software", "frame {} incomplete: {}", self.frame_count, e);
                Some(e)
            }
        };

        self.perf_stats.end_system_frame();

        self.render_window.upload(surface)?;
        self.render_window.poll_events();
        self.render_window.swap_buffers()?;

        self.frame_limiter.do_frame_limiting(system.global_time_us);
        self.perf_stats.begin_system_frame();

        self.refresh_backend_setting();

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.frame_finished();
        }
        self.frame_count += 1;

        match deferred {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn shut_down(&mut self) -> Result<()> {
        if self.state != RendererState::Ready {
            return Err(Error::InvalidState {
                op: "shut_down",
                state: self.state,
            });
        }
        self.render_buffer = None;
        self.state = RendererState::ShutDown;
        info!(target: "Render_Software", "shut down after {} frames", self.frame_count);
        if let Some(recorder) = self.recorder.as_ref() {
            info!(target: "Render_Software", "recorder notified {} frames", recorder.frames());
        }
        Ok(())
    }

    /// 目前只有軟體後端；保留此檢查給日後的硬體後端
    fn refresh_backend_setting(&mut self) -> Backend {
        if self.settings.use_hw_renderer && !self.hw_request_logged {
            warn!(
                target: "Render_Software",
                "hardware renderer requested but not available, using software"
            );
            self.hw_request_logged = true;
        }
        *self.backend.get_or_insert(Backend::Software)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu_regs::{ColorFill, GpuRegs, PixelFormat};
    use crate::interface::window::HeadlessWindow;
    use crate::memory::{PhysicalRam, VRAM_PADDR};
    use crate::recorder::FrameEvent;
    use std::cell::RefCell;
    use std::rc::Rc;

    type CallLog = Rc<RefCell<Vec<String>>>;

    struct LoggedWindow {
        inner: HeadlessWindow,
        log: CallLog,
    }

    impl EmuWindow for LoggedWindow {
        fn upload(&mut self, surface: &[u32]) -> Result<()> {
            self.log.borrow_mut().push("upload".into());
            self.inner.upload(surface)
        }
        fn poll_events(&mut self) {
            self.log.borrow_mut().push("poll".into());
        }
        fn swap_buffers(&mut self) -> Result<()> {
            self.log.borrow_mut().push("swap".into());
            Ok(())
        }
        fn is_open(&self) -> bool {
            true
        }
        fn surface_size(&self) -> usize {
            self.inner.surface_size()
        }
    }

    struct LoggedStats(CallLog);

    impl PerfStatsSink for LoggedStats {
        fn begin_system_frame(&mut self) {
            self.0.borrow_mut().push("begin".into());
        }
        fn end_system_frame(&mut self) {
            self.0.borrow_mut().push("end".into());
        }
    }

    struct LoggedLimiter(CallLog);

    impl FrameLimiting for LoggedLimiter {
        fn do_frame_limiting(&mut self, current_system_time_us: u64) {
            self.0
                .borrow_mut()
                .push(format!("limit {}", current_system_time_us));
        }
    }

    const TOP_ADDR: u32 = VRAM_PADDR;
    const BOTTOM_ADDR: u32 = VRAM_PADDR + 0x0010_0000;

    fn logged_renderer(settings: RendererSettings) -> (RendererSoftware<LoggedWindow>, CallLog) {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        let window = LoggedWindow {
            inner: HeadlessWindow::new(SURFACE_SIZE),
            log: log.clone(),
        };
        let renderer = RendererSoftware::new(
            window,
            settings,
            Box::new(LoggedStats(log.clone())),
            Box::new(LoggedLimiter(log.clone())),
        );
        (renderer, log)
    }

    fn system() -> (GpuRegs, PhysicalRam) {
        (
            GpuRegs::new(TOP_ADDR, BOTTOM_ADDR, PixelFormat::Rgb565),
            PhysicalRam::with_default_regions(0x1000),
        )
    }

    #[test]
    fn test_frame_sequence_order() {
        let (mut renderer, log) = logged_renderer(RendererSettings::default());
        let (regs, ram) = system();
        assert_eq!(renderer.init(), ResultStatus::Success);

        let view = SystemView {
            regs: &regs,
            memory: &ram,
            global_time_us: 16_667,
        };
        renderer.swap_buffers(&view).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["end", "upload", "poll", "swap", "limit 16667", "begin"]
        );
        assert_eq!(renderer.frame_count(), 1);
        assert_eq!(ram.read_count(), 2);
    }

    #[test]
    fn test_lifecycle_transitions() {
        let (mut renderer, _) = logged_renderer(RendererSettings::default());
        let (regs, ram) = system();
        let view = SystemView {
            regs: &regs,
            memory: &ram,
            global_time_us: 0,
        };

        assert!(matches!(
            renderer.swap_buffers(&view),
            Err(Error::InvalidState { state: RendererState::Uninitialized, .. })
        ));
        assert!(renderer.shut_down().is_err());
        assert!(renderer.surface().is_none());

        assert_eq!(renderer.init(), ResultStatus::Success);
        assert_eq!(renderer.state(), RendererState::Ready);
        assert_eq!(renderer.surface().map(|s| s.len()), Some(SURFACE_SIZE));
        assert_eq!(renderer.init(), ResultStatus::ErrorVideoCore);

        renderer.shut_down().unwrap();
        assert_eq!(renderer.state(), RendererState::ShutDown);
        assert!(renderer.surface().is_none());
        assert!(renderer.swap_buffers(&view).is_err());
        assert!(renderer.shut_down().is_err());
        assert_eq!(renderer.init(), ResultStatus::ErrorVideoCore);
    }

    #[test]
    fn test_init_rejects_wrong_window_size() {
        let mut renderer = RendererSoftware::new(
            HeadlessWindow::new(400 * 480),
            RendererSettings::default(),
            Box::new(crate::perf_stats::PerfStats::new()),
            Box::new(crate::frame_limiter::FrameLimiter::new(false, 100)),
        );
        assert_eq!(renderer.init(), ResultStatus::ErrorVideoCore);
        assert_eq!(renderer.state(), RendererState::Uninitialized);
    }

    #[test]
    fn test_fatal_error_skips_presentation() {
        let (mut renderer, log) = logged_renderer(RendererSettings::default());
        let (mut regs, ram) = system();
        regs.set_format_raw(Screen::Bottom, 3).unwrap();
        renderer.init();

        let view = SystemView {
            regs: &regs,
            memory: &ram,
            global_time_us: 0,
        };
        let err = renderer.swap_buffers(&view).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(PixelFormat::Rgb5A1)));
        assert!(log.borrow().is_empty());
        assert_eq!(renderer.frame_count(), 0);
        assert_eq!(renderer.state(), RendererState::Ready);
    }

    #[test]
    fn test_recoverable_error_still_presents() {
        let (mut renderer, log) = logged_renderer(RendererSettings::default());
        let (mut regs, ram) = system();
        regs.framebuffer_config[0].stride = 0;
        renderer.init();

        let view = SystemView {
            regs: &regs,
            memory: &ram,
            global_time_us: 100,
        };
        let err = renderer.swap_buffers(&view).unwrap_err();
        assert!(matches!(err, Error::StrideMismatch { .. }));
        assert_eq!(log.borrow().len(), 6);
        assert_eq!(renderer.frame_count(), 1);
    }

    #[test]
    fn test_end_to_end_presents_both_screens() {
        let (mut regs, mut ram) = system();
        let red: Vec<u8> = (0..240 * 400).flat_map(|_| 0xF800u16.to_le_bytes()).collect();
        ram.write_bytes(TOP_ADDR, &red).unwrap();
        regs.color_fill[Screen::Bottom.index()] = ColorFill::solid(0, 0, 0xFF);

        let mut renderer = RendererSoftware::new(
            HeadlessWindow::new(SURFACE_SIZE),
            RendererSettings::default(),
            Box::new(crate::perf_stats::PerfStats::new()),
            Box::new(crate::frame_limiter::FrameLimiter::new(false, 100)),
        );
        let (recorder, rx) = FrameRecorder::channel();
        renderer.attach_recorder(recorder);
        assert_eq!(renderer.init(), ResultStatus::Success);

        let view = SystemView {
            regs: &regs,
            memory: &ram,
            global_time_us: 16_667,
        };
        renderer.swap_buffers(&view).unwrap();

        let shown = renderer.window().framebuffer();
        assert!(shown[..96_000].iter().all(|&p| p == 0xFFF8_0000));
        assert!(shown[96_000..].iter().all(|&p| p == 0xFF00_00FF));
        assert_eq!(renderer.window().swaps, 1);
        assert_eq!(ram.read_count(), 1);
        assert_eq!(rx.try_recv(), Ok(FrameEvent::Finished { frame: 0 }));
        assert!(matches!(
            renderer.last_frame(),
            Some([ScreenContent::Framebuffer { .. }, ScreenContent::Filled(_)])
        ));
    }

    #[test]
    fn test_hardware_request_resolves_to_software() {
        let (mut renderer, _) = logged_renderer(RendererSettings {
            use_hw_renderer: true,
        });
        assert_eq!(renderer.backend(), None);
        renderer.init();
        assert_eq!(renderer.backend(), Some(Backend::Software));
        assert_eq!(renderer.refresh_backend_setting(), Backend::Software);
    }
}
