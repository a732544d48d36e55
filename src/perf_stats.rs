// 效能統計 - 每個系統幀的實際耗時與 FPS

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// 幀開始 / 結束通知
pub trait PerfStatsSink {
    fn begin_system_frame(&mut self);
    fn end_system_frame(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfStatsResults {
    /// 本統計區間內的系統幀率
    pub system_fps: f64,
    /// 每幀平均耗時（秒），不含幀與幀之間的時間
    pub frametime: f64,
    /// 模擬速度，1.0 為全速
    pub emulation_speed: f64,
}

#[derive(Debug)]
pub struct PerfStats {
    reset_point: Instant,
    reset_point_system_us: u64,
    frame_begin: Option<Instant>,
    accumulated_frametime: Duration,
    system_frames: u32,
}

impl PerfStats {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        PerfStats {
            reset_point: now,
            reset_point_system_us: 0,
            frame_begin: None,
            accumulated_frametime: Duration::ZERO,
            system_frames: 0,
        }
    }

    pub fn begin_system_frame_at(&mut self, now: Instant) {
        self.frame_begin = Some(now);
    }

    pub fn end_system_frame_at(&mut self, now: Instant) {
        // 第一幀之前沒有 begin
        if let Some(begin) = self.frame_begin.take() {
            self.accumulated_frametime += now.saturating_duration_since(begin);
        }
        self.system_frames += 1;
    }

    pub fn system_frames(&self) -> u32 {
        self.system_frames
    }

    /// 計算自上次重設以來的統計並重設區間
    pub fn get_and_reset_stats(&mut self, now: Instant, current_system_us: u64) -> PerfStatsResults {
        let interval = now.saturating_duration_since(self.reset_point).as_secs_f64();
        let system_us = current_system_us.saturating_sub(self.reset_point_system_us) as f64;

        let results = PerfStatsResults {
            system_fps: if interval > 0.0 {
                self.system_frames as f64 / interval
            } else {
                0.0
            },
            frametime: if self.system_frames > 0 {
                self.accumulated_frametime.as_secs_f64() / self.system_frames as f64
            } else {
                0.0
            },
            emulation_speed: if interval > 0.0 {
                system_us / 1_000_000.0 / interval
            } else {
                0.0
            },
        };

        self.reset_point = now;
        self.reset_point_system_us = current_system_us;
        self.accumulated_frametime = Duration::ZERO;
        self.system_frames = 0;
        results
    }
}

impl Default for PerfStats {
    fn default() -> Self {
        Self::new()
    }
}

impl PerfStatsSink for PerfStats {
    fn begin_system_frame(&mut self) {
        self.begin_system_frame_at(Instant::now());
    }

    fn end_system_frame(&mut self) {
        self.end_system_frame_at(Instant::now());
    }
}

// 前端需要在渲染器持有統計的同時讀取結果
impl<T: PerfStatsSink> PerfStatsSink for Rc<RefCell<T>> {
    fn begin_system_frame(&mut self) {
        self.borrow_mut().begin_system_frame();
    }

    fn end_system_frame(&mut self) {
        self.borrow_mut().end_system_frame();
    }
}
