// 幀率限制 - 依模擬時間軸與實際時間的差距決定睡眠長度

use std::time::{Duration, Instant};

pub trait FrameLimiting {
    /// current_system_time_us 必須單調遞增
    fn do_frame_limiting(&mut self, current_system_time_us: u64);
}

#[derive(Debug)]
pub struct FrameLimiter {
    pub use_frame_limit: bool,
    pub frame_limit: u16, // 百分比，100 = 全速
    previous_system_time_us: u64,
    previous_walltime: Instant,
    frame_limiting_delta_err: i64, // 微秒
}

impl FrameLimiter {
    pub fn new(use_frame_limit: bool, frame_limit: u16) -> Self {
        Self::starting_at(use_frame_limit, frame_limit, Instant::now())
    }

    pub fn starting_at(use_frame_limit: bool, frame_limit: u16, now: Instant) -> Self {
        FrameLimiter {
            use_frame_limit,
            frame_limit,
            previous_system_time_us: 0,
            previous_walltime: now,
            frame_limiting_delta_err: 0,
        }
    }

    fn enabled(&self) -> bool {
        self.use_frame_limit && self.frame_limit > 0
    }

    /// 計算這一幀需要睡多久，並更新內部狀態（不實際睡眠）
    pub fn compute_sleep(&mut self, current_system_time_us: u64, now: Instant) -> Duration {
        if !self.enabled() {
            self.previous_system_time_us = current_system_time_us;
            self.previous_walltime = now;
            return Duration::ZERO;
        }

        let sleep_scale = self.frame_limit as f64 / 100.0;
        // 慢幀造成的最大落後量
        let max_lag_time_us = (25_000.0 / sleep_scale) as i64;

        let system_delta =
            current_system_time_us.saturating_sub(self.previous_system_time_us) as f64;
        self.frame_limiting_delta_err += (system_delta / sleep_scale) as i64;
        self.frame_limiting_delta_err -=
            now.saturating_duration_since(self.previous_walltime).as_micros() as i64;
        self.frame_limiting_delta_err = self
            .frame_limiting_delta_err
            .clamp(-max_lag_time_us, max_lag_time_us);

        self.previous_system_time_us = current_system_time_us;
        self.previous_walltime = now;

        if self.frame_limiting_delta_err > 0 {
            Duration::from_micros(self.frame_limiting_delta_err as u64)
        } else {
            Duration::ZERO
        }
    }
}

impl FrameLimiting for FrameLimiter {
    fn do_frame_limiting(&mut self, current_system_time_us: u64) {
        let now = Instant::now();
        let sleep = self.compute_sleep(current_system_time_us, now);
        if sleep.is_zero() {
            return;
        }
        std::thread::sleep(sleep);
        let after = Instant::now();
        self.frame_limiting_delta_err -= after.saturating_duration_since(now).as_micros() as i64;
        self.previous_walltime = after;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleeps_when_emulation_runs_ahead() {
        let t0 = Instant::now();
        let mut limiter = FrameLimiter::starting_at(true, 100, t0);
        // 模擬了 16.667ms，實際只過 5ms
        let sleep = limiter.compute_sleep(16_667, t0 + Duration::from_millis(5));
        assert_eq!(sleep, Duration::from_micros(11_667));
    }

    #[test]
    fn test_no_sleep_when_behind() {
        let t0 = Instant::now();
        let mut limiter = FrameLimiter::starting_at(true, 100, t0);
        let sleep = limiter.compute_sleep(16_667, t0 + Duration::from_millis(40));
        assert_eq!(sleep, Duration::ZERO);
        // 仍在追趕
        let sleep = limiter.compute_sleep(33_334, t0 + Duration::from_millis(45));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn test_lag_is_clamped() {
        let t0 = Instant::now();
        let mut limiter = FrameLimiter::starting_at(true, 100, t0);
        limiter.compute_sleep(16_667, t0 + Duration::from_secs(1));
        // 落後被限制為 -25ms，下一幀快 30ms 就會睡 5ms
        let sleep = limiter.compute_sleep(16_667 + 30_000, t0 + Duration::from_secs(1));
        assert_eq!(sleep, Duration::from_micros(5_000));
    }

    #[test]
    fn test_half_speed_doubles_sleep() {
        let t0 = Instant::now();
        let mut limiter = FrameLimiter::starting_at(true, 50, t0);
        let sleep = limiter.compute_sleep(10_000, t0);
        assert_eq!(sleep, Duration::from_micros(20_000));
    }

    #[test]
    fn test_disabled_never_sleeps() {
        let t0 = Instant::now();
        let mut limiter = FrameLimiter::starting_at(false, 100, t0);
        assert_eq!(limiter.compute_sleep(1_000_000, t0), Duration::ZERO);
        let mut unlimited = FrameLimiter::starting_at(true, 0, t0);
        assert_eq!(unlimited.compute_sleep(1_000_000, t0), Duration::ZERO);
    }
}
