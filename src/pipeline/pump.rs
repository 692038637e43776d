use std::time::{Duration, Instant};

/// 表示リフレッシュ相当の周期でティックを刻む
///
/// 処理が周期を超えた場合は遅れを取り戻さず、次の周期から数え直す。
pub struct FramePump {
    period: Duration,
    last: Option<Instant>,
}

impl FramePump {
    pub fn new(target_fps: u32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / target_fps.max(1) as f64),
            last: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 前回の呼び出しから1周期経つまで待つ。初回は待たない
    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            let remaining = self.period.saturating_sub(last.elapsed());
            if !remaining.is_zero() {
                std::thread::sleep(remaining);
            }
        }
        self.last = Some(Instant::now());
    }
}

/// 1秒ごとのフレームレート計測
pub struct RateCounter {
    frames: u32,
    timer: Instant,
}

impl RateCounter {
    pub fn new() -> Self {
        Self {
            frames: 0,
            timer: Instant::now(),
        }
    }

    /// 1フレーム数える。1秒経過していればFPSを返してリセット
    pub fn tick(&mut self) -> Option<f32> {
        self.frames += 1;
        let elapsed = self.timer.elapsed().as_secs_f32();
        if elapsed < 1.0 {
            return None;
        }
        let fps = self.frames as f32 / elapsed;
        self.frames = 0;
        self.timer = Instant::now();
        Some(fps)
    }
}

impl Default for RateCounter {
    fn default() -> Self {
        Self::new()
    }
}
