//! 変換座標のCSVトレース
//!
//! 1行 = 1関節: `elapsed,colorX,colorY,depthX,depthY,depthZ`（ヘッダなし）。
//! ファイル名はセッション開始時刻 `YYYYMMDDHHmm.csv`。

use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{TraceClock, TraceConfig};
use crate::error::TraceError;
use crate::projection::{Point2, Point3};

/// 停止・再開できる経過時間計測
#[derive(Debug, Default)]
pub struct Stopwatch {
    accumulated: Duration,
    started: Option<Instant>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.accumulated += started.elapsed();
        }
    }

    /// 停止して0に戻す
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.started = None;
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.accumulated + self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }
}

/// `[d.]hh:mm:ss[.fffffff]` 形式（小数部は0なら省略）
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let days = total_secs / 86_400;
    let hours = (total_secs / 3600) % 24;
    let minutes = (total_secs / 60) % 60;
    let seconds = total_secs % 60;
    // 100ns 単位
    let ticks = elapsed.subsec_nanos() / 100;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{}.", days));
    }
    out.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if ticks > 0 {
        out.push_str(&format!(".{:07}", ticks));
    }
    out
}

/// トレースの1行
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceRecord {
    pub elapsed: Duration,
    pub color: Point2,
    pub depth: Point3,
}

impl TraceRecord {
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            format_elapsed(self.elapsed),
            self.color.x,
            self.color.y,
            self.depth.x,
            self.depth.y,
            self.depth.z
        )
    }
}

/// セッション開始時刻からファイル名を作る
pub fn trace_file_name(started_at: &DateTime<Local>) -> String {
    format!("{}.csv", started_at.format("%Y%m%d%H%M"))
}

/// 同じ分に2つ目以降のファイルを開くときの名前
fn numbered_file_name(started_at: &DateTime<Local>, seq: u32) -> String {
    format!("{}_{}.csv", started_at.format("%Y%m%d%H%M"), seq)
}

struct ActiveSink {
    writer: BufWriter<File>,
    path: PathBuf,
    clock: Stopwatch,
}

enum SinkState {
    Inactive,
    Active(ActiveSink),
    Closed,
}

/// トグルで開始するCSVトレースロガー
///
/// `close()` 後は書き込みも再開始もできない。
pub struct TraceLogger {
    dir: PathBuf,
    session_start: DateTime<Local>,
    clock_mode: TraceClock,
    state: SinkState,
    /// このロガーが開いたファイル
    opened: Vec<PathBuf>,
    rows: u64,
}

impl TraceLogger {
    pub fn new(config: &TraceConfig, session_start: DateTime<Local>) -> Self {
        Self::with_dir(config.output_dir(), config.clock, session_start)
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P, clock_mode: TraceClock, session_start: DateTime<Local>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            session_start,
            clock_mode,
            state: SinkState::Inactive,
            opened: Vec::new(),
            rows: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SinkState::Active(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SinkState::Closed)
    }

    /// 書き込み中のファイル
    pub fn path(&self) -> Option<&Path> {
        match &self.state {
            SinkState::Active(sink) => Some(&sink.path),
            _ => None,
        }
    }

    /// これまでに書いた行数
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// ロギングを開始する。既に開始済みなら何もせず false
    ///
    /// 初回はセッション開始時刻、再開時はその時点の時刻でファイル名を決める。
    /// このロガーが既に書いたファイルと同名になる場合は `_2`, `_3` ... を付ける。
    pub fn activate(&mut self) -> Result<bool, TraceError> {
        match self.state {
            SinkState::Closed => return Err(TraceError::Closed),
            SinkState::Active(_) => return Ok(false),
            SinkState::Inactive => {}
        }

        let stamp = if self.opened.is_empty() { self.session_start } else { Local::now() };
        fs::create_dir_all(&self.dir)?;
        let mut path = self.dir.join(trace_file_name(&stamp));
        let mut seq = 1;
        while self.opened.contains(&path) {
            seq += 1;
            path = self.dir.join(numbered_file_name(&stamp, seq));
        }
        let file = File::create(&path)?;

        let mut clock = Stopwatch::new();
        clock.start();
        log::info!("trace logging to {}", path.display());
        self.state = SinkState::Active(ActiveSink {
            writer: BufWriter::new(file),
            path: path.clone(),
            clock,
        });
        self.opened.push(path);
        Ok(true)
    }

    /// ロギングを止めてファイルを閉じる。再度 `activate()` できる
    pub fn deactivate(&mut self) -> Result<(), TraceError> {
        match std::mem::replace(&mut self.state, SinkState::Inactive) {
            SinkState::Active(sink) => finish(sink),
            SinkState::Inactive => Ok(()),
            SinkState::Closed => {
                self.state = SinkState::Closed;
                Err(TraceError::Closed)
            }
        }
    }

    /// トグル操作
    pub fn set_active(&mut self, active: bool) -> Result<(), TraceError> {
        if active {
            self.activate().map(|_| ())
        } else {
            self.deactivate()
        }
    }

    /// 1関節分を書き込む
    ///
    /// 書き込み前に時計を止め、書き込み後に再開する。
    pub fn append(&mut self, color: Point2, depth: Point3) -> Result<TraceRecord, TraceError> {
        let sink = match &mut self.state {
            SinkState::Active(sink) => sink,
            SinkState::Inactive => return Err(TraceError::NotActive),
            SinkState::Closed => return Err(TraceError::Closed),
        };

        sink.clock.stop();
        let record = TraceRecord {
            elapsed: sink.clock.elapsed(),
            color,
            depth,
        };
        let result = writeln!(sink.writer, "{}", record.to_csv_line());
        if self.clock_mode == TraceClock::SincePreviousWrite {
            sink.clock.reset();
        }
        sink.clock.start();
        result?;

        self.rows += 1;
        Ok(record)
    }

    /// 終了時に一度だけ呼ぶ。2回目以降は何もしない
    pub fn close(&mut self) -> Result<(), TraceError> {
        match std::mem::replace(&mut self.state, SinkState::Closed) {
            SinkState::Active(sink) => finish(sink),
            _ => Ok(()),
        }
    }
}

fn finish(mut sink: ActiveSink) -> Result<(), TraceError> {
    sink.clock.stop();
    sink.writer.flush()?;
    log::info!("trace file closed: {}", sink.path.display());
    Ok(())
}

impl Drop for TraceLogger {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("failed to close trace file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2015, 7, 4, 9, 5, 33).unwrap()
    }

    fn logger(dir: &Path, mode: TraceClock) -> TraceLogger {
        TraceLogger::with_dir(dir.join("RS"), mode, start_time())
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "00:00:01.5000000");
        assert_eq!(format_elapsed(Duration::from_nanos(1_234_567_800)), "00:00:01.2345678");
        assert_eq!(format_elapsed(Duration::from_secs(3723)), "01:02:03");
        assert_eq!(format_elapsed(Duration::from_secs(90_000)), "1.01:00:00");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(trace_file_name(&start_time()), "201507040905.csv");
    }

    #[test]
    fn test_csv_line() {
        let record = TraceRecord {
            elapsed: Duration::from_millis(250),
            color: Point2::new(320.5, 240.0),
            depth: Point3::new(300.0, 200.25, 450.0),
        };
        assert_eq!(record.to_csv_line(), "00:00:00.2500000,320.5,240,300,200.25,450");
    }

    #[test]
    fn test_stopwatch_pauses() {
        let mut sw = Stopwatch::new();
        sw.start();
        std::thread::sleep(Duration::from_millis(5));
        sw.stop();
        let paused = sw.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(sw.elapsed(), paused);
        assert!(paused >= Duration::from_millis(5));

        sw.reset();
        assert_eq!(sw.elapsed(), Duration::ZERO);
        assert!(!sw.is_running());
    }

    #[test]
    fn test_activate_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = logger(dir.path(), TraceClock::SincePreviousWrite);
        assert!(trace.activate().unwrap());
        let path = trace.path().unwrap().to_path_buf();
        assert_eq!(path, dir.path().join("RS").join("201507040905.csv"));
        assert!(path.exists());
    }

    #[test]
    fn test_activate_twice_does_not_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = logger(dir.path(), TraceClock::SincePreviousWrite);
        trace.activate().unwrap();
        trace.append(Point2::new(1.0, 2.0), Point3::new(3.0, 4.0, 5.0)).unwrap();
        assert!(!trace.activate().unwrap());
        trace.append(Point2::new(1.0, 2.0), Point3::new(3.0, 4.0, 5.0)).unwrap();
        let path = trace.path().unwrap().to_path_buf();
        trace.close().unwrap();
        assert_eq!(read_lines(&path).len(), 2);
    }

    #[test]
    fn test_rows_have_six_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = logger(dir.path(), TraceClock::SincePreviousWrite);
        trace.activate().unwrap();
        for i in 0..3 {
            let record = trace
                .append(Point2::new(i as f32, 0.0), Point3::new(0.0, 0.0, 400.0))
                .unwrap();
            assert!(record.elapsed >= Duration::ZERO);
        }
        let path = trace.path().unwrap().to_path_buf();
        trace.close().unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 3);
        for line in &lines {
            assert_eq!(line.split(',').count(), 6);
            assert!(line.ends_with(",0,0,400"));
        }
        assert_eq!(trace.rows_written(), 3);
    }

    #[test]
    fn test_since_activation_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = logger(dir.path(), TraceClock::SinceActivation);
        trace.activate().unwrap();
        let a = trace.append(Point2::default(), Point3::default()).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        let b = trace.append(Point2::default(), Point3::default()).unwrap();
        assert!(b.elapsed >= a.elapsed + Duration::from_millis(2));
    }

    #[test]
    fn test_since_previous_write_resets() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = logger(dir.path(), TraceClock::SincePreviousWrite);
        trace.activate().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let a = trace.append(Point2::default(), Point3::default()).unwrap();
        let b = trace.append(Point2::default(), Point3::default()).unwrap();
        assert!(a.elapsed >= Duration::from_millis(20));
        assert!(b.elapsed < a.elapsed);
    }

    #[test]
    fn test_write_after_close_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = logger(dir.path(), TraceClock::SincePreviousWrite);
        trace.activate().unwrap();
        trace.close().unwrap();
        trace.close().unwrap();
        assert!(matches!(
            trace.append(Point2::default(), Point3::default()),
            Err(TraceError::Closed)
        ));
        assert!(matches!(trace.activate(), Err(TraceError::Closed)));
        assert!(trace.is_closed());
    }

    #[test]
    fn test_write_while_inactive_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = logger(dir.path(), TraceClock::SincePreviousWrite);
        assert!(matches!(
            trace.append(Point2::default(), Point3::default()),
            Err(TraceError::NotActive)
        ));
    }

    #[test]
    fn test_deactivate_then_reactivate() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = logger(dir.path(), TraceClock::SincePreviousWrite);
        trace.set_active(true).unwrap();
        trace.append(Point2::default(), Point3::default()).unwrap();
        trace.set_active(false).unwrap();
        assert!(!trace.is_active());
        assert!(dir.path().join("RS").join("201507040905.csv").exists());

        // 再開時は現在時刻のファイル名
        trace.set_active(true).unwrap();
        let name = trace.path().unwrap().file_name().unwrap().to_str().unwrap().to_string();
        assert_ne!(name, "201507040905.csv");
        assert_eq!(name.len(), "YYYYMMDDHHmm.csv".len());
    }

    #[test]
    fn test_reactivate_in_same_minute_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut trace = TraceLogger::with_dir(dir.path(), TraceClock::SincePreviousWrite, Local::now());
        trace.activate().unwrap();
        for _ in 0..3 {
            trace.append(Point2::default(), Point3::default()).unwrap();
        }
        let first = trace.path().unwrap().to_path_buf();
        trace.deactivate().unwrap();

        trace.activate().unwrap();
        let second = trace.path().unwrap().to_path_buf();
        assert_ne!(first, second);
        assert_eq!(read_lines(&first).len(), 3);
        trace.close().unwrap();
    }

    #[test]
    fn test_numbered_file_name() {
        assert_eq!(numbered_file_name(&start_time(), 2), "201507040905_2.csv");
    }
}
