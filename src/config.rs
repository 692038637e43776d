use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::hand::TrackingMode;
use crate::sensor::{StreamKind, StreamProfile};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub hand: HandConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub app: AppConfig,
}

/// ストリーム設定（初期化時に一度だけ適用）
#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    #[serde(default = "default_width")]
    pub color_width: u32,
    #[serde(default = "default_height")]
    pub color_height: u32,
    #[serde(default = "default_fps")]
    pub color_fps: u32,
    #[serde(default = "default_width")]
    pub depth_width: u32,
    #[serde(default = "default_height")]
    pub depth_height: u32,
    #[serde(default = "default_fps")]
    pub depth_fps: u32,
}

fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_fps() -> u32 { 30 }

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            color_width: default_width(),
            color_height: default_height(),
            color_fps: default_fps(),
            depth_width: default_width(),
            depth_height: default_height(),
            depth_fps: default_fps(),
        }
    }
}

impl StreamConfig {
    pub fn color_profile(&self) -> StreamProfile {
        StreamProfile::new(StreamKind::Color, self.color_width, self.color_height, self.color_fps)
    }

    pub fn depth_profile(&self) -> StreamProfile {
        StreamProfile::new(StreamKind::Depth, self.depth_width, self.depth_height, self.depth_fps)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    /// 左右反転表示
    #[serde(default = "default_mirror")]
    pub mirror: bool,
    /// IVCAMのみ: 深度信頼度の閾値
    #[serde(default = "default_depth_confidence_threshold")]
    pub depth_confidence_threshold: u16,
    /// IVCAMのみ: フィルタオプション
    #[serde(default = "default_filter_option")]
    pub filter_option: i32,
}

fn default_mirror() -> bool { true }
// SDK開発チームが最も検出しやすいとしている値
fn default_depth_confidence_threshold() -> u16 { 1 }
fn default_filter_option() -> i32 { 6 }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mirror: default_mirror(),
            depth_confidence_threshold: default_depth_confidence_threshold(),
            filter_option: default_filter_option(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HandConfig {
    #[serde(default = "default_tracking_mode")]
    pub tracking_mode: TrackingMode,
    #[serde(default = "default_tracked_joints")]
    pub tracked_joints: bool,
    /// 有効にするジェスチャー名
    #[serde(default = "default_gestures")]
    pub gestures: Vec<String>,
}

fn default_tracking_mode() -> TrackingMode { TrackingMode::FullHand }
fn default_tracked_joints() -> bool { true }
fn default_gestures() -> Vec<String> { vec!["fist".to_string()] }

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            tracking_mode: default_tracking_mode(),
            tracked_joints: default_tracked_joints(),
            gestures: default_gestures(),
        }
    }
}

/// トレース時刻の意味
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TraceClock {
    /// 前回の書き込みからの経過時間
    SincePreviousWrite,
    /// ロギング開始からの累積時間（書き込み中は停止）
    SinceActivation,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TraceConfig {
    /// 保存先ディレクトリ名（base_dir 直下）
    #[serde(default = "default_trace_directory")]
    pub directory: String,
    /// 未指定ならドキュメントフォルダ
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    /// 起動時にロギングを開始する
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_trace_clock")]
    pub clock: TraceClock,
}

fn default_trace_directory() -> String { "RS".to_string() }
fn default_trace_clock() -> TraceClock { TraceClock::SincePreviousWrite }

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            directory: default_trace_directory(),
            base_dir: None,
            enabled: false,
            clock: default_trace_clock(),
        }
    }
}

impl TraceConfig {
    /// トレースファイルを置くディレクトリ
    pub fn output_dir(&self) -> PathBuf {
        let base = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => directories::UserDirs::new()
                .and_then(|d| {
                    d.document_dir()
                        .map(Path::to_path_buf)
                        .or_else(|| Some(d.home_dir().to_path_buf()))
                })
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        base.join(&self.directory)
    }
}

/// 致命的でないティックエラーの扱い
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// ログを出して終了する
    Terminate,
    /// ログを出して次のティックへ進む
    Continue,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    #[serde(default = "default_error_policy")]
    pub error_policy: ErrorPolicy,
    /// キャリブレーションJSON（未指定なら公称値）
    #[serde(default)]
    pub calibration_path: Option<String>,
    /// ヘッドレス実行時のティック数
    #[serde(default)]
    pub max_ticks: Option<u64>,
}

fn default_target_fps() -> u32 { 60 }
fn default_error_policy() -> ErrorPolicy { ErrorPolicy::Terminate }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            error_policy: default_error_policy(),
            calibration_path: None,
            max_ticks: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 読み込めなければデフォルト設定
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.stream.color_width, 640);
        assert_eq!(config.stream.depth_fps, 30);
        assert!(config.device.mirror);
        assert_eq!(config.device.depth_confidence_threshold, 1);
        assert_eq!(config.device.filter_option, 6);
        assert_eq!(config.hand.gestures, vec!["fist".to_string()]);
        assert_eq!(config.trace.directory, "RS");
        assert_eq!(config.trace.clock, TraceClock::SincePreviousWrite);
        assert_eq!(config.app.error_policy, ErrorPolicy::Terminate);
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [stream]
            color_width = 1280
            color_height = 720

            [hand]
            tracking_mode = "extremities"
            gestures = ["fist", "v_sign"]

            [trace]
            clock = "since_activation"

            [app]
            error_policy = "continue"
            "#,
        )
        .unwrap();
        assert_eq!(config.stream.color_profile(), StreamProfile::new(StreamKind::Color, 1280, 720, 30));
        assert_eq!(config.stream.depth_width, 640);
        assert_eq!(config.hand.tracking_mode, TrackingMode::Extremities);
        assert_eq!(config.hand.gestures.len(), 2);
        assert_eq!(config.trace.clock, TraceClock::SinceActivation);
        assert_eq!(config.app.error_policy, ErrorPolicy::Continue);
        assert_eq!(config.app.target_fps, 60);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/handsense.toml");
        assert_eq!(config.stream.color_height, 480);
    }

    #[test]
    fn test_trace_output_dir_with_base() {
        let trace = TraceConfig {
            base_dir: Some(PathBuf::from("/tmp/docs")),
            ..TraceConfig::default()
        };
        assert_eq!(trace.output_dir(), PathBuf::from("/tmp/docs/RS"));
    }
}
