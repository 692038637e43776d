//! 境界ごとの型付きエラー
//!
//! 一時的な状態（フレーム取得失敗、手ごとの問い合わせ失敗、カラー画像の
//! デコード失敗）はエラーではなく `TickReport` の値として扱う。

use std::io;

use thiserror::Error;

use crate::sensor::Status;

/// センサーセッション（上流）の失敗
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("session is not initialized")]
    NotInitialized,
    #[error("stream configuration is locked after init")]
    StreamLocked,
    #[error("{operation} failed with status {status}")]
    Status { operation: &'static str, status: Status },
}

impl SensorError {
    pub fn status(operation: &'static str, status: Status) -> Self {
        Self::Status { operation, status }
    }
}

/// 座標変換の失敗
#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("calibration is unavailable (session not initialized)")]
    CalibrationUnavailable,
    #[error("invalid calibration: {0}")]
    InvalidCalibration(&'static str),
}

/// カラー画像のデコード失敗
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("unsupported pixel format {0:?}")]
    UnsupportedFormat(crate::sensor::PixelFormat),
    #[error("image has zero size ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("pitch {pitch} is smaller than one row of {width} pixels")]
    PitchTooSmall { pitch: usize, width: u32 },
    #[error("buffer holds {actual} bytes, expected {expected}")]
    Truncated { expected: usize, actual: usize },
}

/// トレースロガーの失敗
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace sink is closed")]
    Closed,
    #[error("trace logging is not active")]
    NotActive,
    #[error("trace I/O error: {0}")]
    Io(#[from] io::Error),
}

/// 起動時の失敗（常に致命的）
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to enable stream: {0}")]
    EnableStream(#[source] SensorError),
    #[error("failed to activate hand module: {0}")]
    HandModule(#[source] SensorError),
    #[error("pipeline init failed with status {0}")]
    Pipeline(Status),
    #[error("failed to get device: {0}")]
    Device(#[source] SensorError),
    #[error("failed to create projection: {0}")]
    Projection(#[from] ProjectionError),
    #[error("failed to create hand data output")]
    HandOutput,
    #[error("failed to apply hand configuration: status {0}")]
    HandConfiguration(Status),
}

/// ティック処理中の非一時的な失敗。扱いは `ErrorPolicy` で決まる
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("session has been shut down")]
    ShutDown,
    #[error("trace write failed: {0}")]
    Trace(#[from] TraceError),
}
