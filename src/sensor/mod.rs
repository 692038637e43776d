//! 深度カメラSDKとの境界
//!
//! セッション、デバイス、ハンドモジュールはここで定義するトレイトの背後にある。
//! 実機ドライバは含まず、`synthetic` がデモとテスト用の実装を提供する。

pub mod device;
pub mod frame;
pub mod status;
pub mod synthetic;

pub use device::{Device, DeviceInfo, DeviceModel, MirrorMode};
pub use frame::{ColorImage, DepthImage, Frame, PixelFormat, StreamKind, StreamProfile};
pub use status::Status;
pub use synthetic::{ColorSample, ScriptedHand, ScriptedTick, SessionProbe, SyntheticSession};

use crate::error::SensorError;
use crate::hand::{AccessOrder, GestureData, HandSnapshot, TrackingMode};

/// センサーパイプライン全体へのハンドル
///
/// ストリーム有効化 → `init()` の順で呼ぶ。デバイスとハンドモジュールは
/// `init()` 成功後にのみ有効。
pub trait SensorSession {
    fn enable_stream(&mut self, profile: StreamProfile) -> Result<(), SensorError>;

    /// ハンドトラッキングを有効化（`init()` 前に呼ぶ）
    fn enable_hand_module(&mut self) -> Result<(), SensorError>;

    fn init(&mut self) -> Status;

    fn device(&mut self) -> Result<&mut dyn Device, SensorError>;

    fn create_hand_module(&mut self) -> Result<Box<dyn HandModule>, SensorError>;

    /// 有効な全ストリームが揃うまで待ってフレームを取得
    fn acquire_frame(&mut self, blocking: bool) -> Status;

    /// 取得済みフレームのサンプル
    fn sample(&self) -> Option<&Frame>;

    fn release_frame(&mut self);

    fn dispose(&mut self);
}

/// ハンドトラッキングモジュール
pub trait HandModule {
    fn create_output(&mut self) -> Option<Box<dyn HandData>>;

    fn create_active_configuration(&mut self) -> Box<dyn HandConfiguration>;

    fn dispose(&mut self);
}

/// ハンドトラッキング設定の変更インタフェース
pub trait HandConfiguration {
    fn set_tracking_mode(&mut self, mode: TrackingMode);
    fn set_tracked_joints_enabled(&mut self, enabled: bool);
    fn enable_gesture(&mut self, name: &str, enabled: bool) -> Status;
    fn apply_changes(&mut self) -> Status;
    fn update(&mut self) -> Status;
}

/// ティックごとの手データのスナップショット
pub trait HandData {
    /// 現在のフレームで内容を更新する。問い合わせ前に1ティック1回呼ぶ
    fn update(&mut self) -> Status;

    fn number_of_hands(&self) -> usize;

    fn query_hand_data(&self, order: AccessOrder, index: usize) -> Result<HandSnapshot, Status>;

    /// 直近の `update()` 時点でジェスチャーが発火していれば付随データを返す
    fn is_gesture_fired(&self, name: &str) -> Option<GestureData>;

    fn dispose(&mut self);
}
