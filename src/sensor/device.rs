use crate::error::ProjectionError;
use crate::projection::{Calibration, Projector};

/// デバイス機種
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceModel {
    /// RealSense F200系 (IVCAM)
    Ivcam,
    /// RealSense R200系
    Ds4,
    Generic,
}

/// デバイス情報
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub name: String,
    pub model: DeviceModel,
}

/// ミラー表示モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorMode {
    #[default]
    Disabled,
    Horizontal,
    Vertical,
}

/// キャリブレーションとモード設定を持つデバイス
///
/// `SensorSession::init()` 成功後にのみ取得できる。
pub trait Device {
    fn info(&self) -> DeviceInfo;

    fn mirror_mode(&self) -> MirrorMode;
    fn set_mirror_mode(&mut self, mode: MirrorMode);

    fn depth_confidence_threshold(&self) -> u16;
    fn set_depth_confidence_threshold(&mut self, threshold: u16);

    fn ivcam_filter_option(&self) -> i32;
    fn set_ivcam_filter_option(&mut self, option: i32);

    /// 現在のキャリブレーション。初期化前は None
    fn calibration(&self) -> Option<Calibration>;

    /// 深度→カラー座標変換オブジェクトを作成
    fn create_projection(&self) -> Result<Projector, ProjectionError> {
        let calibration = self
            .calibration()
            .ok_or(ProjectionError::CalibrationUnavailable)?;
        Projector::new(calibration)
    }
}
