use crate::config::Config;
use crate::error::{InitError, ProjectionError, SensorError};
use crate::hand::HandTrackingConfig;
use crate::projection::{Point2, Point3, Projector};
use crate::sensor::{
    Device, DeviceInfo, DeviceModel, HandData, HandModule, MirrorMode, SensorSession,
    StreamProfile,
};

/// ティック処理に必要なリソースへの参照
pub(crate) struct TickParts<'a> {
    pub session: &'a mut dyn SensorSession,
    pub hand_data: &'a mut dyn HandData,
    pub projector: &'a Projector,
}

/// セッション → デバイス → 座標変換/ハンドモジュール の所有者
///
/// 解放は取得の逆順（ハンドデータ → ハンドモジュール → 座標変換 → セッション）。
/// 初期化途中の失敗でも、`Drop` で取得済みのものだけを解放する。
pub struct SessionContext {
    hand_data: Option<Box<dyn HandData>>,
    hand_module: Option<Box<dyn HandModule>>,
    projector: Option<Projector>,
    session: Box<dyn SensorSession>,
    session_disposed: bool,
    device_info: Option<DeviceInfo>,
    color_profile: StreamProfile,
    depth_profile: StreamProfile,
    hand_config: HandTrackingConfig,
}

impl SessionContext {
    /// ストリーム有効化 → init → デバイス設定 → 座標変換 → ハンドトラッキング
    pub fn initialize(session: Box<dyn SensorSession>, config: &Config) -> Result<Self, InitError> {
        let mut context = Self {
            hand_data: None,
            hand_module: None,
            projector: None,
            session,
            session_disposed: false,
            device_info: None,
            color_profile: config.stream.color_profile(),
            depth_profile: config.stream.depth_profile(),
            hand_config: HandTrackingConfig::from_config(&config.hand),
        };
        // 失敗時は context の Drop が取得済みリソースを解放する
        context.setup(config)?;
        Ok(context)
    }

    fn setup(&mut self, config: &Config) -> Result<(), InitError> {
        let session = self.session.as_mut();

        for profile in [self.color_profile, self.depth_profile] {
            session.enable_stream(profile).map_err(InitError::EnableStream)?;
            log::info!(
                "stream {:?}: {}x{} @ {}fps",
                profile.kind,
                profile.width,
                profile.height,
                profile.fps
            );
        }
        session.enable_hand_module().map_err(InitError::HandModule)?;

        // デバイスと座標変換は init() 成功後にのみ有効
        let status = session.init();
        if status.is_error() {
            return Err(InitError::Pipeline(status));
        }

        let device = session.device().map_err(InitError::Device)?;
        let info = device.info();
        log::info!("device: {} ({:?})", info.name, info.model);
        if config.device.mirror {
            device.set_mirror_mode(MirrorMode::Horizontal);
        }
        self.projector = Some(device.create_projection()?);

        let mut module = session.create_hand_module().map_err(InitError::HandModule)?;
        let output = module.create_output();
        self.hand_module = Some(module);
        self.hand_data = Some(output.ok_or(InitError::HandOutput)?);

        if info.model == DeviceModel::Ivcam {
            let device = session.device().map_err(InitError::Device)?;
            device.set_depth_confidence_threshold(config.device.depth_confidence_threshold);
            device.set_ivcam_filter_option(config.device.filter_option);
        }
        self.device_info = Some(info);

        let hand_config = self.hand_config.clone();
        self.update_hand_config(&hand_config)
    }

    /// ハンドトラッキング設定を適用する
    pub fn update_hand_config(&mut self, config: &HandTrackingConfig) -> Result<(), InitError> {
        let module = self
            .hand_module
            .as_mut()
            .ok_or(InitError::HandModule(SensorError::NotInitialized))?;

        let mut active = module.create_active_configuration();
        active.set_tracking_mode(config.tracking_mode);
        active.set_tracked_joints_enabled(config.tracked_joints_enabled);
        for (name, enabled) in &config.gestures {
            let status = active.enable_gesture(name, *enabled);
            if status.is_error() {
                log::error!("gesture '{}' rejected: {}", name, status);
                return Err(InitError::HandConfiguration(status));
            }
        }
        let status = active.apply_changes();
        if status.is_error() {
            return Err(InitError::HandConfiguration(status));
        }
        let status = active.update();
        if status.is_error() {
            return Err(InitError::HandConfiguration(status));
        }

        log::info!(
            "hand tracking: {:?}, joints={}, gestures={:?}",
            config.tracking_mode,
            config.tracked_joints_enabled,
            config.enabled_gestures().collect::<Vec<_>>()
        );
        self.hand_config = config.clone();
        Ok(())
    }

    pub fn hand_config(&self) -> &HandTrackingConfig {
        &self.hand_config
    }

    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    pub fn color_profile(&self) -> StreamProfile {
        self.color_profile
    }

    pub fn depth_profile(&self) -> StreamProfile {
        self.depth_profile
    }

    /// 初期化済みデバイス。解放後は `NotInitialized`
    pub fn device(&mut self) -> Result<&mut dyn Device, SensorError> {
        if self.session_disposed {
            return Err(SensorError::NotInitialized);
        }
        self.session.device()
    }

    pub fn is_shut_down(&self) -> bool {
        self.session_disposed
    }

    /// 現在のキャリブレーションで深度→カラー変換
    pub fn map_depth_to_color(&self, points: &[Point3]) -> Result<Vec<Point2>, ProjectionError> {
        self.projector
            .as_ref()
            .map(|p| p.map_depth_to_color(points))
            .ok_or(ProjectionError::CalibrationUnavailable)
    }

    pub(crate) fn tick_parts(&mut self) -> Option<TickParts<'_>> {
        if self.session_disposed {
            return None;
        }
        Some(TickParts {
            session: self.session.as_mut(),
            hand_data: self.hand_data.as_deref_mut()?,
            projector: self.projector.as_ref()?,
        })
    }

    /// 取得の逆順ですべて解放する。2回目以降は何もしない
    pub fn shutdown(&mut self) {
        if let Some(mut hand_data) = self.hand_data.take() {
            hand_data.dispose();
            log::debug!("hand data released");
        }
        if let Some(mut module) = self.hand_module.take() {
            module.dispose();
            log::debug!("hand module released");
        }
        if self.projector.take().is_some() {
            log::debug!("projection released");
        }
        if !self.session_disposed {
            self.session.dispose();
            self.session_disposed = true;
            log::debug!("session released");
        }
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
