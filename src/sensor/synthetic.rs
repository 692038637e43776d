//! 実機なしで動くセンサー実装
//!
//! 2つのモードを持つ:
//! - スクリプト: `ScriptedTick` の列を1フレームずつ再生する（テスト用）
//! - アニメーション: 開閉しながら動く左右の手を生成する（デモ用）

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

use crate::error::SensorError;
use crate::hand::{
    AccessOrder, BodySide, GestureData, HandSnapshot, JointData, JointType, TrackingMode,
};
use crate::projection::{Calibration, Point2, Point3};
use crate::sensor::{
    ColorImage, DepthImage, Device, DeviceInfo, DeviceModel, Frame, HandConfiguration, HandData,
    HandModule, MirrorMode, PixelFormat, SensorSession, Status, StreamKind, StreamProfile,
};

/// SDKが認識するジェスチャー名
const KNOWN_GESTURES: [&str; 8] = [
    "fist",
    "spreadfingers",
    "v_sign",
    "thumb_up",
    "thumb_down",
    "tap",
    "wave",
    "full_pinch",
];

/// 1フレーム分のカラーサンプルの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSample {
    #[default]
    Generated,
    /// サンプルなし
    Missing,
    /// バッファが途中で切れている
    Truncated,
    /// 未対応フォーマット
    Depth16,
}

/// スクリプト中の1つの手
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedHand {
    pub query: Result<HandSnapshot, Status>,
}

impl ScriptedHand {
    /// 画像中央付近にある手
    pub fn open(id: i32, side: BodySide, openness: i32) -> Self {
        Self::at(id, side, openness, Point2::new(320.0, 240.0), 0.5)
    }

    /// 深度画像上の位置 center、距離 z (m) にある手
    pub fn at(id: i32, side: BodySide, openness: i32, center: Point2, z: f32) -> Self {
        Self {
            query: Ok(HandSnapshot {
                unique_id: id,
                body_side: side,
                openness,
                tracked_joints: hand_joints(center, z, openness),
            }),
        }
    }

    /// 問い合わせが失敗する手
    pub fn failing(_id: i32, status: Status) -> Self {
        Self { query: Err(status) }
    }

    /// 指先関節を取り除く
    pub fn without_fingertips(mut self) -> Self {
        if let Ok(snapshot) = &mut self.query {
            snapshot.tracked_joints.retain(|joint, _| !joint.is_fingertip());
        }
        self
    }

    /// 関節を差し替える
    pub fn with_joint(mut self, joint: JointType, data: JointData) -> Self {
        if let Ok(snapshot) = &mut self.query {
            snapshot.tracked_joints.insert(joint, data);
        }
        self
    }
}

/// スクリプトの1フレーム
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedTick {
    /// `acquire_frame` が返すステータス
    pub acquire: Status,
    pub color: ColorSample,
    pub hands: Vec<ScriptedHand>,
    /// 発火するジェスチャー名
    pub fired: Vec<String>,
    /// `HandData::update` が返すステータス
    pub hand_update: Status,
}

impl ScriptedTick {
    pub fn with_hands(hands: Vec<ScriptedHand>) -> Self {
        Self {
            hands,
            ..Self::default()
        }
    }

    pub fn acquire_failed(status: Status) -> Self {
        Self {
            acquire: status,
            ..Self::default()
        }
    }
}

enum TickSource {
    Script(VecDeque<ScriptedTick>),
    Animated,
}

/// セッション・ハンドモジュール・ハンドデータが共有する状態（単一スレッド）
pub struct SyntheticState {
    source: TickSource,
    current: ScriptedTick,
    frame_number: u64,
    /// None なら全ジェスチャーを通す（設定未適用）
    enabled_gestures: Option<BTreeSet<String>>,
    tracking_mode: TrackingMode,
    counters: SessionCounters,
}

impl SyntheticState {
    pub fn scripted(ticks: Vec<ScriptedTick>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::with_source(TickSource::Script(ticks.into()))))
    }

    pub fn animated() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::with_source(TickSource::Animated)))
    }

    fn with_source(source: TickSource) -> Self {
        Self {
            source,
            current: ScriptedTick::default(),
            frame_number: 0,
            enabled_gestures: None,
            tracking_mode: TrackingMode::FullHand,
            counters: SessionCounters::default(),
        }
    }

    /// 次のフレームへ進む。スクリプトが尽きたら空のシーン
    pub fn advance(&mut self) {
        self.frame_number += 1;
        self.current = match &mut self.source {
            TickSource::Script(ticks) => ticks.pop_front().unwrap_or_default(),
            TickSource::Animated => animated_tick(self.frame_number),
        };
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }
}

/// 呼び出し回数と解放順の記録
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionCounters {
    pub acquires: u32,
    pub releases: u32,
    pub disposals: Vec<&'static str>,
}

/// セッションをコンテキストに渡した後も呼び出し回数を観測するためのハンドル
#[derive(Clone)]
pub struct SessionProbe {
    state: Rc<RefCell<SyntheticState>>,
}

impl SessionProbe {
    pub fn counters(&self) -> SessionCounters {
        self.state.borrow().counters.clone()
    }

    pub fn enabled_gestures(&self) -> Option<BTreeSet<String>> {
        self.state.borrow().enabled_gestures.clone()
    }

    pub fn tracking_mode(&self) -> TrackingMode {
        self.state.borrow().tracking_mode
    }
}

/// 合成デバイス
pub struct SyntheticDevice {
    info: DeviceInfo,
    mirror: MirrorMode,
    depth_confidence_threshold: u16,
    ivcam_filter_option: i32,
    calibration: Option<Calibration>,
}

impl Device for SyntheticDevice {
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn mirror_mode(&self) -> MirrorMode {
        self.mirror
    }

    fn set_mirror_mode(&mut self, mode: MirrorMode) {
        self.mirror = mode;
    }

    fn depth_confidence_threshold(&self) -> u16 {
        self.depth_confidence_threshold
    }

    fn set_depth_confidence_threshold(&mut self, threshold: u16) {
        self.depth_confidence_threshold = threshold;
    }

    fn ivcam_filter_option(&self) -> i32 {
        self.ivcam_filter_option
    }

    fn set_ivcam_filter_option(&mut self, option: i32) {
        self.ivcam_filter_option = option;
    }

    fn calibration(&self) -> Option<Calibration> {
        self.calibration
    }
}

/// 合成センサーセッション
pub struct SyntheticSession {
    state: Rc<RefCell<SyntheticState>>,
    profiles: Vec<StreamProfile>,
    hand_module_enabled: bool,
    initialized: bool,
    disposed: bool,
    init_status: Status,
    hand_output_available: bool,
    calibration: Option<Calibration>,
    device: SyntheticDevice,
    frame: Option<Frame>,
}

impl SyntheticSession {
    pub fn scripted(ticks: Vec<ScriptedTick>) -> Self {
        Self::with_state(SyntheticState::scripted(ticks))
    }

    pub fn animated() -> Self {
        Self::with_state(SyntheticState::animated())
    }

    fn with_state(state: Rc<RefCell<SyntheticState>>) -> Self {
        Self {
            state,
            profiles: Vec::new(),
            hand_module_enabled: false,
            initialized: false,
            disposed: false,
            init_status: Status::NO_ERROR,
            hand_output_available: true,
            calibration: None,
            device: SyntheticDevice {
                info: DeviceInfo {
                    name: "Synthetic Depth Camera".to_string(),
                    model: DeviceModel::Ivcam,
                },
                mirror: MirrorMode::Disabled,
                depth_confidence_threshold: 3,
                ivcam_filter_option: 5,
                calibration: None,
            },
            frame: None,
        }
    }

    /// `init()` が返すステータスを固定する
    pub fn with_init_status(mut self, status: Status) -> Self {
        self.init_status = status;
        self
    }

    pub fn with_model(mut self, model: DeviceModel) -> Self {
        self.device.info.model = model;
        self
    }

    /// 公称値の代わりに使うキャリブレーション
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = Some(calibration);
        self
    }

    /// ハンドデータの作成を失敗させる
    pub fn without_hand_output(mut self) -> Self {
        self.hand_output_available = false;
        self
    }

    pub fn probe(&self) -> SessionProbe {
        SessionProbe {
            state: self.state.clone(),
        }
    }

    fn profile(&self, kind: StreamKind) -> Option<StreamProfile> {
        self.profiles.iter().find(|p| p.kind == kind).copied()
    }
}

impl SensorSession for SyntheticSession {
    fn enable_stream(&mut self, profile: StreamProfile) -> Result<(), SensorError> {
        if self.initialized {
            return Err(SensorError::StreamLocked);
        }
        if profile.width == 0 || profile.height == 0 || profile.fps == 0 {
            return Err(SensorError::status("enable_stream", Status::PARAM_UNSUPPORTED));
        }
        self.profiles.retain(|p| p.kind != profile.kind);
        self.profiles.push(profile);
        Ok(())
    }

    fn enable_hand_module(&mut self) -> Result<(), SensorError> {
        if self.initialized {
            return Err(SensorError::StreamLocked);
        }
        self.hand_module_enabled = true;
        Ok(())
    }

    fn init(&mut self) -> Status {
        if self.init_status.is_error() {
            return self.init_status;
        }
        let (color, depth) = match (self.profile(StreamKind::Color), self.profile(StreamKind::Depth)) {
            (Some(c), Some(d)) => (c, d),
            _ => return Status::INIT_FAILED,
        };
        self.device.calibration = Some(self.calibration.unwrap_or_else(|| {
            Calibration::nominal(color.width, color.height, depth.width, depth.height)
        }));
        self.initialized = true;
        self.init_status
    }

    fn device(&mut self) -> Result<&mut dyn Device, SensorError> {
        if !self.initialized {
            return Err(SensorError::NotInitialized);
        }
        Ok(&mut self.device)
    }

    fn create_hand_module(&mut self) -> Result<Box<dyn HandModule>, SensorError> {
        if !self.initialized {
            return Err(SensorError::NotInitialized);
        }
        if !self.hand_module_enabled {
            return Err(SensorError::status("create_hand_module", Status::FEATURE_UNSUPPORTED));
        }
        Ok(Box::new(SyntheticHandModule {
            state: self.state.clone(),
            output_available: self.hand_output_available,
            disposed: false,
        }))
    }

    fn acquire_frame(&mut self, _blocking: bool) -> Status {
        if !self.initialized {
            return Status::NOT_INITIALIZED;
        }
        if self.frame.is_some() {
            return Status::EXEC_INPROGRESS;
        }

        let (tick, frame_number) = {
            let mut state = self.state.borrow_mut();
            state.advance();
            state.counters.acquires += 1;
            (state.current.clone(), state.frame_number)
        };
        if tick.acquire.is_error() {
            return tick.acquire;
        }

        let color = self
            .profile(StreamKind::Color)
            .and_then(|p| color_image(p, frame_number, tick.color));
        let depth = self.profile(StreamKind::Depth).map(depth_image);
        self.frame = Some(Frame { color, depth });
        tick.acquire
    }

    fn sample(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    fn release_frame(&mut self) {
        self.frame = None;
        self.state.borrow_mut().counters.releases += 1;
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.initialized = false;
        self.frame = None;
        self.device.calibration = None;
        self.state.borrow_mut().counters.disposals.push("session");
    }
}

struct SyntheticHandModule {
    state: Rc<RefCell<SyntheticState>>,
    output_available: bool,
    disposed: bool,
}

impl HandModule for SyntheticHandModule {
    fn create_output(&mut self) -> Option<Box<dyn HandData>> {
        if !self.output_available {
            return None;
        }
        Some(Box::new(SyntheticHandData::new(self.state.clone())))
    }

    fn create_active_configuration(&mut self) -> Box<dyn HandConfiguration> {
        let state = self.state.borrow();
        Box::new(SyntheticHandConfiguration {
            state: self.state.clone(),
            tracking_mode: state.tracking_mode,
            gestures: state.enabled_gestures.clone().unwrap_or_default(),
            applied: false,
        })
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.state.borrow_mut().counters.disposals.push("hand_module");
    }
}

struct SyntheticHandConfiguration {
    state: Rc<RefCell<SyntheticState>>,
    tracking_mode: TrackingMode,
    gestures: BTreeSet<String>,
    applied: bool,
}

impl HandConfiguration for SyntheticHandConfiguration {
    fn set_tracking_mode(&mut self, mode: TrackingMode) {
        self.tracking_mode = mode;
    }

    fn set_tracked_joints_enabled(&mut self, _enabled: bool) {}

    fn enable_gesture(&mut self, name: &str, enabled: bool) -> Status {
        if !KNOWN_GESTURES.contains(&name) {
            return Status::PARAM_UNSUPPORTED;
        }
        if enabled {
            self.gestures.insert(name.to_string());
        } else {
            self.gestures.remove(name);
        }
        Status::NO_ERROR
    }

    fn apply_changes(&mut self) -> Status {
        let mut state = self.state.borrow_mut();
        state.tracking_mode = self.tracking_mode;
        state.enabled_gestures = Some(self.gestures.clone());
        self.applied = true;
        Status::NO_ERROR
    }

    fn update(&mut self) -> Status {
        if self.applied {
            Status::NO_ERROR
        } else {
            Status::DATA_NOT_CHANGED
        }
    }
}

/// 合成ハンドデータ。`update()` 時点のフレームを保持する
pub struct SyntheticHandData {
    state: Rc<RefCell<SyntheticState>>,
    snapshot: Option<(ScriptedTick, u64)>,
    disposed: bool,
}

impl SyntheticHandData {
    pub fn new(state: Rc<RefCell<SyntheticState>>) -> Self {
        Self {
            state,
            snapshot: None,
            disposed: false,
        }
    }
}

impl HandData for SyntheticHandData {
    fn update(&mut self) -> Status {
        let state = self.state.borrow();
        let tick = &state.current;
        if tick.hand_update.is_error() {
            self.snapshot = None;
            return tick.hand_update;
        }
        let mut tick = tick.clone();
        if let Some(enabled) = &state.enabled_gestures {
            tick.fired.retain(|name| enabled.contains(name));
        }
        self.snapshot = Some((tick, state.frame_number));
        Status::NO_ERROR
    }

    fn number_of_hands(&self) -> usize {
        self.snapshot.as_ref().map_or(0, |(tick, _)| tick.hands.len())
    }

    fn query_hand_data(&self, order: AccessOrder, index: usize) -> Result<HandSnapshot, Status> {
        let (tick, _) = self.snapshot.as_ref().ok_or(Status::DATA_UNAVAILABLE)?;
        let hand = match order {
            AccessOrder::ById => tick.hands.get(index),
            // 合成データでは検出順 = スクリプト順の逆
            AccessOrder::ByTime => tick.hands.iter().rev().nth(index),
        };
        hand.ok_or(Status::ITEM_UNAVAILABLE)?.query.clone()
    }

    fn is_gesture_fired(&self, name: &str) -> Option<GestureData> {
        let (tick, frame_number) = self.snapshot.as_ref()?;
        if !tick.fired.iter().any(|g| g == name) {
            return None;
        }
        let hand_id = tick
            .hands
            .iter()
            .find_map(|h| h.query.as_ref().ok().map(|s| s.unique_id))
            .unwrap_or(0);
        Some(GestureData {
            name: name.to_string(),
            hand_id,
            frame_number: *frame_number,
        })
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.snapshot = None;
        self.state.borrow_mut().counters.disposals.push("hand_data");
    }
}

// --- 生成ヘルパー ---

/// 公称深度カメラ (640x480, f=475) での逆投影
fn depth_pixel_to_world(p: Point2, z: f32) -> Point3 {
    const F: f32 = 475.0;
    Point3::new((p.x - 320.0) / F * z, (p.y - 240.0) / F * z, z)
}

/// 手のひら中心 center (深度ピクセル) から5本の指を扇状に配置する
fn hand_joints(center: Point2, z: f32, openness: i32) -> HashMap<JointType, JointData> {
    let mut joints = HashMap::new();
    let open = openness.clamp(0, 100) as f32 / 100.0;
    let at = |p: Point2, dz: f32| JointData::new(p, depth_pixel_to_world(p, z + dz));

    joints.insert(JointType::Center, at(center, 0.0));
    joints.insert(JointType::Wrist, at(Point2::new(center.x, center.y + 40.0), 0.01));

    const FINGERS: [[JointType; 4]; 5] = [
        [JointType::ThumbBase, JointType::ThumbJt1, JointType::ThumbJt2, JointType::ThumbTip],
        [JointType::IndexBase, JointType::IndexJt1, JointType::IndexJt2, JointType::IndexTip],
        [JointType::MiddleBase, JointType::MiddleJt1, JointType::MiddleJt2, JointType::MiddleTip],
        [JointType::RingBase, JointType::RingJt1, JointType::RingJt2, JointType::RingTip],
        [JointType::PinkyBase, JointType::PinkyJt1, JointType::PinkyJt2, JointType::PinkyTip],
    ];
    // 指の角度（度、真上 = 0）
    const ANGLES: [f32; 5] = [-70.0, -25.0, 0.0, 20.0, 40.0];

    for (finger, angle) in FINGERS.iter().zip(ANGLES) {
        let spread = angle.to_radians() * (0.4 + 0.6 * open);
        let (sin, cos) = spread.sin_cos();
        // 握るほど指は短く、手前に来る
        let length = 20.0 + 40.0 * open;
        for (k, joint) in finger.iter().enumerate() {
            let r = 15.0 + length * (k as f32 + 1.0) / 4.0;
            let p = Point2::new(center.x + r * sin, center.y - r * cos);
            joints.insert(*joint, at(p, -0.01 * (1.0 - open) * k as f32));
        }
    }
    joints
}

/// デモ用のアニメーション
fn animated_tick(frame_number: u64) -> ScriptedTick {
    let t = frame_number as f32 / 30.0;
    let left_open = (50.0 + 50.0 * (t * 1.3).sin()).round() as i32;
    let right_open = (50.0 + 50.0 * (t * 0.9).cos()).round() as i32;

    let left = ScriptedHand::at(
        1,
        BodySide::Left,
        left_open,
        Point2::new(200.0 + 60.0 * t.cos(), 260.0 + 40.0 * t.sin()),
        0.45 + 0.05 * (0.7 * t).sin(),
    );
    let right = ScriptedHand::at(
        2,
        BodySide::Right,
        right_open,
        Point2::new(440.0 + 50.0 * (0.8 * t).sin(), 250.0 + 30.0 * (1.1 * t).cos()),
        0.5,
    );

    let mut fired = Vec::new();
    if left_open < 15 {
        fired.push("fist".to_string());
    }

    ScriptedTick {
        hands: vec![left, right],
        fired,
        ..ScriptedTick::default()
    }
}

/// B, G, R, X の順で並んだグラデーション画像
fn color_image(profile: StreamProfile, frame_number: u64, sample: ColorSample) -> Option<ColorImage> {
    if sample == ColorSample::Missing {
        return None;
    }
    let width = profile.width as usize;
    let height = profile.height as usize;
    let pitch = width * 4;
    let mut data = vec![0u8; pitch * height];
    let shift = (frame_number % 256) as usize;
    for y in 0..height {
        for x in 0..width {
            let i = y * pitch + x * 4;
            data[i] = ((x + shift) % 256) as u8;
            data[i + 1] = (y % 256) as u8;
            data[i + 2] = 0x40;
            data[i + 3] = 0xFF;
        }
    }

    let mut format = PixelFormat::Rgb32;
    match sample {
        ColorSample::Truncated => data.truncate(data.len() / 2),
        ColorSample::Depth16 => format = PixelFormat::Depth16,
        _ => {}
    }

    Some(ColorImage {
        width: profile.width,
        height: profile.height,
        pitch,
        format,
        data,
    })
}

fn depth_image(profile: StreamProfile) -> DepthImage {
    DepthImage {
        width: profile.width,
        height: profile.height,
        data: vec![600; profile.width as usize * profile.height as usize],
    }
}
