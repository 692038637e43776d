use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::config::HandConfig;
use crate::hand::joint::{JointData, JointType};

/// 左右の判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodySide {
    #[default]
    Unknown,
    Left,
    Right,
}

/// 手の列挙順
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOrder {
    /// 安定したID順
    ById,
    /// 検出時刻順
    ByTime,
}

/// トラッキングモード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// 全関節
    FullHand,
    /// 輪郭の端点のみ
    Extremities,
}

/// センサーが返す生の手データ（1ティック分）
#[derive(Debug, Clone, PartialEq)]
pub struct HandSnapshot {
    pub unique_id: i32,
    pub body_side: BodySide,
    /// 0〜100
    pub openness: i32,
    pub tracked_joints: HashMap<JointType, JointData>,
}

/// ジェスチャーの付随データ
#[derive(Debug, Clone, PartialEq)]
pub struct GestureData {
    pub name: String,
    pub hand_id: i32,
    pub frame_number: u64,
}

/// ハンドトラッキング設定
#[derive(Debug, Clone, PartialEq)]
pub struct HandTrackingConfig {
    pub tracking_mode: TrackingMode,
    pub tracked_joints_enabled: bool,
    /// ジェスチャー名 → 有効/無効
    pub gestures: BTreeMap<String, bool>,
}

impl HandTrackingConfig {
    pub fn from_config(config: &HandConfig) -> Self {
        let gestures = config
            .gestures
            .iter()
            .map(|name| (name.clone(), true))
            .collect();
        Self {
            tracking_mode: config.tracking_mode,
            tracked_joints_enabled: config.tracked_joints,
            gestures,
        }
    }

    pub fn enable_gesture(&mut self, name: &str, enabled: bool) {
        self.gestures.insert(name.to_string(), enabled);
    }

    /// 有効なジェスチャー名（名前順）
    pub fn enabled_gestures(&self) -> impl Iterator<Item = &str> {
        self.gestures
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
    }
}

impl Default for HandTrackingConfig {
    fn default() -> Self {
        Self::from_config(&HandConfig::default())
    }
}

/// 描画に使う3関節（中指先・親指先・小指先）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedJoints {
    pub middle_tip: JointData,
    pub thumb_tip: JointData,
    pub pinky_tip: JointData,
}

impl TrackedJoints {
    pub const TYPES: [JointType; 3] = [JointType::MiddleTip, JointType::ThumbTip, JointType::PinkyTip];

    /// 生データから3関節を取り出す。1つでも欠けていれば None
    pub fn from_map(joints: &HashMap<JointType, JointData>) -> Option<Self> {
        Some(Self {
            middle_tip: *joints.get(&JointType::MiddleTip)?,
            thumb_tip: *joints.get(&JointType::ThumbTip)?,
            pinky_tip: *joints.get(&JointType::PinkyTip)?,
        })
    }

    /// 中指先・親指先・小指先の順
    pub fn iter(&self) -> impl Iterator<Item = (JointType, &JointData)> {
        [
            (JointType::MiddleTip, &self.middle_tip),
            (JointType::ThumbTip, &self.thumb_tip),
            (JointType::PinkyTip, &self.pinky_tip),
        ]
        .into_iter()
    }
}

/// 抽出済みの手
#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    pub id: i32,
    pub side: BodySide,
    /// 0〜100 に丸めた開き具合
    pub openness: u8,
    pub joints: TrackedJoints,
}

/// 1ティックで発火したジェスチャー
#[derive(Debug, Clone, PartialEq)]
pub struct GestureEvent {
    pub name: String,
    pub data: GestureData,
}

/// 1ティック分の手の集合。毎ティック作り直し、キャッシュしない
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandSet {
    pub hands: Vec<Hand>,
    pub gestures: Vec<GestureEvent>,
    /// センサーが報告した手の数
    pub reported: usize,
    /// 問い合わせ失敗または関節欠落でスキップした手の数
    pub skipped: usize,
}

impl HandSet {
    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    pub fn is_fired(&self, gesture: &str) -> bool {
        self.gestures.iter().any(|g| g.name == gesture)
    }
}
