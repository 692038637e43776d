use crate::hand::model::{BodySide, Hand, TrackedJoints};

/// 開き具合の段数 (0〜10)。openness / 10 の切り捨て
pub fn openness_buckets(openness: u8) -> usize {
    (openness.min(100) / 10) as usize
}

/// 親指先と小指先のワールド座標上の距離 (m)
pub fn thumb_pinky_distance(joints: &TrackedJoints) -> f32 {
    joints
        .thumb_tip
        .position_world
        .distance(&joints.pinky_tip.position_world)
}

/// 左手の距離・深度表示
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandReadout {
    pub thumb_pinky_cm: f32,
    pub middle_depth_cm: f32,
}

impl HandReadout {
    /// 左手のみ。右手・判定不能の手は None
    pub fn for_hand(hand: &Hand) -> Option<Self> {
        if hand.side != BodySide::Left {
            return None;
        }
        Some(Self {
            thumb_pinky_cm: thumb_pinky_distance(&hand.joints) * 100.0,
            middle_depth_cm: hand.joints.middle_tip.position_world.z * 100.0,
        })
    }

    pub fn distance_label(&self) -> String {
        format!("thumb - pinky = {:.2}cm", self.thumb_pinky_cm)
    }

    pub fn depth_label(&self) -> String {
        format!("middle.z = {:.2}", self.middle_depth_cm)
    }
}
