use crate::projection::{Point2, Point3};

/// ハンドトラッキングの22関節インデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
pub enum JointType {
    Wrist = 0,
    Center = 1,
    ThumbBase = 2,
    ThumbJt1 = 3,
    ThumbJt2 = 4,
    ThumbTip = 5,
    IndexBase = 6,
    IndexJt1 = 7,
    IndexJt2 = 8,
    IndexTip = 9,
    MiddleBase = 10,
    MiddleJt1 = 11,
    MiddleJt2 = 12,
    MiddleTip = 13,
    RingBase = 14,
    RingJt1 = 15,
    RingJt2 = 16,
    RingTip = 17,
    PinkyBase = 18,
    PinkyJt1 = 19,
    PinkyJt2 = 20,
    PinkyTip = 21,
}

impl JointType {
    pub const COUNT: usize = 22;

    pub const ALL: [JointType; JointType::COUNT] = [
        JointType::Wrist,
        JointType::Center,
        JointType::ThumbBase,
        JointType::ThumbJt1,
        JointType::ThumbJt2,
        JointType::ThumbTip,
        JointType::IndexBase,
        JointType::IndexJt1,
        JointType::IndexJt2,
        JointType::IndexTip,
        JointType::MiddleBase,
        JointType::MiddleJt1,
        JointType::MiddleJt2,
        JointType::MiddleTip,
        JointType::RingBase,
        JointType::RingJt1,
        JointType::RingJt2,
        JointType::RingTip,
        JointType::PinkyBase,
        JointType::PinkyJt1,
        JointType::PinkyJt2,
        JointType::PinkyTip,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 指先関節か
    pub fn is_fingertip(self) -> bool {
        matches!(
            self,
            JointType::ThumbTip
                | JointType::IndexTip
                | JointType::MiddleTip
                | JointType::RingTip
                | JointType::PinkyTip
        )
    }
}

/// 単一関節のデータ
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointData {
    /// 深度画像上のピクセル座標
    pub position_image: Point2,
    /// ワールド座標（メートル）
    pub position_world: Point3,
}

impl JointData {
    pub fn new(position_image: Point2, position_world: Point3) -> Self {
        Self {
            position_image,
            position_world,
        }
    }

    /// 座標変換への入力。x, y は深度画像ピクセル、z はワールドzをmmに変換した値
    pub fn depth_point(&self) -> Point3 {
        Point3::new(
            self.position_image.x,
            self.position_image.y,
            self.position_world.z * 1000.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_type_count() {
        assert_eq!(JointType::COUNT, 22);
        assert_eq!(JointType::ALL.len(), JointType::COUNT);
    }

    #[test]
    fn test_joint_type_from_index() {
        assert_eq!(JointType::from_index(0), Some(JointType::Wrist));
        assert_eq!(JointType::from_index(13), Some(JointType::MiddleTip));
        assert_eq!(JointType::from_index(21), Some(JointType::PinkyTip));
        assert_eq!(JointType::from_index(22), None);
    }

    #[test]
    fn test_indices_match_discriminants() {
        for (i, joint) in JointType::ALL.iter().enumerate() {
            assert_eq!(*joint as usize, i);
        }
    }

    #[test]
    fn test_depth_point_scales_world_z_to_mm() {
        let joint = JointData::new(Point2::new(120.0, 80.0), Point3::new(0.01, 0.02, 0.35));
        let p = joint.depth_point();
        assert_eq!(p.x, 120.0);
        assert_eq!(p.y, 80.0);
        assert!((p.z - 350.0).abs() < 1e-3);
    }
}
