pub mod extractor;
pub mod joint;
pub mod metrics;
pub mod model;

pub use extractor::HandFrameExtractor;
pub use joint::{JointData, JointType};
pub use metrics::{openness_buckets, thumb_pinky_distance, HandReadout};
pub use model::{
    AccessOrder, BodySide, GestureData, GestureEvent, Hand, HandSet, HandSnapshot,
    HandTrackingConfig, TrackedJoints, TrackingMode,
};
