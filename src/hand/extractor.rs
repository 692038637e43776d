use crate::hand::model::{AccessOrder, GestureEvent, Hand, HandSet, HandTrackingConfig, TrackedJoints};
use crate::sensor::{HandData, Status};

/// ティックごとの手データから `HandSet` を作る
pub struct HandFrameExtractor {
    gestures: Vec<String>,
}

impl HandFrameExtractor {
    pub fn new(config: &HandTrackingConfig) -> Self {
        let mut extractor = Self { gestures: Vec::new() };
        extractor.set_config(config);
        extractor
    }

    /// 問い合わせるジェスチャーを設定から更新
    pub fn set_config(&mut self, config: &HandTrackingConfig) {
        self.gestures = config.enabled_gestures().map(str::to_string).collect();
    }

    pub fn gestures(&self) -> &[String] {
        &self.gestures
    }

    /// スナップショットを更新して手とジェスチャーを取り出す
    ///
    /// `update()` がエラーを返した場合はそのステータスを返す。
    /// 個々の手の問い合わせ失敗はその手だけをスキップする。
    pub fn extract(&self, data: &mut dyn HandData) -> Result<HandSet, Status> {
        let status = data.update();
        if status.is_error() {
            return Err(status);
        }

        let reported = data.number_of_hands();
        let mut set = HandSet {
            reported,
            ..HandSet::default()
        };

        for index in 0..reported {
            let snapshot = match data.query_hand_data(AccessOrder::ById, index) {
                Ok(s) => s,
                Err(status) => {
                    log::debug!("hand {} query failed: {}", index, status);
                    set.skipped += 1;
                    continue;
                }
            };

            let joints = match TrackedJoints::from_map(&snapshot.tracked_joints) {
                Some(j) => j,
                None => {
                    log::debug!("hand {} (id {}) is missing tracked fingertips", index, snapshot.unique_id);
                    set.skipped += 1;
                    continue;
                }
            };

            set.hands.push(Hand {
                id: snapshot.unique_id,
                side: snapshot.body_side,
                openness: snapshot.openness.clamp(0, 100) as u8,
                joints,
            });
        }

        for name in &self.gestures {
            if let Some(fired) = data.is_gesture_fired(name) {
                set.gestures.push(GestureEvent {
                    name: name.clone(),
                    data: fired,
                });
            }
        }

        Ok(set)
    }
}
