use chrono::{DateTime, Local};

use crate::config::{Config, ErrorPolicy};
use crate::error::{InitError, PipelineError, TraceError};
use crate::hand::{HandFrameExtractor, HandReadout, HandSet, HandTrackingConfig};
use crate::pipeline::context::{SessionContext, TickParts};
use crate::projection::Point3;
use crate::render::{
    decode_color, Canvas, ColorRamp, HandOverlay, OverlayRenderer, OverlayStats, TickOverlay,
};
use crate::sensor::{Frame, SensorSession, Status};
use crate::trace::TraceLogger;

/// パイプラインの状態。1ティック = Idle → Acquiring → Processing → Releasing → Idle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Acquiring,
    Processing,
    Releasing,
}

/// 1ティックの処理結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub color_decoded: bool,
    /// デコードに失敗したカラー画像の数（スキップして継続）
    pub color_errors: usize,
    pub hands: usize,
    /// 問い合わせ失敗でスキップした手の数
    pub hands_skipped: usize,
    pub gestures: Vec<String>,
    pub overlay: OverlayStats,
    pub trace_rows: usize,
    /// `ErrorPolicy::Continue` でエラーを握りつぶしたか
    pub failed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// フレーム取得失敗。描画せず次のティックを待つ
    Skipped(Status),
    Rendered(TickReport),
}

/// 取得したフレームを保持し、スコープを抜けると必ず解放する
struct FrameLease<'a> {
    session: &'a mut dyn SensorSession,
}

impl<'a> FrameLease<'a> {
    fn new(session: &'a mut dyn SensorSession) -> Self {
        Self { session }
    }

    fn sample(&self) -> Option<&Frame> {
        self.session.sample()
    }
}

impl Drop for FrameLease<'_> {
    fn drop(&mut self) {
        self.session.release_frame();
    }
}

/// フレーム取得 → カラー画像 → 手の抽出 → オーバーレイ → 解放 を1ティックとして駆動する
///
/// `tick` は `&mut self` を取るので、ティックが重なることはない。
pub struct FramePipeline {
    context: SessionContext,
    extractor: HandFrameExtractor,
    renderer: OverlayRenderer,
    trace: TraceLogger,
    policy: ErrorPolicy,
    state: PipelineState,
    ticks: u64,
}

impl FramePipeline {
    pub fn new(context: SessionContext, trace: TraceLogger, ramp: ColorRamp, policy: ErrorPolicy) -> Self {
        let color = context.color_profile();
        let extractor = HandFrameExtractor::new(context.hand_config());
        Self {
            context,
            extractor,
            renderer: OverlayRenderer::new(ramp, color.width, color.height),
            trace,
            policy,
            state: PipelineState::Idle,
            ticks: 0,
        }
    }

    /// セッションを初期化してパイプラインを作る
    pub fn from_config(
        session: Box<dyn SensorSession>,
        config: &Config,
        session_start: DateTime<Local>,
    ) -> Result<Self, InitError> {
        let context = SessionContext::initialize(session, config)?;
        let trace = TraceLogger::new(&config.trace, session_start);
        let mut pipeline = Self::new(context, trace, ColorRamp::default(), config.app.error_policy);
        if config.trace.enabled {
            if let Err(e) = pipeline.set_logging(true) {
                log::warn!("could not start trace logging: {}", e);
            }
        }
        Ok(pipeline)
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn trace(&self) -> &TraceLogger {
        &self.trace
    }

    /// ロギングのトグル。次のティックの書き込みより前に完了する
    pub fn set_logging(&mut self, enabled: bool) -> Result<(), TraceError> {
        self.trace.set_active(enabled)
    }

    pub fn update_hand_config(&mut self, config: &HandTrackingConfig) -> Result<(), InitError> {
        self.context.update_hand_config(config)?;
        self.extractor.set_config(config);
        Ok(())
    }

    /// 1ティック分の処理
    ///
    /// フレーム取得失敗は `Skipped`。トレース書き込みの失敗は `ErrorPolicy`
    /// に従い、`Terminate` なら呼び出し側へ返す。
    pub fn tick(&mut self, canvas: &mut dyn Canvas) -> Result<TickOutcome, PipelineError> {
        canvas.clear();

        let TickParts {
            session,
            hand_data,
            projector,
        } = self.context.tick_parts().ok_or(PipelineError::ShutDown)?;

        self.state = PipelineState::Acquiring;
        let status = session.acquire_frame(true);
        if status.is_error() {
            log::debug!("frame acquisition failed: {}", status);
            self.state = PipelineState::Idle;
            return Ok(TickOutcome::Skipped(status));
        }

        let lease = FrameLease::new(session);
        self.state = PipelineState::Processing;

        let mut report = TickReport::default();
        if let Some(color) = lease.sample().and_then(|f| f.color.as_ref()) {
            match decode_color(color) {
                Ok(bitmap) => {
                    canvas.draw_image(&bitmap);
                    report.color_decoded = true;
                }
                Err(e) => {
                    log::warn!("color image skipped: {}", e);
                    report.color_errors += 1;
                }
            }
        }

        let hand_set = match self.extractor.extract(hand_data) {
            Ok(set) => set,
            Err(status) => {
                log::debug!("hand data update failed: {}", status);
                HandSet::default()
            }
        };
        report.hands = hand_set.hands.len();
        report.hands_skipped = hand_set.skipped;
        report.gestures = hand_set.gestures.iter().map(|g| g.name.clone()).collect();

        let mut failure: Option<PipelineError> = None;
        let mut overlay = TickOverlay {
            hands: Vec::with_capacity(hand_set.hands.len()),
            gestures_fired: hand_set.gestures.len(),
        };
        for hand in &hand_set.hands {
            let depth_points: Vec<Point3> = hand.joints.iter().map(|(_, j)| j.depth_point()).collect();
            let markers = projector.map_depth_to_color(&depth_points);

            if self.trace.is_active() && failure.is_none() {
                for (color, depth) in markers.iter().zip(&depth_points) {
                    match self.trace.append(*color, *depth) {
                        Ok(_) => report.trace_rows += 1,
                        Err(e) => {
                            failure = Some(e.into());
                            break;
                        }
                    }
                }
            }

            overlay.hands.push(HandOverlay {
                openness: hand.openness,
                markers,
                readout: HandReadout::for_hand(hand),
            });
        }
        report.overlay = self.renderer.render(canvas, &overlay);

        self.state = PipelineState::Releasing;
        drop(lease);
        self.state = PipelineState::Idle;
        self.ticks += 1;

        settle(self.policy, self.ticks, report, failure)
    }

    /// トレースを閉じ、センサーリソースを逆順で解放する。何度呼んでもよい
    pub fn shutdown(&mut self) {
        if let Err(e) = self.trace.close() {
            log::error!("failed to close trace file: {}", e);
        }
        self.context.shutdown();
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 書き込みエラーを `ErrorPolicy` に従って処理する
fn settle(
    policy: ErrorPolicy,
    tick: u64,
    mut report: TickReport,
    failure: Option<PipelineError>,
) -> Result<TickOutcome, PipelineError> {
    let Some(e) = failure else {
        return Ok(TickOutcome::Rendered(report));
    };
    match policy {
        ErrorPolicy::Terminate => Err(e),
        ErrorPolicy::Continue => {
            log::error!("tick {} failed, continuing: {}", tick, e);
            report.failed = true;
            Ok(TickOutcome::Rendered(report))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraceClock;
    use crate::hand::BodySide;
    use crate::render::RecordingCanvas;
    use crate::sensor::{ColorSample, ScriptedHand, ScriptedTick, SessionProbe, SyntheticSession};
    use chrono::TimeZone;
    use std::fs;
    use std::path::Path;

    fn session_start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2016, 1, 22, 18, 7, 0).unwrap()
    }

    fn pipeline_with(ticks: Vec<ScriptedTick>, policy: ErrorPolicy, trace_dir: &Path) -> (FramePipeline, SessionProbe) {
        let session = SyntheticSession::scripted(ticks);
        let probe = session.probe();
        let mut config = Config::default();
        config.app.error_policy = policy;
        let context = SessionContext::initialize(Box::new(session), &config).unwrap();
        let trace = TraceLogger::with_dir(trace_dir, TraceClock::SincePreviousWrite, session_start());
        (FramePipeline::new(context, trace, ColorRamp::default(), policy), probe)
    }

    fn rendered(outcome: TickOutcome) -> TickReport {
        match outcome {
            TickOutcome::Rendered(report) => report,
            TickOutcome::Skipped(status) => panic!("tick skipped: {}", status),
        }
    }

    #[test]
    fn test_two_hands_draw_fourteen_bands() {
        let dir = tempfile::tempdir().unwrap();
        let tick = ScriptedTick::with_hands(vec![
            ScriptedHand::open(1, BodySide::Right, 100),
            ScriptedHand::open(2, BodySide::Right, 45),
        ]);
        let (mut pipeline, _) = pipeline_with(vec![tick], ErrorPolicy::Terminate, dir.path());
        let mut canvas = RecordingCanvas::new();

        let report = rendered(pipeline.tick(&mut canvas).unwrap());
        assert_eq!(report.hands, 2);
        assert_eq!(report.overlay.bands, 14);
        assert_eq!(canvas.rects().count(), 14);
        assert_eq!(report.overlay.markers, 6);
    }

    #[test]
    fn test_zero_hands_draws_background_only() {
        let dir = tempfile::tempdir().unwrap();
        let (mut pipeline, _) = pipeline_with(vec![ScriptedTick::default()], ErrorPolicy::Terminate, dir.path());
        let mut canvas = RecordingCanvas::new();

        let report = rendered(pipeline.tick(&mut canvas).unwrap());
        assert!(report.color_decoded);
        assert_eq!(canvas.images(), 1);
        assert_eq!(canvas.commands().len(), 1);
        assert_eq!(canvas.ellipses().count(), 0);
        assert_eq!(report.overlay, OverlayStats::default());
    }

    #[test]
    fn test_fist_draws_one_centered_indicator() {
        let dir = tempfile::tempdir().unwrap();
        let tick = ScriptedTick {
            hands: vec![
                ScriptedHand::open(1, BodySide::Right, 5),
                ScriptedHand::open(2, BodySide::Right, 5),
            ],
            fired: vec!["fist".to_string()],
            ..ScriptedTick::default()
        };
        let (mut pipeline, _) = pipeline_with(vec![tick], ErrorPolicy::Terminate, dir.path());
        let mut canvas = RecordingCanvas::new();

        let report = rendered(pipeline.tick(&mut canvas).unwrap());
        assert_eq!(report.gestures, vec!["fist".to_string()]);
        assert_eq!(report.overlay.indicators, 1);

        let centered: Vec<_> = canvas
            .ellipses()
            .filter(|e| e.x == 320.0 && e.y == 240.0)
            .collect();
        assert_eq!(centered.len(), 1);
        assert_eq!((centered[0].width, centered[0].height), (10.0, 10.0));
    }

    #[test]
    fn test_logging_writes_one_row_per_joint() {
        let dir = tempfile::tempdir().unwrap();
        let trace_dir = dir.path().join("RS");
        let tick = ScriptedTick::with_hands(vec![ScriptedHand::open(1, BodySide::Left, 60)]);
        let (mut pipeline, _) = pipeline_with(vec![tick], ErrorPolicy::Terminate, &trace_dir);
        pipeline.set_logging(true).unwrap();
        let mut canvas = RecordingCanvas::new();

        let report = rendered(pipeline.tick(&mut canvas).unwrap());
        assert_eq!(report.trace_rows, 3);
        pipeline.shutdown();

        let path = trace_dir.join("201601221807.csv");
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_acquire_failure_skips_tick() {
        let dir = tempfile::tempdir().unwrap();
        let ticks = vec![
            ScriptedTick::acquire_failed(Status::EXEC_TIMEOUT),
            ScriptedTick::with_hands(vec![ScriptedHand::open(1, BodySide::Left, 30)]),
        ];
        let (mut pipeline, probe) = pipeline_with(ticks, ErrorPolicy::Terminate, dir.path());
        let mut canvas = RecordingCanvas::new();

        assert_eq!(
            pipeline.tick(&mut canvas).unwrap(),
            TickOutcome::Skipped(Status::EXEC_TIMEOUT)
        );
        assert!(canvas.commands().is_empty());
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert_eq!(probe.counters().releases, 0);

        let report = rendered(pipeline.tick(&mut canvas).unwrap());
        assert_eq!(report.hands, 1);
        assert_eq!(probe.counters().releases, 1);
        assert_eq!(canvas.clears(), 2);
    }

    #[test]
    fn test_every_acquired_frame_is_released() {
        let dir = tempfile::tempdir().unwrap();
        let ticks = vec![
            ScriptedTick::default(),
            ScriptedTick {
                color: ColorSample::Truncated,
                ..ScriptedTick::default()
            },
            ScriptedTick {
                hand_update: Status::DATA_UNAVAILABLE,
                ..ScriptedTick::default()
            },
        ];
        let (mut pipeline, probe) = pipeline_with(ticks, ErrorPolicy::Terminate, dir.path());
        let mut canvas = RecordingCanvas::new();
        for _ in 0..3 {
            pipeline.tick(&mut canvas).unwrap();
        }
        let counters = probe.counters();
        assert_eq!(counters.acquires, 3);
        assert_eq!(counters.releases, 3);
    }

    #[test]
    fn test_color_decode_failure_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let tick = ScriptedTick {
            color: ColorSample::Truncated,
            hands: vec![ScriptedHand::open(1, BodySide::Right, 20)],
            ..ScriptedTick::default()
        };
        let (mut pipeline, _) = pipeline_with(vec![tick], ErrorPolicy::Terminate, dir.path());
        let mut canvas = RecordingCanvas::new();

        let report = rendered(pipeline.tick(&mut canvas).unwrap());
        assert!(!report.color_decoded);
        assert_eq!(report.color_errors, 1);
        assert_eq!(canvas.images(), 0);
        assert_eq!(report.overlay.bands, 2);
    }

    #[test]
    fn test_fired_gesture_without_hands_draws_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let tick = ScriptedTick {
            hands: vec![ScriptedHand::failing(1, Status::ITEM_UNAVAILABLE)],
            fired: vec!["fist".to_string()],
            ..ScriptedTick::default()
        };
        let (mut pipeline, _) = pipeline_with(vec![tick], ErrorPolicy::Terminate, dir.path());
        let mut canvas = RecordingCanvas::new();

        let report = rendered(pipeline.tick(&mut canvas).unwrap());
        assert_eq!(report.hands, 0);
        assert_eq!(report.hands_skipped, 1);
        assert_eq!(report.overlay.indicators, 0);
        assert_eq!(canvas.ellipses().count(), 0);
        assert_eq!(canvas.images(), 1);
    }

    #[test]
    fn test_missing_color_sample() {
        let dir = tempfile::tempdir().unwrap();
        let tick = ScriptedTick {
            color: ColorSample::Missing,
            ..ScriptedTick::default()
        };
        let (mut pipeline, _) = pipeline_with(vec![tick], ErrorPolicy::Terminate, dir.path());
        let mut canvas = RecordingCanvas::new();
        let report = rendered(pipeline.tick(&mut canvas).unwrap());
        assert!(!report.color_decoded);
        assert_eq!(report.color_errors, 0);
    }

    #[test]
    fn test_failed_hand_query_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let tick = ScriptedTick::with_hands(vec![
            ScriptedHand::failing(1, Status::ITEM_UNAVAILABLE),
            ScriptedHand::open(2, BodySide::Right, 50),
        ]);
        let (mut pipeline, _) = pipeline_with(vec![tick], ErrorPolicy::Terminate, dir.path());
        let mut canvas = RecordingCanvas::new();
        let report = rendered(pipeline.tick(&mut canvas).unwrap());
        assert_eq!(report.hands, 1);
        assert_eq!(report.hands_skipped, 1);
        assert_eq!(report.overlay.bands, 5);
    }

    #[test]
    fn test_readout_only_for_left_hand() {
        let dir = tempfile::tempdir().unwrap();
        let tick = ScriptedTick::with_hands(vec![
            ScriptedHand::open(1, BodySide::Unknown, 50),
            ScriptedHand::open(2, BodySide::Right, 50),
            ScriptedHand::open(3, BodySide::Left, 50),
        ]);
        let (mut pipeline, _) = pipeline_with(vec![tick], ErrorPolicy::Terminate, dir.path());
        let mut canvas = RecordingCanvas::new();
        let report = rendered(pipeline.tick(&mut canvas).unwrap());

        assert_eq!(report.overlay.markers, 9);
        assert_eq!(report.overlay.labels, 2);
        let texts: Vec<_> = canvas.texts().collect();
        assert!(texts[0].starts_with("thumb - pinky = "));
        assert!(texts[1].starts_with("middle.z = "));
    }

    #[test]
    fn test_error_policy() {
        let report = TickReport {
            hands: 1,
            ..TickReport::default()
        };
        let failure = || Some(PipelineError::from(TraceError::Closed));

        assert!(matches!(
            settle(ErrorPolicy::Terminate, 1, report.clone(), failure()),
            Err(PipelineError::Trace(TraceError::Closed))
        ));
        let continued = rendered(settle(ErrorPolicy::Continue, 1, report.clone(), failure()).unwrap());
        assert!(continued.failed);
        assert_eq!(continued.hands, 1);
        assert_eq!(
            settle(ErrorPolicy::Terminate, 1, report.clone(), None).unwrap(),
            TickOutcome::Rendered(report)
        );
    }

    #[test]
    fn test_tick_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (mut pipeline, probe) = pipeline_with(vec![], ErrorPolicy::Terminate, dir.path());
        pipeline.shutdown();
        pipeline.shutdown();
        assert!(matches!(
            pipeline.tick(&mut RecordingCanvas::new()),
            Err(PipelineError::ShutDown)
        ));
        assert_eq!(
            probe.counters().disposals,
            vec!["hand_data", "hand_module", "session"]
        );
    }

    #[test]
    fn test_animated_session_runs() {
        let session = SyntheticSession::animated();
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.trace.base_dir = Some(dir.path().to_path_buf());
        let mut pipeline = FramePipeline::from_config(Box::new(session), &config, Local::now()).unwrap();
        let mut canvas = RecordingCanvas::new();
        for _ in 0..60 {
            let report = rendered(pipeline.tick(&mut canvas).unwrap());
            assert_eq!(report.hands, 2);
            assert_eq!(report.overlay.markers, 6);
            assert_eq!(report.overlay.labels, 2);
        }
        assert_eq!(pipeline.ticks(), 60);
    }
}
