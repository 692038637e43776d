use crate::hand::{openness_buckets, HandReadout};
use crate::projection::Point2;
use crate::render::canvas::{Brush, Canvas, Ellipse, Rect};
use crate::render::palette::{ColorRamp, BAND_OPACITY, BLACK, GREEN, WHITE};

/// マーカーの直径（ピクセル）
pub const MARKER_SIZE: f64 = 10.0;
/// 輪郭線の太さ
pub const STROKE_THICKNESS: f64 = 1.0;
/// 距離表示の位置
pub const DISTANCE_LABEL_POSITION: (f64, f64) = (10.0, 10.0);
/// 深度表示の位置
pub const DEPTH_LABEL_POSITION: (f64, f64) = (10.0, 30.0);

/// 1つの手の描画内容
#[derive(Debug, Clone, PartialEq)]
pub struct HandOverlay {
    pub openness: u8,
    /// カラー画像座標に変換済みの関節位置
    pub markers: Vec<Point2>,
    pub readout: Option<HandReadout>,
}

/// 1ティック分の描画内容
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOverlay {
    pub hands: Vec<HandOverlay>,
    /// 発火したジェスチャーの数
    pub gestures_fired: usize,
}

/// 描画したプリミティブの数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayStats {
    pub bands: usize,
    pub markers: usize,
    pub indicators: usize,
    pub labels: usize,
}

/// 手・関節・ジェスチャーの情報を描画コマンドに変換する。ティック間で状態を持たない
pub struct OverlayRenderer {
    ramp: ColorRamp,
    width: f64,
    height: f64,
}

impl OverlayRenderer {
    /// width, height はカラー画像（背景）のサイズ
    pub fn new(ramp: ColorRamp, width: u32, height: u32) -> Self {
        Self {
            ramp,
            width: width as f64,
            height: height as f64,
        }
    }

    pub fn render(&self, canvas: &mut dyn Canvas, overlay: &TickOverlay) -> OverlayStats {
        let mut stats = OverlayStats::default();

        for hand in &overlay.hands {
            stats.bands += self.draw_openness_bands(canvas, hand.openness);
            for point in &hand.markers {
                self.draw_joint_marker(canvas, *point);
                stats.markers += 1;
            }
            if let Some(readout) = &hand.readout {
                stats.labels += self.draw_readout(canvas, readout);
            }
        }

        // ジェスチャーは手が1つ以上残っているティックでのみ描く
        let indicators = if overlay.hands.is_empty() { 0 } else { overlay.gestures_fired };
        for _ in 0..indicators {
            self.draw_gesture_indicator(canvas);
            stats.indicators += 1;
        }

        stats
    }

    /// 開き具合の段数だけ横帯を描く。戻り値は描いた帯の数
    pub fn draw_openness_bands(&self, canvas: &mut dyn Canvas, openness: u8) -> usize {
        let count = openness_buckets(openness);
        if count == 0 {
            return 0;
        }
        let band_height = self.height / count as f64;
        for band in 0..count {
            canvas.draw_rect(Rect {
                top: band_height * band as f64,
                width: self.width,
                height: band_height,
                stroke: Brush::solid(BLACK),
                stroke_thickness: STROKE_THICKNESS,
                fill: Brush::with_opacity(self.ramp.get(band), BAND_OPACITY),
            });
        }
        count
    }

    pub fn draw_joint_marker(&self, canvas: &mut dyn Canvas, point: Point2) {
        canvas.draw_ellipse(Ellipse {
            x: point.x as f64,
            y: point.y as f64,
            width: MARKER_SIZE,
            height: MARKER_SIZE,
            stroke: Brush::solid(BLACK),
            stroke_thickness: STROKE_THICKNESS,
            fill: Brush::solid(WHITE),
        });
    }

    /// 画像中央にジェスチャー発火の印を描く
    pub fn draw_gesture_indicator(&self, canvas: &mut dyn Canvas) {
        canvas.draw_ellipse(Ellipse {
            x: self.width / 2.0,
            y: self.height / 2.0,
            width: MARKER_SIZE,
            height: MARKER_SIZE,
            stroke: Brush::solid(BLACK),
            stroke_thickness: STROKE_THICKNESS,
            fill: Brush::solid(GREEN),
        });
    }

    pub fn draw_readout(&self, canvas: &mut dyn Canvas, readout: &HandReadout) -> usize {
        canvas.draw_text(&readout.distance_label(), DISTANCE_LABEL_POSITION);
        canvas.draw_text(&readout.depth_label(), DEPTH_LABEL_POSITION);
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::RecordingCanvas;
    use crate::render::palette::{PURPLE, RED};

    fn renderer() -> OverlayRenderer {
        OverlayRenderer::new(ColorRamp::default(), 640, 480)
    }

    #[test]
    fn test_bands_span_image() {
        let mut canvas = RecordingCanvas::new();
        assert_eq!(renderer().draw_openness_bands(&mut canvas, 100), 10);

        let rects: Vec<_> = canvas.rects().copied().collect();
        assert_eq!(rects.len(), 10);
        assert_eq!(rects[0].top, 0.0);
        assert_eq!(rects[0].fill.color, RED);
        assert_eq!(rects[9].fill.color, PURPLE);
        assert!((rects[9].top + rects[9].height - 480.0).abs() < 1e-9);
        assert!(rects.iter().all(|r| r.width == 640.0 && r.fill.opacity == BAND_OPACITY));
    }

    #[test]
    fn test_no_bands_when_closed() {
        let mut canvas = RecordingCanvas::new();
        assert_eq!(renderer().draw_openness_bands(&mut canvas, 9), 0);
        assert!(canvas.commands().is_empty());
    }

    #[test]
    fn test_gesture_indicator_centered() {
        let mut canvas = RecordingCanvas::new();
        renderer().draw_gesture_indicator(&mut canvas);
        let e = canvas.ellipses().next().unwrap();
        assert_eq!((e.x, e.y), (320.0, 240.0));
        assert_eq!((e.width, e.height), (10.0, 10.0));
        assert_eq!(e.fill.color, GREEN);
    }

    #[test]
    fn test_render_counts() {
        let overlay = TickOverlay {
            hands: vec![
                HandOverlay {
                    openness: 45,
                    markers: vec![Point2::new(1.0, 2.0); 3],
                    readout: Some(HandReadout {
                        thumb_pinky_cm: 7.5,
                        middle_depth_cm: 40.0,
                    }),
                },
                HandOverlay {
                    openness: 100,
                    markers: vec![Point2::new(5.0, 6.0); 3],
                    readout: None,
                },
            ],
            gestures_fired: 1,
        };
        let mut canvas = RecordingCanvas::new();
        let stats = renderer().render(&mut canvas, &overlay);
        assert_eq!(
            stats,
            OverlayStats {
                bands: 14,
                markers: 6,
                indicators: 1,
                labels: 2,
            }
        );
        assert_eq!(canvas.rects().count(), 14);
        assert_eq!(canvas.ellipses().count(), 7);
        assert_eq!(
            canvas.texts().collect::<Vec<_>>(),
            vec!["thumb - pinky = 7.50cm", "middle.z = 40.00"]
        );
    }

    #[test]
    fn test_no_indicator_without_hands() {
        let overlay = TickOverlay {
            hands: Vec::new(),
            gestures_fired: 1,
        };
        let mut canvas = RecordingCanvas::new();
        let stats = renderer().render(&mut canvas, &overlay);
        assert_eq!(stats, OverlayStats::default());
        assert!(canvas.commands().is_empty());
    }
}
