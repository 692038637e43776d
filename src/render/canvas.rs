use crate::render::image::Bitmap;

/// RGB色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 0x00RRGGBB
    pub fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

/// 塗り・線の色と不透明度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub color: Color,
    /// 0.0〜1.0
    pub opacity: f32,
}

impl Brush {
    pub const fn solid(color: Color) -> Self {
        Self { color, opacity: 1.0 }
    }

    pub const fn with_opacity(color: Color, opacity: f32) -> Self {
        Self { color, opacity }
    }
}

/// 楕円。(x, y) は外接矩形の左上
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub stroke: Brush,
    pub stroke_thickness: f64,
    pub fill: Brush,
}

/// 左端に揃えた横長の矩形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub stroke: Brush,
    pub stroke_thickness: f64,
    pub fill: Brush,
}

/// 描画先
///
/// 描画状態は描画側が持つ。パイプラインは毎ティック `clear()` してから描き直す。
pub trait Canvas {
    fn clear(&mut self);

    /// 背景画像を差し替える
    fn draw_image(&mut self, bitmap: &Bitmap);

    fn draw_ellipse(&mut self, ellipse: Ellipse);

    fn draw_rect(&mut self, rect: Rect);

    fn draw_text(&mut self, content: &str, position: (f64, f64));
}

/// 記録された描画コマンド
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Image { width: u32, height: u32 },
    Ellipse(Ellipse),
    Rect(Rect),
    Text { content: String, position: (f64, f64) },
}

/// 描画コマンドを記録するだけのキャンバス（ヘッドレス実行とテスト用）
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    commands: Vec<DrawCommand>,
    clears: usize,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直近の `clear()` 以降のコマンド
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn clears(&self) -> usize {
        self.clears
    }

    pub fn ellipses(&self) -> impl Iterator<Item = &Ellipse> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Ellipse(e) => Some(e),
            _ => None,
        })
    }

    pub fn rects(&self) -> impl Iterator<Item = &Rect> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Rect(r) => Some(r),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    pub fn images(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Image { .. }))
            .count()
    }
}

impl Canvas for RecordingCanvas {
    fn clear(&mut self) {
        self.commands.clear();
        self.clears += 1;
    }

    fn draw_image(&mut self, bitmap: &Bitmap) {
        self.commands.push(DrawCommand::Image {
            width: bitmap.width,
            height: bitmap.height,
        });
    }

    fn draw_ellipse(&mut self, ellipse: Ellipse) {
        self.commands.push(DrawCommand::Ellipse(ellipse));
    }

    fn draw_rect(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::Rect(rect));
    }

    fn draw_text(&mut self, content: &str, position: (f64, f64)) {
        self.commands.push(DrawCommand::Text {
            content: content.to_string(),
            position,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_to_u32() {
        assert_eq!(Color::rgb(0xFF, 0x45, 0x00).to_u32(), 0xFF4500);
    }

    #[test]
    fn test_recording_canvas_clear() {
        let mut canvas = RecordingCanvas::new();
        canvas.draw_text("a", (0.0, 0.0));
        canvas.clear();
        canvas.draw_text("b", (1.0, 2.0));
        assert_eq!(canvas.clears(), 1);
        assert_eq!(canvas.texts().collect::<Vec<_>>(), vec!["b"]);
    }
}
