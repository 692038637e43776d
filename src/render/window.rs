use anyhow::Result;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::render::canvas::{Brush, Canvas, Ellipse, Rect};
use crate::render::image::Bitmap;

/// minifbを使用したキャンバス
pub struct MinifbRenderer {
    window: Window,
    title: String,
    /// 背景（カラー画像）
    background: Vec<u32>,
    buffer: Vec<u32>,
    labels: Vec<String>,
    width: usize,
    height: usize,
}

impl MinifbRenderer {
    /// ウィンドウを作成
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        Ok(Self {
            window,
            title: title.to_string(),
            background: vec![0u32; width * height],
            buffer: vec![0u32; width * height],
            labels: Vec::new(),
            width,
            height,
        })
    }

    /// ウィンドウが開いているか
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// バッファをウィンドウに表示。文字列はタイトルバーに出す
    pub fn update(&mut self) -> Result<()> {
        if self.labels.is_empty() {
            self.window.set_title(&self.title);
        } else {
            self.window
                .set_title(&format!("{} | {}", self.title, self.labels.join(" | ")));
        }
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)?;
        Ok(())
    }

    fn blend_pixel(&mut self, x: i32, y: i32, brush: Brush) {
        if x < 0 || x >= self.width as i32 || y < 0 || y >= self.height as i32 {
            return;
        }
        let i = y as usize * self.width + x as usize;
        self.buffer[i] = blend(self.buffer[i], brush);
    }

    fn fill_span(&mut self, y: i32, x0: i32, x1: i32, brush: Brush) {
        for x in x0..=x1 {
            self.blend_pixel(x, y, brush);
        }
    }
}

/// 0x00RRGGBB 同士のアルファ合成
fn blend(dst: u32, brush: Brush) -> u32 {
    let a = brush.opacity.clamp(0.0, 1.0);
    if a >= 1.0 {
        return brush.color.to_u32();
    }
    let mix = |d: u32, s: u8| -> u32 {
        (s as f32 * a + d as f32 * (1.0 - a)).round() as u32
    };
    let r = mix((dst >> 16) & 0xFF, brush.color.r);
    let g = mix((dst >> 8) & 0xFF, brush.color.g);
    let b = mix(dst & 0xFF, brush.color.b);
    (r << 16) | (g << 8) | b
}

impl Canvas for MinifbRenderer {
    fn clear(&mut self) {
        self.buffer.copy_from_slice(&self.background);
        self.labels.clear();
    }

    /// サイズが異なる場合はクロップ/パディング
    fn draw_image(&mut self, bitmap: &Bitmap) {
        for y in 0..self.height.min(bitmap.height as usize) {
            for x in 0..self.width.min(bitmap.width as usize) {
                if let Some(px) = bitmap.pixel(x as u32, y as u32) {
                    self.background[y * self.width + x] = px;
                }
            }
        }
        self.buffer.copy_from_slice(&self.background);
    }

    fn draw_ellipse(&mut self, e: Ellipse) {
        let rx = e.width / 2.0;
        let ry = e.height / 2.0;
        if rx <= 0.0 || ry <= 0.0 {
            return;
        }
        let cx = e.x + rx;
        let cy = e.y + ry;
        let t = e.stroke_thickness;

        for py in e.y.floor() as i32..=(e.y + e.height).ceil() as i32 {
            for px in e.x.floor() as i32..=(e.x + e.width).ceil() as i32 {
                let dx = (px as f64 + 0.5 - cx) / rx;
                let dy = (py as f64 + 0.5 - cy) / ry;
                let d = dx * dx + dy * dy;
                if d > 1.0 {
                    continue;
                }
                // 外周 t ピクセルは線の色
                let inner_x = (rx - t).max(0.0) / rx;
                let inner_y = (ry - t).max(0.0) / ry;
                let inner = (dx / inner_x.max(f64::EPSILON)).powi(2) + (dy / inner_y.max(f64::EPSILON)).powi(2);
                let brush = if t > 0.0 && inner > 1.0 { e.stroke } else { e.fill };
                self.blend_pixel(px, py, brush);
            }
        }
    }

    fn draw_rect(&mut self, r: Rect) {
        let top = r.top.round() as i32;
        let bottom = (r.top + r.height).round() as i32 - 1;
        let right = r.width.round() as i32 - 1;
        let t = r.stroke_thickness.round().max(0.0) as i32;

        for y in top..=bottom {
            let on_edge_row = y < top + t || y > bottom - t;
            if on_edge_row {
                self.fill_span(y, 0, right, r.stroke);
            } else {
                self.fill_span(y, 0, t - 1, r.stroke);
                self.fill_span(y, t, right - t, r.fill);
                self.fill_span(y, right - t + 1, right, r.stroke);
            }
        }
    }

    fn draw_text(&mut self, content: &str, _position: (f64, f64)) {
        self.labels.push(content.to_string());
    }
}
