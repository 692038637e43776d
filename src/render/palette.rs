use crate::render::canvas::Color;

// WPF の名前付き色
pub const RED: Color = Color::rgb(0xFF, 0x00, 0x00);
pub const ORANGE_RED: Color = Color::rgb(0xFF, 0x45, 0x00);
pub const ORANGE: Color = Color::rgb(0xFF, 0xA5, 0x00);
pub const YELLOW: Color = Color::rgb(0xFF, 0xFF, 0x00);
pub const YELLOW_GREEN: Color = Color::rgb(0x9A, 0xCD, 0x32);
pub const GREEN: Color = Color::rgb(0x00, 0x80, 0x00);
pub const LIGHT_BLUE: Color = Color::rgb(0xAD, 0xD8, 0xE6);
pub const BLUE: Color = Color::rgb(0x00, 0x00, 0xFF);
pub const NAVY: Color = Color::rgb(0x00, 0x00, 0x80);
pub const PURPLE: Color = Color::rgb(0x80, 0x00, 0x80);
pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);

/// 開き具合の帯の色（赤 → 紫）
pub const OPENNESS_RAMP: [Color; 10] = [
    RED,
    ORANGE_RED,
    ORANGE,
    YELLOW,
    YELLOW_GREEN,
    GREEN,
    LIGHT_BLUE,
    BLUE,
    NAVY,
    PURPLE,
];

/// 帯の不透明度
pub const BAND_OPACITY: f32 = 0.25;

/// 固定長の色テーブル。構築後は変更しない
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    colors: [Color; 10],
}

impl ColorRamp {
    pub const LEN: usize = 10;

    pub fn new(colors: [Color; 10]) -> Self {
        Self { colors }
    }

    /// 帯番号に対応する色。範囲外は最後の色
    pub fn get(&self, band: usize) -> Color {
        self.colors[band.min(Self::LEN - 1)]
    }
}

impl Default for ColorRamp {
    fn default() -> Self {
        Self::new(OPENNESS_RAMP)
    }
}
