/// ストリームの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Color,
    Depth,
}

/// ストリームの解像度とFPS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamProfile {
    pub kind: StreamKind,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl StreamProfile {
    pub fn new(kind: StreamKind, width: u32, height: u32, fps: u32) -> Self {
        Self { kind, width, height, fps }
    }
}

/// 画素フォーマット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 4バイト/画素。メモリ上の並びは B, G, R, X
    Rgb32,
    /// 3バイト/画素
    Rgb24,
    /// 16bit 深度 (mm)
    Depth16,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb32 => 4,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Depth16 => 2,
        }
    }
}

/// カラー画像（ピッチ付きの生バッファ）
#[derive(Debug, Clone)]
pub struct ColorImage {
    pub width: u32,
    pub height: u32,
    /// 1ライン当たりのバイト数
    pub pitch: usize,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

/// 深度画像
#[derive(Debug, Clone)]
pub struct DepthImage {
    pub width: u32,
    pub height: u32,
    /// 深度値 (mm)
    pub data: Vec<u16>,
}

/// 1ティック分のサンプル。ティック終了時に解放され、次のティックには持ち越さない
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub color: Option<ColorImage>,
    pub depth: Option<DepthImage>,
}
