use crate::error::DecodeError;
use crate::sensor::{ColorImage, PixelFormat};

/// 表示用ビットマップ。4バイト/画素で B, G, R, X の順
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// 1ライン当たりのバイト数
    pub stride: usize,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// (x, y) の画素を 0x00RRGGBB で返す
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.stride + x as usize * 4;
        let px = self.pixels.get(i..i + 3)?;
        Some(((px[2] as u32) << 16) | ((px[1] as u32) << 8) | px[0] as u32)
    }
}

/// カラー画像を表示用ビットマップに変換する
///
/// 読み出すバイト数は pitch * height。RGB32 のメモリ配置はそのまま
/// BGR32 として解釈し、チャンネルの入れ替えはしない。
pub fn decode_color(image: &ColorImage) -> Result<Bitmap, DecodeError> {
    if image.format != PixelFormat::Rgb32 {
        return Err(DecodeError::UnsupportedFormat(image.format));
    }
    if image.width == 0 || image.height == 0 {
        return Err(DecodeError::EmptyImage {
            width: image.width,
            height: image.height,
        });
    }
    let row = image.width as usize * PixelFormat::Rgb32.bytes_per_pixel();
    if image.pitch < row {
        return Err(DecodeError::PitchTooSmall {
            pitch: image.pitch,
            width: image.width,
        });
    }

    let length = image.pitch * image.height as usize;
    let pixels = image
        .data
        .get(..length)
        .ok_or(DecodeError::Truncated {
            expected: length,
            actual: image.data.len(),
        })?
        .to_vec();

    Ok(Bitmap {
        width: image.width,
        height: image.height,
        stride: image.pitch,
        pixels,
    })
}
