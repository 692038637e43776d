//! 深度画像座標 → カラー画像座標の変換

use anyhow::{Context, Result};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::ProjectionError;

/// 2次元座標
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    /// 変換できなかった点の値 (SDKと同じく -1, -1)
    pub const INVALID: Point2 = Point2 { x: -1.0, y: -1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

/// 3次元座標
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Point3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// カメラ内部パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// 歪み係数 [k1, k2, p1, p2, k3]
    #[serde(default)]
    pub dist_coeffs: [f64; 5],
}

impl Intrinsics {
    pub fn new(width: u32, height: u32, fx: f64, fy: f64) -> Self {
        Self {
            width,
            height,
            fx,
            fy,
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
            dist_coeffs: [0.0; 5],
        }
    }

    /// 正規化カメラ座標に歪みを適用
    fn distort(&self, x: f64, y: f64) -> (f64, f64) {
        let [k1, k2, p1, p2, k3] = self.dist_coeffs;
        let r2 = x * x + y * y;
        let radial = 1.0 + k1 * r2 + k2 * r2 * r2 + k3 * r2 * r2 * r2;
        let xd = x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
        let yd = y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
        (xd, yd)
    }
}

/// 深度カメラ → カラーカメラの外部パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrinsics {
    /// 回転行列 (row-major 3x3)
    pub rotation: [f64; 9],
    /// 並進ベクトル (mm)
    pub translation: [f64; 3],
}

impl Extrinsics {
    pub fn identity() -> Self {
        Self {
            rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            translation: [0.0; 3],
        }
    }
}

/// デバイスのキャリブレーション
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub depth: Intrinsics,
    pub color: Intrinsics,
    pub depth_to_color: Extrinsics,
}

impl Calibration {
    /// 640x480 前後の一般的な深度カメラを想定した値
    pub fn nominal(color_width: u32, color_height: u32, depth_width: u32, depth_height: u32) -> Self {
        let depth_f = 475.0 * depth_width as f64 / 640.0;
        let color_f = 617.0 * color_width as f64 / 640.0;
        Self {
            depth: Intrinsics::new(depth_width, depth_height, depth_f, depth_f),
            color: Intrinsics::new(color_width, color_height, color_f, color_f),
            depth_to_color: Extrinsics {
                translation: [25.0, 0.0, 0.0],
                ..Extrinsics::identity()
            },
        }
    }

    fn validate(&self) -> Result<(), ProjectionError> {
        for intr in [&self.depth, &self.color] {
            if !(intr.fx > 0.0 && intr.fy > 0.0) {
                return Err(ProjectionError::InvalidCalibration("focal length must be positive"));
            }
            if intr.width == 0 || intr.height == 0 {
                return Err(ProjectionError::InvalidCalibration("image size must be non-zero"));
            }
        }
        if self
            .depth_to_color
            .rotation
            .iter()
            .chain(self.depth_to_color.translation.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ProjectionError::InvalidCalibration("extrinsics must be finite"));
        }
        Ok(())
    }
}

pub fn save_calibration(path: &str, calibration: &Calibration) -> Result<()> {
    let json = serde_json::to_string_pretty(calibration)?;
    fs::write(path, json).context("Failed to write calibration file")?;
    Ok(())
}

pub fn load_calibration(path: &str) -> Result<Calibration> {
    let content = fs::read_to_string(path).context("Failed to read calibration file")?;
    let calibration: Calibration = serde_json::from_str(&content)?;
    Ok(calibration)
}

/// 深度→カラー座標変換
#[derive(Debug, Clone)]
pub struct Projector {
    calibration: Calibration,
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl Projector {
    pub fn new(calibration: Calibration) -> Result<Self, ProjectionError> {
        calibration.validate()?;
        let r = &calibration.depth_to_color.rotation;
        // row-major → nalgebra
        let rotation = Matrix3::new(r[0], r[1], r[2], r[3], r[4], r[5], r[6], r[7], r[8]);
        let t = &calibration.depth_to_color.translation;
        Ok(Self {
            calibration,
            rotation,
            translation: Vector3::new(t[0], t[1], t[2]),
        })
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// 深度画像座標 (x, y ピクセル, z mm) をカラー画像座標に変換
    ///
    /// 出力は入力と同じ長さ・順序。z <= 0 や非有限値の点は `Point2::INVALID`。
    pub fn map_depth_to_color(&self, points: &[Point3]) -> Vec<Point2> {
        points.iter().map(|p| self.map_point(p)).collect()
    }

    fn map_point(&self, p: &Point3) -> Point2 {
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) || p.z <= 0.0 {
            return Point2::INVALID;
        }
        let d = &self.calibration.depth;
        let c = &self.calibration.color;
        let z = p.z as f64;

        // 深度ピクセル → 深度カメラ座標 (mm)
        let depth_cam = Vector3::new(
            (p.x as f64 - d.cx) / d.fx * z,
            (p.y as f64 - d.cy) / d.fy * z,
            z,
        );

        // 深度カメラ → カラーカメラ
        let color_cam = self.rotation * depth_cam + self.translation;
        if color_cam.z <= 0.0 {
            return Point2::INVALID;
        }

        let (xn, yn) = c.distort(color_cam.x / color_cam.z, color_cam.y / color_cam.z);
        Point2::new((xn * c.fx + c.cx) as f32, (yn * c.fy + c.cy) as f32)
    }
}
