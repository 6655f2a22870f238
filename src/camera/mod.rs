//! 相机模型与标定参数文件

mod params_file;
pub use params_file::{load_params, save_params};

use nalgebra::{DVector, Matrix3};

use crate::config::SOLVER_DISTORTION_LEN;

/// 针孔相机 + 畸变系数。
///
/// 内参矩阵假设无 skew；畸变系数按 OpenCV 顺序 `k1 k2 p1 p2 k3 [k4 k5 k6]`。
#[derive(Debug, Clone, PartialEq)]
pub struct CameraModel {
    pub intrinsics: Matrix3<f64>,
    pub distortion: DVector<f64>,
}

impl Default for CameraModel {
    /// 标定前的初值：单位内参、全零畸变
    fn default() -> Self {
        Self {
            intrinsics: Matrix3::identity(),
            distortion: DVector::zeros(SOLVER_DISTORTION_LEN),
        }
    }
}

impl CameraModel {
    pub fn new(intrinsics: Matrix3<f64>, distortion: DVector<f64>) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    #[cfg(test)]
    pub fn from_pinhole(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        let intrinsics = Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0);
        Self::new(intrinsics, DVector::zeros(SOLVER_DISTORTION_LEN))
    }

    pub fn fx(&self) -> f64 {
        self.intrinsics[(0, 0)]
    }
    pub fn fy(&self) -> f64 {
        self.intrinsics[(1, 1)]
    }
    pub fn cx(&self) -> f64 {
        self.intrinsics[(0, 2)]
    }
    pub fn cy(&self) -> f64 {
        self.intrinsics[(1, 2)]
    }

    pub fn is_finite(&self) -> bool {
        self.intrinsics.iter().all(|v| v.is_finite())
            && self.distortion.iter().all(|v| v.is_finite())
    }
}

/// 一次标定的结果：相机模型 + RMS 重投影误差（像素）
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub camera: CameraModel,
    pub rms: f64,
}
