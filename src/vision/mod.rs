//! 视觉基础能力
//!
//! 角点检测、亚像素细化、标定求解、PnP 和点投影都经由 [VisionPrimitives]，
//! 标定与位姿流程不直接依赖具体的视觉库。

mod cast;
mod opencv_backend;

pub use opencv_backend::OpenCvVision;

use nalgebra::{Point2, Point3};

use crate::calibration::ViewCorrespondence;
use crate::camera::CameraModel;
use crate::error::Result;
use crate::pattern::PatternSize;
use crate::pose::PoseEstimate;

/// 图像尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: i32,
    pub height: i32,
}

/// 标定求解器的输出：共享的相机模型、每个视图的外参、整体 RMS
#[derive(Debug, Clone)]
pub struct SolverOutput {
    pub camera: CameraModel,
    pub poses: Vec<PoseEstimate>,
    pub rms: f64,
}

pub trait VisionPrimitives {
    type Image;

    fn image_size(&self, image: &Self::Image) -> Result<ImageSize>;

    fn to_grayscale(&self, image: &Self::Image) -> Result<Self::Image>;

    /// 返回 `None` 表示未找到完整的标定板
    fn detect_pattern_corners(
        &self,
        gray: &Self::Image,
        size: PatternSize,
    ) -> Result<Option<Vec<Point2<f64>>>>;

    fn refine_corners(
        &self,
        gray: &Self::Image,
        corners: &[Point2<f64>],
    ) -> Result<Vec<Point2<f64>>>;

    /// 非线性最小二乘标定，所有视图共享一组内参/畸变，每个视图一个外参
    fn calibrate(
        &self,
        views: &[ViewCorrespondence],
        image_size: ImageSize,
        initial: &CameraModel,
    ) -> Result<SolverOutput>;

    /// 返回 `None` 表示求解器未找到解
    fn solve_pnp(
        &self,
        object_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        camera: &CameraModel,
    ) -> Result<Option<PoseEstimate>>;

    fn project_points(
        &self,
        points: &[Point3<f64>],
        pose: &PoseEstimate,
        camera: &CameraModel,
    ) -> Result<Vec<Point2<f64>>>;

    /// 灰度化 -> 检测 -> 亚像素细化
    fn find_corners(
        &self,
        image: &Self::Image,
        size: PatternSize,
    ) -> Result<Option<Vec<Point2<f64>>>> {
        let gray = self.to_grayscale(image)?;
        match self.detect_pattern_corners(&gray, size)? {
            Some(corners) => Ok(Some(self.refine_corners(&gray, &corners)?)),
            None => Ok(None),
        }
    }
}
