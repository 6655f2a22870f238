use nalgebra::{Matrix2, Point2, Vector2};

use super::{CalibrationSession, ViewCorrespondence};
use crate::camera::{Calibration, CameraModel};
use crate::config::MIN_CALIBRATION_VIEWS;
use crate::error::{CalibError, Result};
use crate::pose::PoseEstimate;
use crate::vision::{ImageSize, VisionPrimitives};

/// 每个视图至少需要的角点数
const MIN_VIEW_POINTS: usize = 4;
/// 判定共线：协方差最小特征值 / 最大特征值
const COLLINEAR_RATIO: f64 = 1e-12;

/// 标定结果及诊断信息
#[derive(Debug, Clone)]
pub struct CalibrationReport {
    pub calibration: Calibration,
    /// 每个视图的外参，顺序与会话中的视图一致
    pub poses: Vec<PoseEstimate>,
    /// 每个视图的 RMS 重投影误差（像素）
    pub per_view_rms: Vec<f64>,
}

/// 用会话中累积的视图标定相机。
///
/// 视图不足 [MIN_CALIBRATION_VIEWS] 时返回 `InsufficientData`；任一视图的角点
/// 共线或少于 4 个时在调用求解器之前返回 `DegenerateConfiguration`。
pub fn solve<V, I>(vision: &V, session: &CalibrationSession<I>) -> Result<CalibrationReport>
where
    V: VisionPrimitives,
{
    if !session.ready_to_solve() {
        return Err(CalibError::InsufficientData {
            required: MIN_CALIBRATION_VIEWS,
            actual: session.view_count(),
        });
    }

    let views = session.views();
    for (i, view) in views.iter().enumerate() {
        if view.len() < MIN_VIEW_POINTS {
            return Err(CalibError::DegenerateConfiguration(format!(
                "view {i} has {} points, at least {MIN_VIEW_POINTS} required",
                view.len()
            )));
        }
        if is_collinear(&view.image_points) {
            return Err(CalibError::DegenerateConfiguration(format!(
                "view {i}: detected points are collinear"
            )));
        }
    }

    let image_size = session
        .image_size()
        .unwrap_or_else(|| image_size_from_points(views));
    log::info!(
        "calibrating with {} views, image size {}x{}",
        views.len(),
        image_size.width,
        image_size.height
    );

    let output = match vision.calibrate(views, image_size, &CameraModel::default()) {
        Ok(output) => output,
        Err(CalibError::Backend(e)) => {
            return Err(CalibError::DegenerateConfiguration(format!(
                "calibration failed: {e}"
            )))
        }
        Err(e) => return Err(e),
    };
    if !output.camera.is_finite() || !output.rms.is_finite() {
        return Err(CalibError::DegenerateConfiguration(
            "calibration produced non-finite parameters".to_string(),
        ));
    }

    let per_view_rms = views
        .iter()
        .zip(output.poses.iter())
        .map(|(view, pose)| view_rms(vision, view, pose, &output.camera))
        .collect::<Result<Vec<f64>>>()?;

    let camera = &output.camera;
    log::info!(
        "fx: {} fy: {} cx: {} cy: {}",
        camera.fx(),
        camera.fy(),
        camera.cx(),
        camera.cy()
    );
    log::info!("distortion coefficients: {}", camera.distortion.transpose());
    log::info!("reprojection error: {}", output.rms);

    Ok(CalibrationReport {
        calibration: Calibration {
            camera: output.camera,
            rms: output.rms,
        },
        poses: output.poses,
        per_view_rms,
    })
}

fn is_collinear(points: &[Point2<f64>]) -> bool {
    let n = points.len() as f64;
    let mean = points.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / n;
    let cov = points.iter().fold(Matrix2::zeros(), |acc, p| {
        let d = p.coords - mean;
        acc + d * d.transpose()
    }) / n;
    let eig = cov.symmetric_eigenvalues();
    let (lo, hi) = (eig.min(), eig.max());
    hi <= f64::EPSILON || lo <= hi * COLLINEAR_RATIO
}

/// 没有记录图像尺寸时，用角点的外接范围代替
fn image_size_from_points(views: &[ViewCorrespondence]) -> ImageSize {
    let (max_x, max_y) = views
        .iter()
        .flat_map(|v| v.image_points.iter())
        .fold((1.0_f64, 1.0_f64), |(mx, my), p| (mx.max(p.x), my.max(p.y)));
    ImageSize {
        width: max_x.ceil() as i32 + 1,
        height: max_y.ceil() as i32 + 1,
    }
}

fn view_rms<V: VisionPrimitives>(
    vision: &V,
    view: &ViewCorrespondence,
    pose: &PoseEstimate,
    camera: &CameraModel,
) -> Result<f64> {
    let projected = vision.project_points(&view.object_points, pose, camera)?;
    let sum_sq: f64 = projected
        .iter()
        .zip(view.image_points.iter())
        .map(|(a, b)| (a - b).norm_squared())
        .sum();
    Ok((sum_sq / view.len() as f64).sqrt())
}
