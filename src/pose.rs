//! 单帧位姿估计（PnP）
//!
//! 每一帧独立求解，不跨帧保存任何状态。

use nalgebra::{Point2, Point3, Vector3};

use crate::camera::CameraModel;
use crate::error::{CalibError, Result};
use crate::vision::VisionPrimitives;

/// PnP 至少需要的点数
const MIN_PNP_POINTS: usize = 4;

/// 标定板坐标系到相机坐标系的变换
#[derive(Debug, Clone, PartialEq)]
pub struct PoseEstimate {
    /// 轴角（Rodrigues）旋转向量
    pub rotation: Vector3<f64>,
    pub translation: Vector3<f64>,
}

impl PoseEstimate {
    pub fn new(rotation: Vector3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.rotation.iter().chain(self.translation.iter()).all(|v| v.is_finite())
    }
}

/// 只有理想投影和测试用到
#[cfg(test)]
impl PoseEstimate {
    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), Vector3::zeros())
    }

    pub fn rotation_matrix(&self) -> nalgebra::Rotation3<f64> {
        nalgebra::Rotation3::new(self.rotation)
    }

    pub fn to_isometry(&self) -> nalgebra::Isometry3<f64> {
        nalgebra::Isometry3::from_parts(self.translation.into(), self.rotation_matrix().into())
    }
}

/// 由一帧的 2D-3D 对应点和相机模型求标定板位姿。
pub fn estimate_pose<V: VisionPrimitives>(
    vision: &V,
    image_points: &[Point2<f64>],
    object_points: &[Point3<f64>],
    camera: &CameraModel,
) -> Result<PoseEstimate> {
    if image_points.len() != object_points.len() {
        return Err(CalibError::MismatchedCorrespondenceCount {
            image: image_points.len(),
            object: object_points.len(),
        });
    }
    if image_points.len() < MIN_PNP_POINTS {
        return Err(CalibError::DegenerateConfiguration(format!(
            "PnP needs at least {MIN_PNP_POINTS} points, got {}",
            image_points.len()
        )));
    }

    let pose = match vision.solve_pnp(object_points, image_points, camera) {
        Ok(Some(pose)) => pose,
        Ok(None) => {
            return Err(CalibError::DegenerateConfiguration(
                "PnP found no solution".to_string(),
            ))
        }
        Err(CalibError::Backend(e)) => {
            return Err(CalibError::DegenerateConfiguration(format!("PnP failed: {e}")))
        }
        Err(e) => return Err(e),
    };

    if !pose.is_finite() {
        return Err(CalibError::DegenerateConfiguration(
            "PnP returned a non-finite pose".to_string(),
        ));
    }
    Ok(pose)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::pattern::{generate_grid, PatternSize};
    use crate::vision::stub::StubVision;
    use crate::vision::OpenCvVision;

    fn camera() -> CameraModel {
        CameraModel::from_pinhole(800.0, 790.0, 320.0, 240.0)
    }

    fn board_pose() -> PoseEstimate {
        PoseEstimate::new(Vector3::new(0.15, -0.2, 0.05), Vector3::new(-4.0, 2.5, 18.0))
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let vision = StubVision::default();
        let object = generate_grid(PatternSize::new(3, 3));
        let image = vec![Point2::new(0.0, 0.0); 8];
        let err = estimate_pose(&vision, &image, &object, &camera()).unwrap_err();
        assert!(matches!(
            err,
            CalibError::MismatchedCorrespondenceCount { image: 8, object: 9 }
        ));
    }

    #[test]
    fn too_few_points_is_degenerate() {
        let vision = StubVision {
            pnp_result: Some(board_pose()),
            ..Default::default()
        };
        let object = generate_grid(PatternSize::new(3, 1));
        let image = vec![Point2::new(1.0, 1.0); 3];
        let err = estimate_pose(&vision, &image, &object, &camera()).unwrap_err();
        assert!(matches!(err, CalibError::DegenerateConfiguration(_)));
    }

    #[test]
    fn no_solution_is_degenerate() {
        let vision = StubVision::default();
        let object = generate_grid(PatternSize::new(3, 3));
        let image = vec![Point2::new(1.0, 1.0); 9];
        let err = estimate_pose(&vision, &image, &object, &camera()).unwrap_err();
        assert!(matches!(err, CalibError::DegenerateConfiguration(_)));
    }

    #[test]
    fn non_finite_pose_is_degenerate() {
        let vision = StubVision {
            pnp_result: Some(PoseEstimate::new(Vector3::new(f64::NAN, 0.0, 0.0), Vector3::zeros())),
            ..Default::default()
        };
        let object = generate_grid(PatternSize::new(3, 3));
        let image = vec![Point2::new(1.0, 1.0); 9];
        assert!(matches!(
            estimate_pose(&vision, &image, &object, &camera()),
            Err(CalibError::DegenerateConfiguration(_))
        ));
    }

    #[test]
    fn recovers_synthetic_pose() {
        let vision = OpenCvVision::new();
        let object = generate_grid(PatternSize::new(9, 6));
        let truth = board_pose();
        let image = vision.project_points(&object, &truth, &camera()).unwrap();

        let pose = estimate_pose(&vision, &image, &object, &camera()).unwrap();
        assert_abs_diff_eq!(pose.rotation, truth.rotation, epsilon = 1e-4);
        assert_abs_diff_eq!(pose.translation, truth.translation, epsilon = 1e-3);

        let reprojected = vision.project_points(&object, &pose, &camera()).unwrap();
        for (a, b) in reprojected.iter().zip(image.iter()) {
            assert!((a - b).norm() < 1e-3);
        }
    }

    #[test]
    fn isometry_matches_rotation_vector() {
        let pose = board_pose();
        let p = Point3::new(1.0, -2.0, 0.0);
        let expected = pose.rotation_matrix() * p + pose.translation;
        assert_abs_diff_eq!(pose.to_isometry() * p, expected, epsilon = 1e-12);
    }
}
