use nalgebra::{Point2, Point3};
use opencv::calib3d;
use opencv::core::{Mat, Point2d, Point2f, Size, TermCriteria, Vector};
use opencv::imgproc;
use opencv::prelude::*;

use super::cast::{self, Matrix3d, Vector3d};
use super::{ImageSize, SolverOutput, VisionPrimitives};
use crate::calibration::ViewCorrespondence;
use crate::camera::CameraModel;
use crate::config::{SUBPIX_EPS, SUBPIX_MAX_ITER, SUBPIX_WINDOW};
use crate::error::Result;
use crate::pattern::PatternSize;
use crate::pose::PoseEstimate;

/// OpenCV 实现
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenCvVision;

impl OpenCvVision {
    pub fn new() -> Self {
        Self
    }
}

fn pattern_cv_size(size: PatternSize) -> Size {
    Size::new(size.columns as i32, size.rows as i32)
}

impl VisionPrimitives for OpenCvVision {
    type Image = Mat;

    fn image_size(&self, image: &Mat) -> Result<ImageSize> {
        let size = image.size()?;
        Ok(ImageSize {
            width: size.width,
            height: size.height,
        })
    }

    fn to_grayscale(&self, image: &Mat) -> Result<Mat> {
        if image.channels() == 1 {
            return Ok(image.clone());
        }
        let mut gray = Mat::default();
        imgproc::cvt_color(image, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
        Ok(gray)
    }

    fn detect_pattern_corners(
        &self,
        gray: &Mat,
        size: PatternSize,
    ) -> Result<Option<Vec<Point2<f64>>>> {
        let mut corners = Vector::<Point2f>::new();
        let found = calib3d::find_chessboard_corners(
            gray,
            pattern_cv_size(size),
            &mut corners,
            calib3d::CALIB_CB_ADAPTIVE_THRESH + calib3d::CALIB_CB_NORMALIZE_IMAGE,
        )?;
        Ok(found.then(|| cast::points2f_from_cv(&corners)))
    }

    fn refine_corners(&self, gray: &Mat, corners: &[Point2<f64>]) -> Result<Vec<Point2<f64>>> {
        let mut refined = cast::points2f_to_cv(corners);
        let criteria = TermCriteria::new(
            opencv::core::TermCriteria_EPS + opencv::core::TermCriteria_COUNT,
            SUBPIX_MAX_ITER,
            SUBPIX_EPS,
        )?;
        imgproc::corner_sub_pix(
            gray,
            &mut refined,
            Size::new(SUBPIX_WINDOW, SUBPIX_WINDOW),
            Size::new(-1, -1),
            criteria,
        )?;
        Ok(cast::points2f_from_cv(&refined))
    }

    fn calibrate(
        &self,
        views: &[ViewCorrespondence],
        image_size: ImageSize,
        initial: &CameraModel,
    ) -> Result<SolverOutput> {
        let object_points: Vector<Vector<opencv::core::Point3f>> = views
            .iter()
            .map(|v| cast::points3f_to_cv(&v.object_points))
            .collect();
        let image_points: Vector<Vector<Point2f>> = views
            .iter()
            .map(|v| cast::points2f_to_cv(&v.image_points))
            .collect();

        let mut camera_matrix = Matrix3d(initial.intrinsics).to_mat()?;
        let mut dist_coeffs = cast::dvector_to_mat(&initial.distortion)?;
        let mut rvecs = Vector::<Mat>::new();
        let mut tvecs = Vector::<Mat>::new();
        // cv::calibrateCamera 的默认终止条件
        let criteria = TermCriteria::new(
            opencv::core::TermCriteria_COUNT + opencv::core::TermCriteria_EPS,
            30,
            f64::EPSILON,
        )?;

        let rms = calib3d::calibrate_camera(
            &object_points,
            &image_points,
            Size::new(image_size.width, image_size.height),
            &mut camera_matrix,
            &mut dist_coeffs,
            &mut rvecs,
            &mut tvecs,
            0,
            criteria,
        )?;

        let camera = CameraModel::new(
            Matrix3d::try_from(&camera_matrix)?.0,
            cast::mat_to_dvector(&dist_coeffs)?,
        );
        let poses = rvecs
            .iter()
            .zip(tvecs.iter())
            .map(|(rvec, tvec)| -> Result<PoseEstimate> {
                Ok(PoseEstimate::new(
                    Vector3d::try_from(&rvec)?.0,
                    Vector3d::try_from(&tvec)?.0,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SolverOutput {
            camera,
            poses,
            rms,
        })
    }

    fn solve_pnp(
        &self,
        object_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        camera: &CameraModel,
    ) -> Result<Option<PoseEstimate>> {
        let object_points = cast::points3_to_cv(object_points);
        let image_points = cast::points2_to_cv(image_points);
        let k = Matrix3d(camera.intrinsics).to_mat()?;
        let d = cast::dvector_to_mat(&camera.distortion)?;

        let mut rvec = Mat::default();
        let mut tvec = Mat::default();
        let solved = calib3d::solve_pnp(
            &object_points,
            &image_points,
            &k,
            &d,
            &mut rvec,
            &mut tvec,
            false,
            calib3d::SOLVEPNP_ITERATIVE,
        )?;
        if !solved {
            return Ok(None);
        }
        Ok(Some(PoseEstimate::new(
            Vector3d::try_from(&rvec)?.0,
            Vector3d::try_from(&tvec)?.0,
        )))
    }

    fn project_points(
        &self,
        points: &[Point3<f64>],
        pose: &PoseEstimate,
        camera: &CameraModel,
    ) -> Result<Vec<Point2<f64>>> {
        let object_points = cast::points3_to_cv(points);
        let rvec = Vector3d(pose.rotation).to_mat()?;
        let tvec = Vector3d(pose.translation).to_mat()?;
        let k = Matrix3d(camera.intrinsics).to_mat()?;
        let d = cast::dvector_to_mat(&camera.distortion)?;

        let mut projected = Vector::<Point2d>::new();
        let mut jacobian = Mat::default();
        calib3d::project_points(
            &object_points,
            &rvec,
            &tvec,
            &k,
            &d,
            &mut projected,
            &mut jacobian,
            0.0,
        )?;
        Ok(cast::points2_from_cv(&projected))
    }
}
