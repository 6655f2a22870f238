//! nalgebra 与 opencv Mat/Vector 之间的类型转换

use nalgebra::{DVector, Matrix3, Point2, Point3, Vector3};
use opencv::core::{Mat, Point2d, Point2f, Point3d, Point3f, Vector, CV_64F};
use opencv::prelude::*;

fn check_shape(mat: &Mat, rows: i32, cols: i32) -> opencv::Result<()> {
    if mat.rows() != rows || mat.cols() != cols {
        return Err(opencv::Error::new(
            opencv::core::StsBadSize,
            format!(
                "expected {}x{} mat, got {}x{}",
                rows,
                cols,
                mat.rows(),
                mat.cols()
            ),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct Matrix3d(pub Matrix3<f64>);

impl Matrix3d {
    pub fn to_mat(&self) -> opencv::Result<Mat> {
        let mut mat = Mat::zeros_nd(&[3, 3], CV_64F)?.to_mat()?;
        for i in 0..3 {
            for j in 0..3 {
                *mat.at_2d_mut::<f64>(i as i32, j as i32)? = self.0[(i, j)];
            }
        }
        Ok(mat)
    }
}

/// 将 [Mat] 转换为 [Matrix3]
impl TryFrom<&Mat> for Matrix3d {
    type Error = opencv::Error;

    fn try_from(mat: &Mat) -> opencv::Result<Self> {
        check_shape(mat, 3, 3)?;
        let mut matrix = Matrix3::<f64>::zeros();
        for i in 0..3 {
            for j in 0..3 {
                matrix[(i, j)] = *mat.at_2d::<f64>(i as i32, j as i32)?;
            }
        }
        Ok(Matrix3d(matrix))
    }
}

/// rvec / tvec
#[derive(Debug, Clone, Default)]
pub struct Vector3d(pub Vector3<f64>);

impl Vector3d {
    pub fn to_mat(&self) -> opencv::Result<Mat> {
        let mut mat = Mat::zeros_nd(&[3, 1], CV_64F)?.to_mat()?;
        for i in 0..3 {
            *mat.at_2d_mut::<f64>(i as i32, 0)? = self.0[i];
        }
        Ok(mat)
    }
}

impl TryFrom<&Mat> for Vector3d {
    type Error = opencv::Error;

    fn try_from(mat: &Mat) -> opencv::Result<Self> {
        check_shape(mat, 3, 1)?;
        let mut vector = Vector3::<f64>::zeros();
        for i in 0..3 {
            vector[i] = *mat.at_2d::<f64>(i as i32, 0)?;
        }
        Ok(Vector3d(vector))
    }
}

/// 畸变系数，N x 1
pub fn dvector_to_mat(v: &DVector<f64>) -> opencv::Result<Mat> {
    if v.is_empty() {
        return Ok(Mat::default());
    }
    let mut mat = Mat::zeros_nd(&[v.len() as i32, 1], CV_64F)?.to_mat()?;
    for (i, value) in v.iter().enumerate() {
        *mat.at_2d_mut::<f64>(i as i32, 0)? = *value;
    }
    Ok(mat)
}

/// 行向量和列向量都接受
pub fn mat_to_dvector(mat: &Mat) -> opencv::Result<DVector<f64>> {
    let n = mat.total();
    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        values.push(*mat.at::<f64>(i as i32)?);
    }
    Ok(DVector::from_vec(values))
}

pub fn points2_to_cv(points: &[Point2<f64>]) -> Vector<Point2d> {
    points.iter().map(|p| Point2d::new(p.x, p.y)).collect()
}

pub fn points2f_to_cv(points: &[Point2<f64>]) -> Vector<Point2f> {
    points
        .iter()
        .map(|p| Point2f::new(p.x as f32, p.y as f32))
        .collect()
}

pub fn points3_to_cv(points: &[Point3<f64>]) -> Vector<Point3d> {
    points.iter().map(|p| Point3d::new(p.x, p.y, p.z)).collect()
}

/// calibrateCamera 只接受 32F 点
pub fn points3f_to_cv(points: &[Point3<f64>]) -> Vector<Point3f> {
    points
        .iter()
        .map(|p| Point3f::new(p.x as f32, p.y as f32, p.z as f32))
        .collect()
}

pub fn points2_from_cv(points: &Vector<Point2d>) -> Vec<Point2<f64>> {
    points.iter().map(|p| Point2::new(p.x, p.y)).collect()
}

pub fn points2f_from_cv(points: &Vector<Point2f>) -> Vec<Point2<f64>> {
    points
        .iter()
        .map(|p| Point2::new(p.x as f64, p.y as f64))
        .collect()
}
