//! 3D 点投影与叠加线段
//!
//! 每帧投影两次：坐标轴（4 点）和虚拟金字塔（5 点），结果转换成带颜色标签的
//! 线段交给显示端绘制。

use nalgebra::{Point2, Point3};

use crate::camera::CameraModel;
use crate::error::{CalibError, Result};
use crate::pattern::{axes_gizmo, pyramid, PatternSize};
use crate::pose::PoseEstimate;
use crate::vision::VisionPrimitives;

/// 按输入顺序返回等长的 2D 点
pub fn project<V: VisionPrimitives>(
    vision: &V,
    points: &[Point3<f64>],
    pose: &PoseEstimate,
    camera: &CameraModel,
) -> Result<Vec<Point2<f64>>> {
    if points.is_empty() {
        return Ok(Vec::new());
    }
    let projected = vision.project_points(points, pose, camera)?;
    if projected.len() != points.len() {
        return Err(CalibError::MismatchedCorrespondenceCount {
            image: projected.len(),
            object: points.len(),
        });
    }
    Ok(projected)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayColor {
    Red,
    Green,
    Blue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub from: Point2<f64>,
    pub to: Point2<f64>,
    pub color: OverlayColor,
}

impl LineSegment {
    fn new(from: Point2<f64>, to: Point2<f64>, color: OverlayColor) -> Self {
        Self { from, to, color }
    }
}

/// x 红、y 绿、z 蓝，均从原点出发
pub fn axes_segments(axes: &[Point2<f64>; 4]) -> [LineSegment; 3] {
    [
        LineSegment::new(axes[0], axes[1], OverlayColor::Red),
        LineSegment::new(axes[0], axes[2], OverlayColor::Green),
        LineSegment::new(axes[0], axes[3], OverlayColor::Blue),
    ]
}

/// 顶点到 4 个底面点，再加底面一圈
pub fn pyramid_segments(pyramid: &[Point2<f64>; 5]) -> [LineSegment; 8] {
    let red = |a: usize, b: usize| LineSegment::new(pyramid[a], pyramid[b], OverlayColor::Red);
    [
        red(0, 1),
        red(0, 2),
        red(0, 3),
        red(0, 4),
        red(1, 2),
        red(2, 3),
        red(3, 4),
        red(4, 1),
    ]
}

/// 一帧需要绘制的全部线段
pub fn frame_overlay<V: VisionPrimitives>(
    vision: &V,
    pattern: PatternSize,
    pose: &PoseEstimate,
    camera: &CameraModel,
) -> Result<Vec<LineSegment>> {
    let axes = project(vision, &axes_gizmo(), pose, camera)?;
    let apex_and_base = project(vision, &pyramid(pattern), pose, camera)?;

    let axes: [Point2<f64>; 4] = [axes[0], axes[1], axes[2], axes[3]];
    let apex_and_base: [Point2<f64>; 5] = [
        apex_and_base[0],
        apex_and_base[1],
        apex_and_base[2],
        apex_and_base[3],
        apex_and_base[4],
    ];

    let mut segments = Vec::with_capacity(11);
    segments.extend(axes_segments(&axes));
    segments.extend(pyramid_segments(&apex_and_base));
    Ok(segments)
}
