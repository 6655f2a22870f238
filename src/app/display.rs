//! highgui 显示与绘制

use nalgebra::Point2;
use opencv::calib3d;
use opencv::core::{Mat, Point, Point2f, Scalar, Size, Vector};
use opencv::highgui;
use opencv::imgproc::{self, LINE_8};

use super::OnExit;
use crate::error::Result;
use crate::pattern::PatternSize;
use crate::projector::{LineSegment, OverlayColor};

const LINE_THICKNESS: i32 = 2;

/// BGR
fn color_scalar(color: OverlayColor) -> Scalar {
    match color {
        OverlayColor::Red => Scalar::new(0.0, 0.0, 255.0, 0.0),
        OverlayColor::Green => Scalar::new(0.0, 255.0, 0.0, 0.0),
        OverlayColor::Blue => Scalar::new(255.0, 0.0, 0.0, 0.0),
    }
}

fn to_pixel(p: &Point2<f64>) -> Point {
    Point::new(p.x.round() as i32, p.y.round() as i32)
}

pub fn draw_corners(frame: &mut Mat, pattern: PatternSize, corners: &[Point2<f64>]) -> Result<()> {
    let corners: Vector<Point2f> = corners
        .iter()
        .map(|p| Point2f::new(p.x as f32, p.y as f32))
        .collect();
    calib3d::draw_chessboard_corners(
        frame,
        Size::new(pattern.columns as i32, pattern.rows as i32),
        &corners,
        true,
    )?;
    Ok(())
}

pub fn draw_segments(frame: &mut Mat, segments: &[LineSegment]) -> Result<()> {
    for segment in segments {
        imgproc::line(
            frame,
            to_pixel(&segment.from),
            to_pixel(&segment.to),
            color_scalar(segment.color),
            LINE_THICKNESS,
            LINE_8,
            0,
        )?;
    }
    Ok(())
}

pub fn show(window: &str, frame: &Mat) -> Result<()> {
    highgui::imshow(window, frame)?;
    Ok(())
}

/// 非阻塞轮询按键
pub fn poll_key() -> Result<i32> {
    Ok(highgui::wait_key(1)?)
}

pub fn wait_any_key() -> Result<i32> {
    Ok(highgui::wait_key(0)?)
}

/// 作用域结束时关闭所有窗口
pub fn close_on_exit() -> OnExit<impl FnOnce()> {
    OnExit::new(|| {
        if let Err(e) = highgui::destroy_all_windows() {
            log::warn!("unable to close windows: {}", e);
        }
    })
}
