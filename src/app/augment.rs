use anyhow::Context;
use nalgebra::{Point2, Point3};
use opencv::core::Mat;

use super::{display, key_action, KeyAction};
use crate::camera::{load_params, CameraModel};
use crate::capture::FrameSource;
use crate::config::AppConfig;
use crate::error::{CalibError, Result};
use crate::pattern::{generate_grid, PatternSize};
use crate::pose::{estimate_pose, PoseEstimate};
use crate::projector::{frame_overlay, LineSegment};
use crate::vision::{OpenCvVision, VisionPrimitives};

const WINDOW: &str = "Frame";

/// 一帧的处理结果；位姿失败时只有角点
#[derive(Debug, Clone)]
pub struct LiveFrame {
    pub corners: Vec<Point2<f64>>,
    pub pose: Option<PoseEstimate>,
    pub segments: Vec<LineSegment>,
}

/// 检测 -> 位姿 -> 投影。
///
/// PnP 无解只影响这一帧，叠加被跳过；其他错误向上返回。
pub fn process_live_frame<V: VisionPrimitives>(
    vision: &V,
    pattern: PatternSize,
    object_points: &[Point3<f64>],
    camera: &CameraModel,
    frame: &V::Image,
) -> Result<Option<LiveFrame>> {
    let Some(corners) = vision.find_corners(frame, pattern)? else {
        return Ok(None);
    };

    let pose = match estimate_pose(vision, &corners, object_points, camera) {
        Ok(pose) => pose,
        Err(CalibError::DegenerateConfiguration(reason)) => {
            log::warn!("skip overlay: {}", reason);
            return Ok(Some(LiveFrame {
                corners,
                pose: None,
                segments: Vec::new(),
            }));
        }
        Err(e) => return Err(e),
    };
    let segments = frame_overlay(vision, pattern, &pose, camera)?;

    Ok(Some(LiveFrame {
        corners,
        pose: Some(pose),
        segments,
    }))
}

/// 读取参数文件，在实时画面中叠加坐标轴和金字塔
pub fn run_augment<S>(config: &AppConfig, source: &mut S) -> anyhow::Result<()>
where
    S: FrameSource<Frame = Mat>,
{
    let calibration = load_params(&config.params_path)
        .with_context(|| format!("no usable camera model in {}", config.params_path.display()))?;
    let camera = calibration.camera;

    let vision = OpenCvVision::new();
    let pattern = PatternSize::new(config.board_columns, config.board_rows);
    let object_points = generate_grid(pattern);
    let _windows = display::close_on_exit();

    while let Some(mut frame) = source.next_frame()? {
        let live = process_live_frame(&vision, pattern, &object_points, &camera, &frame)?;
        if let Some(live) = live {
            display::draw_corners(&mut frame, pattern, &live.corners)?;
            display::draw_segments(&mut frame, &live.segments)?;
            if let Some(pose) = &live.pose {
                log::info!("rotation vector: {}", pose.rotation.transpose());
                log::info!("translation vector: {}", pose.translation.transpose());
            }
        }
        display::show(WINDOW, &frame)?;

        if key_action(display::poll_key()?) == KeyAction::Quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::*;
    use crate::vision::stub::StubVision;

    const PATTERN: PatternSize = PatternSize {
        columns: 3,
        rows: 2,
    };

    fn camera() -> CameraModel {
        CameraModel::from_pinhole(500.0, 500.0, 320.0, 240.0)
    }

    fn corners() -> Vec<Point2<f64>> {
        vec![
            Point2::new(100.0, 100.0),
            Point2::new(120.0, 100.0),
            Point2::new(140.0, 100.0),
            Point2::new(100.0, 120.0),
            Point2::new(120.0, 120.0),
            Point2::new(140.0, 120.0),
        ]
    }

    #[test]
    fn no_pattern_no_overlay() {
        let vision = StubVision::default();
        let grid = generate_grid(PATTERN);
        let live = process_live_frame(&vision, PATTERN, &grid, &camera(), &()).unwrap();
        assert!(live.is_none());
    }

    #[test]
    fn pnp_failure_only_suppresses_overlay() {
        let vision = StubVision {
            corners: Some(corners()),
            pnp_result: None,
            ..Default::default()
        };
        let grid = generate_grid(PATTERN);
        let live = process_live_frame(&vision, PATTERN, &grid, &camera(), &())
            .unwrap()
            .unwrap();
        assert_eq!(live.corners.len(), 6);
        assert!(live.pose.is_none());
        assert!(live.segments.is_empty());
    }

    #[test]
    fn solved_frame_has_overlay() {
        let pose = PoseEstimate::new(Vector3::new(0.1, 0.0, 0.0), Vector3::new(-1.0, 0.5, 10.0));
        let vision = StubVision {
            corners: Some(corners()),
            pnp_result: Some(pose.clone()),
            ..Default::default()
        };
        let grid = generate_grid(PATTERN);
        let live = process_live_frame(&vision, PATTERN, &grid, &camera(), &())
            .unwrap()
            .unwrap();
        assert_eq!(live.pose, Some(pose));
        assert_eq!(live.segments.len(), 11);
    }

    #[test]
    fn wrong_corner_count_is_fatal() {
        let vision = StubVision {
            corners: Some(corners()[..5].to_vec()),
            ..Default::default()
        };
        let grid = generate_grid(PATTERN);
        let err = process_live_frame(&vision, PATTERN, &grid, &camera(), &()).unwrap_err();
        assert!(matches!(err, CalibError::MismatchedCorrespondenceCount { .. }));
    }
}
