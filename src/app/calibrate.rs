use anyhow::Context;
use nalgebra::Point2;
use opencv::core::Mat;

use super::{display, key_action, KeyAction};
use crate::calibration::{self, CalibrationSession};
use crate::camera::save_params;
use crate::capture::FrameSource;
use crate::config::{AppConfig, CONFIRM_KEY, QUIT_KEY};
use crate::error::Result;
use crate::pattern::PatternSize;
use crate::vision::{OpenCvVision, VisionPrimitives};

const WINDOW: &str = "frame";

/// 处理一帧：检测到标定板时暂存，否则清空暂存，避免确认到旧帧
pub fn process_calibration_frame<V>(
    vision: &V,
    session: &mut CalibrationSession<V::Image>,
    frame: &V::Image,
) -> Result<Option<Vec<Point2<f64>>>>
where
    V: VisionPrimitives,
    V::Image: Clone,
{
    match vision.find_corners(frame, session.pattern())? {
        Some(corners) => {
            let size = vision.image_size(frame)?;
            session.stage_view(corners.clone(), frame.clone(), size);
            Ok(Some(corners))
        }
        None => {
            session.clear_staged();
            Ok(None)
        }
    }
}

/// 采集标定视图，结束后标定并保存参数文件。
///
/// `auto_confirm` 为真时每个检测到标定板的帧都直接确认（离线图像目录）。
pub fn run_calibration<S>(
    config: &AppConfig,
    source: &mut S,
    auto_confirm: bool,
) -> anyhow::Result<()>
where
    S: FrameSource<Frame = Mat>,
{
    let vision = OpenCvVision::new();
    let pattern = PatternSize::new(config.board_columns, config.board_rows);
    let mut session = CalibrationSession::new(pattern);
    let _windows = display::close_on_exit();

    log::info!(
        "press '{}' to keep a view, '{}' to finish",
        CONFIRM_KEY,
        QUIT_KEY
    );
    while let Some(mut frame) = source.next_frame()? {
        let corners = process_calibration_frame(&vision, &mut session, &frame)?;
        if let Some(corners) = &corners {
            display::draw_corners(&mut frame, pattern, corners)?;
        }
        display::show(WINDOW, &frame)?;

        let action = if auto_confirm && corners.is_some() {
            KeyAction::Confirm
        } else {
            key_action(display::poll_key()?)
        };
        match action {
            KeyAction::Confirm if session.has_staged() => {
                session.confirm_view()?;
                log::info!("view {} kept", session.view_count());
            }
            KeyAction::Confirm => log::warn!("no pattern in the current frame, nothing to keep"),
            KeyAction::Quit => break,
            KeyAction::None => {}
        }
    }

    let report = calibration::solve(&vision, &session).context("calibration failed")?;
    for (i, (rms, pose)) in report
        .per_view_rms
        .iter()
        .zip(report.poses.iter())
        .enumerate()
    {
        log::info!(
            "view {}: reprojection error {:.4} px, translation {}",
            i + 1,
            rms,
            pose.translation.transpose()
        );
    }
    save_params(&report.calibration, &config.params_path)
        .with_context(|| format!("unable to write {}", config.params_path.display()))?;

    if let Some(path) = &config.export_corners {
        calibration::export_corners(&session, path)
            .with_context(|| format!("unable to write {}", path.display()))?;
    }
    if config.review_images {
        review(&session)?;
    }
    Ok(())
}

/// 逐张显示保存下来的标定图像，按任意键下一张
fn review(session: &CalibrationSession<Mat>) -> Result<()> {
    for (i, (image, view)) in session
        .images()
        .iter()
        .zip(session.views().iter())
        .enumerate()
    {
        let mut image = image.clone();
        display::draw_corners(&mut image, session.pattern(), &view.image_points)?;
        display::show(&format!("Calibration Image {}", i + 1), &image)?;
        display::wait_any_key()?;
    }
    Ok(())
}
