use std::path::Path;

use serde::{Deserialize, Serialize};

use super::CalibrationSession;
use crate::error::Result;

/// 一行对应一个角点：视图号、下标、像素坐标、标定板坐标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CornerRecord {
    pub view: usize,
    pub index: usize,
    pub u: f64,
    pub v: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// 把会话中确认过的所有视图写成 CSV
pub fn export_corners<I>(session: &CalibrationSession<I>, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(std::io::Error::from)?;
    for (view_id, view) in session.views().iter().enumerate() {
        for (index, (uv, xyz)) in view
            .image_points
            .iter()
            .zip(view.object_points.iter())
            .enumerate()
        {
            writer
                .serialize(CornerRecord {
                    view: view_id,
                    index,
                    u: uv.x,
                    v: uv.y,
                    x: xyz.x,
                    y: xyz.y,
                    z: xyz.z,
                })
                .map_err(std::io::Error::from)?;
        }
    }
    writer.flush()?;
    log::info!(
        "exported {} views to {}",
        session.view_count(),
        path.display()
    );
    Ok(())
}
