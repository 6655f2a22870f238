//! 标定参数文件（纯文本，按标签定位）
//!
//! ```text
//! Camera matrix:
//! fx 0 cx
//! 0 fy cy
//! 0 0 1
//! Distortion coefficients:
//! k1
//! k2
//! p1
//! p2
//! k3
//! Reprojection error:0.21
//! ```
//!
//! 畸变系数固定写 5 行、读取时固定读 5 个值，与求解时畸变向量的实际长度无关。
//! 求解器用 8 个系数时后 3 个不会落盘。改动这个宽度会破坏已有文件的兼容性。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::{DVector, Matrix3};

use super::{Calibration, CameraModel};
use crate::config::SERIALIZED_DISTORTION_ROWS;
use crate::error::{CalibError, Result};

const CAMERA_MATRIX_HEADER: &str = "Camera matrix:";
const DISTORTION_HEADER: &str = "Distortion coefficients:";
const RMS_LABEL: &str = "Reprojection error:";

pub fn save_params(calibration: &Calibration, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_params(calibration, &mut writer)?;
    writer.flush()?;
    log::info!("intrinsic parameters saved to {}", path.display());
    Ok(())
}

pub fn load_params(path: &Path) -> Result<Calibration> {
    let text = std::fs::read_to_string(path).map_err(|source| CalibError::FileNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    let calibration = parse_params(&text)?;
    log::info!(
        "loaded camera matrix: {} distortion: {} reprojection error: {}",
        calibration.camera.intrinsics,
        calibration.camera.distortion.transpose(),
        calibration.rms
    );
    Ok(calibration)
}

fn write_params<W: Write>(calibration: &Calibration, out: &mut W) -> std::io::Result<()> {
    let camera = &calibration.camera;

    writeln!(out, "{CAMERA_MATRIX_HEADER}")?;
    for i in 0..3 {
        for j in 0..3 {
            write!(out, "{} ", camera.intrinsics[(i, j)])?;
        }
        writeln!(out)?;
    }

    writeln!(out, "{DISTORTION_HEADER}")?;
    // 列向量，每行 ncols 个值；不足 5 个系数时补 0
    for i in 0..SERIALIZED_DISTORTION_ROWS {
        for j in 0..camera.distortion.ncols() {
            let value = camera.distortion.get((i, j)).copied().unwrap_or(0.0);
            write!(out, "{} ", value)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "{RMS_LABEL}{}", calibration.rms)
}

fn parse_params(text: &str) -> Result<Calibration> {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();

    let mut intrinsics = None;
    let mut distortion = None;
    let mut rms = None;

    for (i, line) in lines.iter().enumerate() {
        let rest = &lines[i + 1..];
        if *line == CAMERA_MATRIX_HEADER {
            let values = read_numbers(rest, 9, "camera matrix")?;
            intrinsics = Some(Matrix3::from_row_slice(&values));
        } else if *line == DISTORTION_HEADER {
            let values =
                read_numbers(rest, SERIALIZED_DISTORTION_ROWS, "distortion coefficients")?;
            distortion = Some(DVector::from_vec(values));
        } else if let Some(pos) = line.find(RMS_LABEL) {
            let tail = line[pos + RMS_LABEL.len()..].trim();
            let value = if tail.is_empty() {
                read_numbers(rest, 1, "reprojection error")?[0]
            } else {
                parse_number(tail, "reprojection error")?
            };
            rms = Some(value);
        }
    }

    let intrinsics = intrinsics.ok_or_else(|| missing(CAMERA_MATRIX_HEADER))?;
    let distortion = distortion.ok_or_else(|| missing(DISTORTION_HEADER))?;
    let rms = rms.ok_or_else(|| missing(RMS_LABEL))?;

    let camera = CameraModel::new(intrinsics, distortion);
    if !camera.is_finite() {
        return Err(CalibError::MalformedFile(
            "camera parameters must be finite".to_string(),
        ));
    }
    if !rms.is_finite() || rms < 0.0 {
        return Err(CalibError::MalformedFile(format!(
            "reprojection error must be a non-negative number, found {rms}"
        )));
    }

    Ok(Calibration { camera, rms })
}

/// 从标签之后的行里按空白切分读取 `count` 个数
fn read_numbers(lines: &[&str], count: usize, section: &str) -> Result<Vec<f64>> {
    let values = lines
        .iter()
        .flat_map(|line| line.split_whitespace())
        .take(count)
        .map(|token| parse_number(token, section))
        .collect::<Result<Vec<f64>>>()?;
    if values.len() < count {
        return Err(CalibError::MalformedFile(format!(
            "{section}: expected {count} values, found {}",
            values.len()
        )));
    }
    Ok(values)
}

fn parse_number(token: &str, section: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| CalibError::MalformedFile(format!("{section}: invalid number {token:?}")))
}

fn missing(header: &str) -> CalibError {
    CalibError::MalformedFile(format!("missing {header:?} section"))
}
