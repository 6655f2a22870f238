use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// 棋盘格内角点列数
pub const BOARD_COLUMNS: u32 = 9;
/// 棋盘格内角点行数
pub const BOARD_ROWS: u32 = 6;

/// 标定所需的最少视图数量
pub const MIN_CALIBRATION_VIEWS: usize = 5;

/// cornerSubPix 搜索窗口（11x11）
pub const SUBPIX_WINDOW: i32 = 11;
pub const SUBPIX_MAX_ITER: i32 = 30;
pub const SUBPIX_EPS: f64 = 0.001;

/// 标定时畸变系数向量长度
pub const SOLVER_DISTORTION_LEN: usize = 8;
/// 参数文件中畸变系数固定写 5 行，读取时也固定读 5 个值
pub const SERIALIZED_DISTORTION_ROWS: usize = 5;

pub const DEFAULT_PARAMS_PATH: &str = "calibration_params.txt";

pub const CONFIRM_KEY: char = 's';
pub const QUIT_KEY: char = 'q';

/// 运行时配置：先从 JSON 读取，再由命令行参数覆盖。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera_index: i32,
    pub board_columns: u32,
    pub board_rows: u32,
    pub params_path: PathBuf,
    /// 标定结束后把确认过的角点写成 CSV
    pub export_corners: Option<PathBuf>,
    /// 标定结束后逐张显示标定图像
    pub review_images: bool,
    /// 从图像目录读取帧而不是打开相机；检测到标定板的图像自动确认
    pub image_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            board_columns: BOARD_COLUMNS,
            board_rows: BOARD_ROWS,
            params_path: PathBuf::from(DEFAULT_PARAMS_PATH),
            export_corners: None,
            review_images: false,
            image_dir: None,
        }
    }
}

impl AppConfig {
    pub fn read_from_json(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{ "board_columns": 7 }"#).unwrap();
        assert_eq!(config.board_columns, 7);
        assert_eq!(config.board_rows, BOARD_ROWS);
        assert_eq!(config.params_path, PathBuf::from(DEFAULT_PARAMS_PATH));
        assert!(config.export_corners.is_none());
        assert!(config.image_dir.is_none());
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        let config = AppConfig {
            camera_index: 2,
            export_corners: Some(PathBuf::from("corners.csv")),
            review_images: true,
            ..Default::default()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(AppConfig::read_from_json(&path).unwrap(), config);
    }

    #[test]
    fn missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::read_from_json(&dir.path().join("nope.json")).is_err());
    }
}
