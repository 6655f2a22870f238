//! 错误类型
//!
//! 采集、标定、参数文件和位姿估计共用的错误分类。

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalibError {
    /// 相机或帧源不可用，直接终止
    #[error("frame source unavailable: {0}")]
    AcquisitionFailure(String),

    /// 标定视图不足
    #[error("not enough calibration views: {actual} collected, at least {required} required")]
    InsufficientData { required: usize, actual: usize },

    #[error("unable to open calibration file {}", path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed calibration file: {0}")]
    MalformedFile(String),

    /// 检测到的 2D 点与模型 3D 点数量不一致
    #[error("mismatched correspondence count: {image} image points vs {object} object points")]
    MismatchedCorrespondenceCount { image: usize, object: usize },

    /// PnP 或标定无解，单帧可恢复
    #[error("degenerate configuration: {0}")]
    DegenerateConfiguration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("vision backend: {0}")]
    Backend(#[from] opencv::Error),
}

pub type Result<T> = std::result::Result<T, CalibError>;
