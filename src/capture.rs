//! 帧源
//!
//! 相机采集是唯一的阻塞点：每次只取一帧，处理完再取下一帧。

use std::path::{Path, PathBuf};

use opencv::core::Mat;
use opencv::imgcodecs;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};

use crate::error::{CalibError, Result};

pub trait FrameSource {
    type Frame;
    /// 读取下一帧，`None` 表示帧源已结束
    fn next_frame(&mut self) -> Result<Option<Self::Frame>>;
}

pub struct CameraCapture {
    index: i32,
    cap: VideoCapture,
}

impl CameraCapture {
    pub fn open(index: i32) -> Result<Self> {
        let cap = VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|e| CalibError::AcquisitionFailure(format!("camera {index}: {e}")))?;
        if !cap.is_opened()? {
            return Err(CalibError::AcquisitionFailure(format!(
                "camera {index} is not available"
            )));
        }
        log::info!("camera {} opened", index);
        Ok(Self { index, cap })
    }

    pub fn release(&mut self) -> Result<()> {
        self.cap.release()?;
        log::info!("camera {} released", self.index);
        Ok(())
    }
}

impl FrameSource for CameraCapture {
    type Frame = Mat;

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.cap.read(&mut frame)? || frame.empty() {
            log::warn!("camera {} returned no frame", self.index);
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

/// 目录中的图像文件，按文件名排序逐张读取
pub struct ImageFiles {
    paths: std::collections::VecDeque<PathBuf>,
}

impl ImageFiles {
    const EXTENSIONS: [&'static str; 5] = ["png", "jpg", "jpeg", "bmp", "tif"];

    pub fn from_dir(dir: &Path) -> Result<Self> {
        let unreadable = |e: std::io::Error| {
            CalibError::AcquisitionFailure(format!("image directory {}: {e}", dir.display()))
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| Self::EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(CalibError::AcquisitionFailure(format!(
                "no images in {}",
                dir.display()
            )));
        }
        paths.sort();
        log::info!("{} images in {}", paths.len(), dir.display());
        Ok(Self {
            paths: paths.into(),
        })
    }
}

impl FrameSource for ImageFiles {
    type Frame = Mat;

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        while let Some(path) = self.paths.pop_front() {
            let frame = imgcodecs::imread(&path.to_string_lossy(), imgcodecs::IMREAD_COLOR)?;
            if frame.empty() {
                log::warn!("unable to decode {}", path.display());
                continue;
            }
            log::info!("image: {}", path.display());
            return Ok(Some(frame));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dir_is_acquisition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageFiles::from_dir(&dir.path().join("absent")).err().unwrap();
        assert!(matches!(err, CalibError::AcquisitionFailure(_)));
    }

    #[test]
    fn empty_dir_is_acquisition_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"not an image").unwrap();
        let err = ImageFiles::from_dir(dir.path()).err().unwrap();
        assert!(matches!(err, CalibError::AcquisitionFailure(_)), "{err:?}");
    }

    #[test]
    fn only_images_are_listed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "notes.txt", "c.bmp"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let files = ImageFiles::from_dir(dir.path()).unwrap();
        assert_eq!(files.paths.len(), 3);
        let names: Vec<_> = files
            .paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.JPG", "b.png", "c.bmp"]);
    }

    #[test]
    fn undecodable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not an image").unwrap();
        let mut files = ImageFiles::from_dir(dir.path()).unwrap();
        assert!(files.next_frame().unwrap().is_none());
    }
}
