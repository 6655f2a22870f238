use nalgebra::{Point2, Point3};

use crate::config::MIN_CALIBRATION_VIEWS;
use crate::error::{CalibError, Result};
use crate::pattern::{generate_grid, PatternSize};
use crate::vision::ImageSize;

/// 一帧图像的对应点：检测到的 2D 角点与标定板 3D 模型点，按下标一一对应
#[derive(Debug, Clone, PartialEq)]
pub struct ViewCorrespondence {
    pub image_points: Vec<Point2<f64>>,
    pub object_points: Vec<Point3<f64>>,
}

impl ViewCorrespondence {
    pub fn new(image_points: Vec<Point2<f64>>, object_points: Vec<Point3<f64>>) -> Result<Self> {
        if image_points.len() != object_points.len() {
            return Err(CalibError::MismatchedCorrespondenceCount {
                image: image_points.len(),
                object: object_points.len(),
            });
        }
        Ok(Self {
            image_points,
            object_points,
        })
    }

    pub fn len(&self) -> usize {
        self.image_points.len()
    }
}

/// 待确认的检测结果
#[derive(Debug)]
struct StagedView<I> {
    corners: Vec<Point2<f64>>,
    image: I,
    image_size: ImageSize,
}

/// 标定会话。
///
/// 采集循环每帧用 [stage_view](Self::stage_view) 暂存检测结果，用户确认时调用
/// [confirm_view](Self::confirm_view) 才真正加入视图。图像只留给人工回看，
/// 不参与求解。
#[derive(Debug)]
pub struct CalibrationSession<I> {
    pattern: PatternSize,
    views: Vec<ViewCorrespondence>,
    images: Vec<I>,
    image_size: Option<ImageSize>,
    staged: Option<StagedView<I>>,
}

impl<I> CalibrationSession<I> {
    pub fn new(pattern: PatternSize) -> Self {
        Self {
            pattern,
            views: Vec::new(),
            images: Vec::new(),
            image_size: None,
            staged: None,
        }
    }

    pub fn pattern(&self) -> PatternSize {
        self.pattern
    }

    /// 直接加入一个视图；长度不一致时拒绝，会话不变
    pub fn add_view(
        &mut self,
        image_points: Vec<Point2<f64>>,
        object_points: Vec<Point3<f64>>,
    ) -> Result<()> {
        let view = ViewCorrespondence::new(image_points, object_points)?;
        self.views.push(view);
        Ok(())
    }

    /// 暂存当前帧的检测结果，覆盖上一次暂存
    pub fn stage_view(&mut self, corners: Vec<Point2<f64>>, image: I, image_size: ImageSize) {
        self.staged = Some(StagedView {
            corners,
            image,
            image_size,
        });
    }

    /// 当前帧没有检测到标定板
    pub fn clear_staged(&mut self) {
        self.staged = None;
    }

    pub fn has_staged(&self) -> bool {
        self.staged.is_some()
    }

    /// 确认暂存的视图。没有暂存时返回 `Ok(false)`。
    pub fn confirm_view(&mut self) -> Result<bool> {
        let Some(staged) = self.staged.take() else {
            return Ok(false);
        };
        let object_points = generate_grid(self.pattern);
        self.add_view(staged.corners, object_points)?;
        self.images.push(staged.image);
        self.image_size.get_or_insert(staged.image_size);

        let view = &self.views[self.views.len() - 1];
        log::info!("number of corners: {}", view.len());
        if let Some(first) = view.image_points.first() {
            log::info!("coordinates of the first corner: ({}, {})", first.x, first.y);
        }
        Ok(true)
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn ready_to_solve(&self) -> bool {
        self.view_count() >= MIN_CALIBRATION_VIEWS
    }

    pub fn views(&self) -> &[ViewCorrespondence] {
        &self.views
    }

    pub fn images(&self) -> &[I] {
        &self.images
    }

    /// 第一个确认视图的图像尺寸
    pub fn image_size(&self) -> Option<ImageSize> {
        self.image_size
    }

    #[cfg(test)]
    pub fn set_image_size(&mut self, size: ImageSize) {
        self.image_size = Some(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corners(n: usize) -> Vec<Point2<f64>> {
        (0..n).map(|i| Point2::new(i as f64, 2.0 * i as f64)).collect()
    }

    const SIZE: ImageSize = ImageSize {
        width: 640,
        height: 480,
    };

    #[test]
    fn ready_from_fifth_view() {
        let pattern = PatternSize::new(3, 2);
        let mut session = CalibrationSession::<()>::new(pattern);
        for i in 0..MIN_CALIBRATION_VIEWS {
            assert!(!session.ready_to_solve(), "ready after {i} views");
            session.add_view(corners(6), generate_grid(pattern)).unwrap();
        }
        assert!(session.ready_to_solve());
        session.add_view(corners(6), generate_grid(pattern)).unwrap();
        assert!(session.ready_to_solve());
        assert_eq!(session.view_count(), 6);
    }

    #[test]
    fn mismatched_view_is_rejected() {
        let pattern = PatternSize::new(3, 2);
        let mut session = CalibrationSession::<()>::new(pattern);
        session.add_view(corners(6), generate_grid(pattern)).unwrap();

        let err = session.add_view(corners(5), generate_grid(pattern)).unwrap_err();
        assert!(matches!(
            err,
            CalibError::MismatchedCorrespondenceCount { image: 5, object: 6 }
        ));
        assert_eq!(session.view_count(), 1);
    }

    #[test]
    fn confirm_without_staged_is_noop() {
        let mut session = CalibrationSession::<u32>::new(PatternSize::new(3, 2));
        assert!(!session.confirm_view().unwrap());
        assert_eq!(session.view_count(), 0);
    }

    #[test]
    fn confirm_moves_staged_view_in() {
        let mut session = CalibrationSession::<u32>::new(PatternSize::new(3, 2));
        session.stage_view(corners(6), 7, SIZE);
        assert!(session.has_staged());
        assert!(session.confirm_view().unwrap());
        assert!(!session.has_staged());
        // 同一帧不会被确认两次
        assert!(!session.confirm_view().unwrap());

        assert_eq!(session.view_count(), 1);
        assert_eq!(session.images(), &[7]);
        assert_eq!(session.image_size(), Some(SIZE));
        assert_eq!(session.views()[0].object_points, generate_grid(PatternSize::new(3, 2)));
    }

    #[test]
    fn cleared_stage_is_not_confirmed() {
        let mut session = CalibrationSession::<u32>::new(PatternSize::new(3, 2));
        session.stage_view(corners(6), 1, SIZE);
        session.clear_staged();
        assert!(!session.confirm_view().unwrap());
    }

    #[test]
    fn staged_with_wrong_corner_count_is_rejected() {
        let mut session = CalibrationSession::<u32>::new(PatternSize::new(3, 2));
        session.stage_view(corners(4), 1, SIZE);
        assert!(session.confirm_view().is_err());
        assert_eq!(session.view_count(), 0);
        assert!(session.images().is_empty());
    }
}
