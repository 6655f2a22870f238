//! 标定板几何与虚拟物体几何
//!
//! 角点与模型点之间只靠数组下标对应，所以这里的生成顺序必须与角点检测的
//! 行优先扫描顺序一致。

use nalgebra::Point3;

/// 棋盘格内角点尺寸（列 x 行）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternSize {
    pub columns: u32,
    pub rows: u32,
}

impl PatternSize {
    pub fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    pub fn corner_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// 标定板几何中心，与 [generate_grid] 的坐标约定一致
    pub fn center(&self) -> Point3<f64> {
        let cx = (self.columns as f64 - 1.0) / 2.0;
        let cy = -(self.rows as f64 - 1.0) / 2.0;
        Point3::new(cx, cy, 0.0)
    }
}

/// 生成标定板模型点 `(col, -row, 0)`，行优先。
///
/// y 轴取反是为了与标定板的视觉竖直方向一致，外部工具复用同一约定时重投影
/// 才能对得上，不要改。
pub fn generate_grid(size: PatternSize) -> Vec<Point3<f64>> {
    let mut points = Vec::with_capacity(size.corner_count());
    for row in 0..size.rows {
        for col in 0..size.columns {
            points.push(Point3::new(col as f64, -(row as f64), 0.0));
        }
    }
    points
}

/// 坐标轴：原点 + 三个单位长度的轴端点（x, y, z）
pub fn axes_gizmo() -> [Point3<f64>; 4] {
    [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
    ]
}

const PYRAMID_HEIGHT: f64 = 2.0;
const PYRAMID_HALF_BASE: f64 = 1.0;

/// 金字塔：顶点在标定板中心上方，4 个底面点围绕中心。
///
/// 在 `(col, -row, 0)` 约定下 +z 指向相机。
pub fn pyramid(size: PatternSize) -> [Point3<f64>; 5] {
    let c = size.center();
    let h = PYRAMID_HALF_BASE;
    [
        Point3::new(c.x, c.y, PYRAMID_HEIGHT),
        Point3::new(c.x + h, c.y + h, 0.0),
        Point3::new(c.x - h, c.y + h, 0.0),
        Point3::new(c.x - h, c.y - h, 0.0),
        Point3::new(c.x + h, c.y - h, 0.0),
    ]
}
