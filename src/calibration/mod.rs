//! 相机标定
//!
//! - [CalibrationSession] 收集多帧的 2D-3D 对应点，何时加入由外部决定
//! - [solve] 调用非线性标定求解，得到相机模型和重投影误差
//! - [export_corners] 把确认过的角点导出为 CSV

mod export;
mod session;
mod solver;

pub use export::export_corners;
pub use session::{CalibrationSession, ViewCorrespondence};
pub use solver::{solve, CalibrationReport};
