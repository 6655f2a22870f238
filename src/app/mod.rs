//! 两个交互程序：采集标定 / 实时 AR 叠加
//!
//! 单线程逐帧处理：取帧 -> 检测 -> 细化 -> 位姿 -> 投影 -> 显示，处理完一帧
//! 再取下一帧。退出按键只在当前帧处理完后生效。

mod augment;
mod calibrate;
mod display;

pub use augment::run_augment;
pub use calibrate::run_calibration;

use crate::config::{CONFIRM_KEY, QUIT_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    /// 确认当前帧
    Confirm,
    /// 结束会话 / 退出
    Quit,
}

/// 离开作用域时执行一次，提前 `?` 返回也会执行
pub struct OnExit<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> OnExit<F> {
    pub fn new(f: F) -> Self {
        Self(Some(f))
    }
}

impl<F: FnOnce()> Drop for OnExit<F> {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

/// `wait_key` 的返回值转换为动作，无按键时为 -1
pub fn key_action(key: i32) -> KeyAction {
    if key < 0 {
        return KeyAction::None;
    }
    match char::from((key & 0xFF) as u8) {
        CONFIRM_KEY => KeyAction::Confirm,
        QUIT_KEY => KeyAction::Quit,
        _ => KeyAction::None,
    }
}
