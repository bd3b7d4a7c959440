//! 输入状态模块
//!
//! 由窗口事件驱动的键盘/鼠标状态快照。本模块只记录状态，
//! 如何使用这些状态（例如驱动自由相机）由调用方决定。

use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::KeyCode;

/// 滚轮一“行”对应的像素数，用于把像素滚动归一化为行
const PIXELS_PER_LINE: f32 = 20.0;

/// 键盘与鼠标的当前状态
#[derive(Debug, Clone, Default)]
pub struct Input {
    pressed_keys: HashSet<KeyCode>,
    mouse_buttons: HashSet<MouseButton>,

    mouse_pos: (f32, f32),
    last_mouse_pos: (f32, f32),
    first_mouse: bool,

    /// 本帧累计的滚轮增量（行）
    wheel_delta: f32,
}

impl Input {
    pub fn new() -> Self {
        Self {
            first_mouse: true,
            ..Default::default()
        }
    }

    /// 处理键盘事件
    pub fn on_keyboard_input(&mut self, keycode: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.pressed_keys.insert(keycode);
            }
            ElementState::Released => {
                self.pressed_keys.remove(&keycode);
            }
        }
    }

    /// 处理鼠标按键事件
    pub fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.mouse_buttons.insert(button);
            }
            ElementState::Released => {
                self.mouse_buttons.remove(&button);
            }
        }
    }

    /// 处理鼠标移动事件
    ///
    /// 第一次收到位置时同时作为“上一帧位置”，避免首帧出现巨大的增量。
    pub fn on_mouse_move(&mut self, x: f32, y: f32) {
        self.mouse_pos = (x, y);
        if self.first_mouse {
            self.last_mouse_pos = self.mouse_pos;
            self.first_mouse = false;
        }
    }

    /// 处理滚轮事件
    pub fn on_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        self.wheel_delta += match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
        };
    }

    /// 帧结束：提交本帧鼠标位置为“上一帧位置”，清零滚轮增量
    pub fn end_frame(&mut self) {
        self.last_mouse_pos = self.mouse_pos;
        self.wheel_delta = 0.0;
    }

    /// 窗口失去焦点时清空按下状态
    pub fn reset(&mut self) {
        self.pressed_keys.clear();
        self.mouse_buttons.clear();
        self.wheel_delta = 0.0;
        self.first_mouse = true;
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    /// 当前鼠标位置（窗口像素坐标）
    pub fn mouse_position(&self) -> (f32, f32) {
        self.mouse_pos
    }

    /// 上一帧鼠标位置
    pub fn last_mouse_position(&self) -> (f32, f32) {
        self.last_mouse_pos
    }

    /// 相对上一帧的鼠标位移
    pub fn mouse_delta(&self) -> (f32, f32) {
        (
            self.mouse_pos.0 - self.last_mouse_pos.0,
            self.mouse_pos.1 - self.last_mouse_pos.1,
        )
    }

    /// 本帧的滚轮增量
    pub fn wheel_delta(&self) -> f32 {
        self.wheel_delta
    }

    /// 鼠标是否位于矩形 `[x, x + w) × [y, y + h)` 内
    pub fn mouse_in_area(&self, x: f32, y: f32, w: f32, h: f32) -> bool {
        let (mx, my) = self.mouse_pos;
        mx >= x && mx < x + w && my >= y && my < y + h
    }
}
