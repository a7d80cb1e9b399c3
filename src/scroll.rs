//! 按住触发键移动鼠标来滚动

use serde::Deserialize;
use tracing::debug;

use crate::{
    event_model::Buttons,
    quirks::{Quirk, QuirkSet},
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrollSettings {
    pub enabled: bool,
    pub horizontal: bool,
    /// 每多少像素滚一格
    pub speed: u32,
    /// 按住后移动超过多少像素才开始滚动
    pub threshold: u32,
    /// 1 起始的按键编号, 默认中键
    pub trigger_button: u8,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            horizontal: false,
            speed: 2,
            threshold: 3,
            trigger_button: 2,
        }
    }
}

impl ScrollSettings {
    pub fn with_quirks(mut self, quirks: &QuirkSet) -> Self {
        if let Some(v) = quirks.get_bool(Quirk::MousedVirtualScrollEnable) {
            self.enabled = v;
        }
        if let Some(v) = quirks.get_bool(Quirk::MousedHorScrollEnable) {
            self.horizontal = v;
        }
        if let Some(v) = quirks.get_uint(Quirk::MousedVirtualScrollSpeed) {
            self.speed = v;
        }
        if let Some(v) = quirks.get_uint(Quirk::MousedVirtualScrollThreshold) {
            self.threshold = v;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollState {
    #[default]
    NotScrolling,
    Prepare,
    Scrolling,
}

/// 经过滚动检测后的一帧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollStep {
    pub buttons: Buttons,
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
    pub dw: i32,
    /// 需要立即补发一次按下+松开的按键
    pub click: Option<Buttons>,
}

#[derive(Debug)]
pub struct ScrollDetector {
    trigger: Buttons,
    horizontal: bool,
    speed: i32,
    threshold: i32,
    state: ScrollState,
    acc_x: i32,
    acc_y: i32,
}

impl ScrollDetector {
    pub fn new(settings: &ScrollSettings) -> Self {
        Self {
            trigger: Buttons::button(settings.trigger_button),
            horizontal: settings.horizontal,
            speed: settings.speed.clamp(1, i32::MAX as u32) as i32,
            threshold: settings.threshold.min(i32::MAX as u32) as i32,
            state: ScrollState::NotScrolling,
            acc_x: 0,
            acc_y: 0,
        }
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn process(&mut self, buttons: Buttons, dx: i32, dy: i32) -> ScrollStep {
        let mut step = ScrollStep {
            buttons,
            dx,
            dy,
            ..ScrollStep::default()
        };
        match self.state {
            ScrollState::NotScrolling if buttons == self.trigger => {
                self.state = ScrollState::Prepare;
                self.acc_x = 0;
                self.acc_y = 0;
                self.prepare(&mut step);
            }
            ScrollState::NotScrolling => {}
            ScrollState::Prepare if buttons.contains(self.trigger) => self.prepare(&mut step),
            ScrollState::Prepare => {
                // 没动就松开了, 还原成一次普通点击
                self.state = ScrollState::NotScrolling;
                step.click = Some(self.trigger);
            }
            ScrollState::Scrolling if buttons.contains(self.trigger) => self.scroll(&mut step),
            ScrollState::Scrolling => {
                debug!("virtual scroll finished");
                self.state = ScrollState::NotScrolling;
            }
        }
        step
    }

    fn prepare(&mut self, step: &mut ScrollStep) {
        step.buttons -= self.trigger;
        self.acc_x += step.dx;
        self.acc_y += step.dy;
        step.dx = 0;
        step.dy = 0;
        if self.acc_y.abs() > self.threshold
            || (self.horizontal && self.acc_x.abs() > self.threshold)
        {
            debug!("virtual scroll started");
            self.state = ScrollState::Scrolling;
            self.acc_x = 0;
            self.acc_y = 0;
            step.click = Some(self.trigger);
        }
    }

    fn scroll(&mut self, step: &mut ScrollStep) {
        step.buttons -= self.trigger;
        self.acc_y += step.dy;
        step.dz = self.acc_y / self.speed;
        self.acc_y %= self.speed;
        if self.horizontal {
            self.acc_x += step.dx;
            step.dw = self.acc_x / self.speed;
            self.acc_x %= self.speed;
        }
        step.dx = 0;
        step.dy = 0;
    }
}
