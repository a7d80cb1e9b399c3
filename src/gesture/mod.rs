//! 触摸板手势: 轻触, 轻触拖拽, 双指/边缘滚动, 手掌过滤

pub mod config;

use std::mem;

use tracing::{debug, trace};

pub use config::{TouchpadSettings, resolve_caps};

use crate::{
    device::TouchpadCaps,
    event_model::{Buttons, Timestamp, TouchFrame},
};

/// 一帧的分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// 丢弃本帧位移
    Ignore,
    /// 先攒着, 这次接触还可能是轻触
    Accumulate,
    /// 攒下的位移加上本帧一起输出
    Move { dx: i32, dy: i32 },
    /// 垂直滚动, 负数向上
    VScroll(i32),
    /// 水平滚动, 负数向左
    HScroll(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureOutput {
    pub motion: Motion,
    pub buttons: Buttons,
}

/// 滚动方向累加器的取值
const SCROLL_HORIZONTAL: u8 = 1;
const SCROLL_VERTICAL: u8 = 2;

#[derive(Debug, Default)]
struct GestureState {
    finger_down: bool,
    in_taphold: bool,
    tap_button: Buttons,
    peak_pressure: u32,
    peak_fingers: u8,
    start_x: i32,
    start_y: i32,
    prev_x: i32,
    prev_y: i32,
    prev_fingers: u8,
    /// `None` 表示这次接触已经不可能是轻触
    tap_deadline: Option<Timestamp>,
    scroll: u8,
    /// 滚动时不足 1mm 的余量, 单位是设备单位
    scroll_rem_x: i32,
    scroll_rem_y: i32,
    idle_at: Option<Timestamp>,
    pending_dx: i32,
    pending_dy: i32,
    last_touching: bool,
    last_buttons: Buttons,
}

/// 每个触摸板一个实例
#[derive(Debug)]
pub struct GestureEngine {
    settings: TouchpadSettings,
    caps: TouchpadCaps,
    state: GestureState,
}

impl GestureEngine {
    /// `caps` 应该已经过 [`resolve_caps`], 分辨率不为 0
    pub fn new(settings: TouchpadSettings, caps: TouchpadCaps) -> Self {
        Self {
            settings,
            caps,
            state: GestureState::default(),
        }
    }

    pub fn settings(&self) -> &TouchpadSettings {
        &self.settings
    }

    /// 空闲定时器的绝对到期时间
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.state.idle_at
    }

    /// 处理一帧, 手掌帧返回 `None`
    pub fn process(&mut self, frame: &TouchFrame) -> Option<GestureOutput> {
        let s = &self.settings;
        let touching = frame.pressure >= s.pressure_high
            || (self.state.finger_down && frame.pressure >= s.pressure_low);
        if touching {
            return self.touch(frame);
        }
        self.state.last_buttons = frame.buttons;
        let buttons = self.release(frame.time, false, frame.buttons);
        Some(GestureOutput {
            motion: Motion::Ignore,
            buttons,
        })
    }

    /// 空闲定时器到期, 返回新的按键状态
    pub fn on_idle(&mut self, now: Timestamp) -> Option<Buttons> {
        self.state.idle_at.take()?;
        if self.state.last_touching {
            return None;
        }
        let physical = self.state.last_buttons;
        Some(self.release(now, true, physical))
    }

    fn touch(&mut self, frame: &TouchFrame) -> Option<GestureOutput> {
        let s = &self.settings;
        let caps = &self.caps;

        if frame.fingers == 1
            && ((caps.has_width && frame.width > s.max_width)
                || (caps.has_pressure && frame.pressure > s.max_pressure))
        {
            trace!(
                width = frame.width,
                pressure = frame.pressure,
                "palm rejected"
            );
            return None;
        }

        let x = frame
            .x
            .max(caps.min_x + s.margin_left)
            .min(caps.max_x - s.margin_right);
        let y = frame
            .y
            .max(caps.min_y + s.margin_top)
            .min(caps.max_y - s.margin_bottom);

        let st = &mut self.state;
        st.last_touching = true;
        st.last_buttons = frame.buttons;

        if !st.finger_down {
            st.finger_down = true;
            st.peak_pressure = 0;
            st.peak_fingers = 0;
            st.scroll = 0;
            st.scroll_rem_x = 0;
            st.scroll_rem_y = 0;
            st.tap_deadline = (s.tap_timeout_ms > 0).then(|| frame.time + s.tap_timeout());
            st.start_x = x;
            st.start_y = y;
            st.prev_x = x;
            st.prev_y = y;
            st.pending_dx = 0;
            st.pending_dy = 0;
            st.idle_at = None;
            trace!(x, y, "contact start");
        }

        let mut buttons = frame.buttons;
        if caps.is_clickpad && buttons.contains(Buttons::LEFT) {
            buttons = soft_button(s, st.start_x, st.start_y, buttons);
        }

        if st.in_taphold || (s.three_finger_drag && frame.fingers == 3) {
            buttons |= st.tap_button;
        }

        st.peak_pressure = st.peak_pressure.max(frame.pressure);
        st.peak_fingers = st.peak_fingers.max(frame.fingers);

        let from_start_x = x - st.start_x;
        let from_start_y = y - st.start_y;
        let res_x = f64::from(caps.res_x.max(1));
        let res_y = f64::from(caps.res_y.max(1));

        if st.scroll == 0 && !st.in_taphold && buttons.is_empty() {
            let min_delta_x = s.vscroll_min_delta * res_x;
            let min_delta_y = s.vscroll_min_delta * res_y;
            let moved_x = f64::from(from_start_x.abs()) > min_delta_x;
            let moved_y = f64::from(from_start_y.abs()) > min_delta_y;
            if moved_x || moved_y {
                if s.two_finger_scroll {
                    if frame.fingers == 2 {
                        if moved_y {
                            st.scroll += SCROLL_VERTICAL;
                        }
                        if moved_x {
                            st.scroll += SCROLL_HORIZONTAL;
                        }
                    }
                } else {
                    st.scroll = edge_scroll(s, caps, st.start_x, st.start_y);
                }
                if st.scroll >= SCROLL_VERTICAL + SCROLL_HORIZONTAL {
                    st.scroll = if from_start_x.abs() > from_start_y.abs() {
                        SCROLL_HORIZONTAL
                    } else {
                        SCROLL_VERTICAL
                    };
                }
                if st.scroll != 0 {
                    debug!(direction = st.scroll, "scroll direction locked");
                    st.tap_deadline = None;
                }
            }
        }
        if s.two_finger_scroll && (frame.fingers != 2 || !buttons.is_empty()) {
            st.scroll = 0;
        }

        if frame.fingers == 1 && st.tap_deadline.is_some_and(|d| frame.time <= d) {
            let max_x = s.tap_max_delta * res_x;
            let max_y = s.tap_max_delta * res_y;
            if f64::from(from_start_x.abs()) > max_x || f64::from(from_start_y.abs()) > max_y {
                trace!("moved too far for a tap");
                st.tap_deadline = None;
            }
        }

        let dx = x - st.prev_x;
        let dy = y - st.prev_y;
        st.prev_x = x;
        st.prev_y = y;
        if frame.fingers != st.prev_fingers {
            st.prev_fingers = frame.fingers;
            return Some(GestureOutput {
                motion: Motion::Ignore,
                buttons,
            });
        }

        let total_dx = mem::take(&mut st.pending_dx) + dx;
        let total_dy = mem::take(&mut st.pending_dy) + dy;
        let sign = if s.natural_scroll { -1 } else { 1 };
        let motion = match st.scroll {
            SCROLL_VERTICAL => {
                Motion::VScroll(-sign * scaled(&mut st.scroll_rem_y, total_dy, caps.res_y))
            }
            SCROLL_HORIZONTAL => {
                Motion::HScroll(sign * scaled(&mut st.scroll_rem_x, total_dx, caps.res_x))
            }
            _ if st.tap_deadline.is_some_and(|d| frame.time <= d) => {
                st.pending_dx = total_dx;
                st.pending_dy = total_dy;
                Motion::Accumulate
            }
            _ => Motion::Move {
                dx: total_dx,
                dy: total_dy,
            },
        };
        Some(GestureOutput { motion, buttons })
    }

    /// 接触结束, 或者空闲定时器到期
    fn release(&mut self, now: Timestamp, timer: bool, physical: Buttons) -> Buttons {
        let s = &self.settings;
        let st = &mut self.state;
        st.pending_dx = 0;
        st.pending_dy = 0;
        st.prev_fingers = 0;
        st.last_touching = false;

        if st.finger_down {
            let tapped = st.peak_pressure >= s.tap_threshold
                && st.tap_deadline.is_some_and(|d| now <= d);
            if tapped && st.in_taphold {
                // 双击: 先松开, 立刻再走一遍释放流程补上第二次按下
                debug!("double tap");
                st.in_taphold = false;
                st.idle_at = Some(now);
            } else if tapped {
                st.finger_down = false;
                st.in_taphold = true;
                st.tap_button = match st.peak_fingers {
                    3 => Buttons::MIDDLE,
                    2 => Buttons::RIGHT,
                    _ => Buttons::LEFT,
                };
                st.tap_deadline = Some(now + s.taphold_timeout());
                st.idle_at = st.tap_deadline;
                debug!(button = ?st.tap_button, "tap");
            } else {
                st.finger_down = false;
                st.in_taphold = false;
                st.idle_at = None;
            }
        } else if st.in_taphold {
            let expired = timer || st.tap_deadline.is_none_or(|d| now > d);
            if expired {
                trace!("tap hold released");
                st.in_taphold = false;
                st.idle_at = None;
            }
        }

        if st.in_taphold {
            physical | st.tap_button
        } else {
            physical
        }
    }
}

/// clickpad 上按下时按起始位置换成中键或右键
fn soft_button(s: &TouchpadSettings, start_x: i32, start_y: i32, buttons: Buttons) -> Buttons {
    let y_ok = if s.softbuttons_y >= 0 {
        start_y >= s.softbuttons_y
    } else {
        start_y <= -s.softbuttons_y
    };
    let (mut center_x, mut center_bt) = (s.softbutton2_x, Buttons::MIDDLE);
    let (mut right_x, mut right_bt) = (s.softbutton3_x, Buttons::RIGHT);
    if center_x > 0 && right_x > 0 && center_x > right_x {
        mem::swap(&mut center_x, &mut right_x);
        mem::swap(&mut center_bt, &mut right_bt);
    }
    if right_x > 0 && start_x > right_x && y_ok {
        (buttons - Buttons::LEFT) | right_bt
    } else if center_x > 0 && start_x > center_x && y_ok {
        (buttons - Buttons::LEFT) | center_bt
    } else {
        buttons
    }
}

/// 边缘滚动: 起点落在哪条边带里就锁定哪个方向
fn edge_scroll(s: &TouchpadSettings, caps: &TouchpadCaps, start_x: i32, start_y: i32) -> u8 {
    let hor = (s.vscroll_hor_area * f64::from(caps.res_y)) as i32;
    let ver = (s.vscroll_ver_area * f64::from(caps.res_x)) as i32;
    let mut scroll = 0;
    if (hor > 0 && start_y > caps.max_y - hor) || (hor < 0 && start_y < caps.min_y - hor) {
        scroll += SCROLL_HORIZONTAL;
    }
    if (ver > 0 && start_x < caps.min_x + ver) || (ver < 0 && start_x > caps.max_x + ver) {
        scroll += SCROLL_VERTICAL;
    }
    scroll
}

/// 设备单位换算成毫米, 不足 1mm 的部分留在 `rem` 里等下一帧
fn scaled(rem: &mut i32, delta: i32, res: i32) -> i32 {
    let res = res.max(1);
    *rem += delta;
    let ticks = *rem / res;
    *rem %= res;
    ticks
}
