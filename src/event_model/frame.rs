use tracing::trace;

use super::{
    action::Buttons,
    codes,
    event::{EventKind, InputEvent, Timestamp},
};
use crate::device::{DeviceClass, TouchpadCaps};

/// 元组里代表"该类型的所有事件码"的占位值
pub const ANY_CODE: u16 = u16::MAX;

/// 一帧相对设备输入, 已经按 `SYN_REPORT` 合并
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseFrame {
    pub time: Timestamp,
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
    pub dw: i32,
    pub buttons: Buttons,
}

/// 一帧触摸板输入
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchFrame {
    pub time: Timestamp,
    pub x: i32,
    pub y: i32,
    pub pressure: u32,
    pub width: u32,
    pub fingers: u8,
    pub buttons: Buttons,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFrame {
    Mouse(MouseFrame),
    Touchpad(TouchFrame),
}

impl DeviceFrame {
    pub fn time(&self) -> Timestamp {
        match self {
            DeviceFrame::Mouse(frame) => frame.time,
            DeviceFrame::Touchpad(frame) => frame.time,
        }
    }
}

#[derive(Debug, Default)]
struct TouchState {
    x: i32,
    y: i32,
    pressure: u32,
    width: u32,
    touching: bool,
    tools: u8,
}

/// 把标准化事件流按同步事件拼成帧
#[derive(Debug)]
pub struct FrameAssembler {
    class: DeviceClass,
    has_pressure: bool,
    synthetic_pressure: u32,
    disabled: Vec<(u16, u16)>,
    rel: MouseFrame,
    touch: TouchState,
    buttons: Buttons,
}

impl FrameAssembler {
    pub fn new(class: DeviceClass, caps: &TouchpadCaps, synthetic_pressure: u32) -> Self {
        Self {
            class,
            has_pressure: caps.has_pressure,
            synthetic_pressure,
            disabled: Vec::new(),
            rel: MouseFrame::default(),
            touch: TouchState::default(),
            buttons: Buttons::empty(),
        }
    }

    /// 屏蔽某个事件码, `code` 为 [`ANY_CODE`] 时屏蔽整个类型
    pub fn disable(&mut self, event_type: u16, code: u16) {
        if !self.disabled.contains(&(event_type, code)) {
            self.disabled.push((event_type, code));
        }
    }

    fn is_disabled(&self, event_type: u16, code: u16) -> bool {
        self.disabled
            .iter()
            .any(|&(t, c)| t == event_type && (c == code || c == ANY_CODE))
    }

    /// 喂入一个事件, 遇到同步事件时返回拼好的帧
    pub fn push(&mut self, event: &InputEvent) -> Option<DeviceFrame> {
        let event_type = u16::from(event.kind);
        if self.is_disabled(event_type, event.code) {
            trace!(code = event.code, "event code disabled by quirks");
            return None;
        }

        match event.kind {
            EventKind::Sync if event.is_sync() => return Some(self.finish(event.time)),
            EventKind::Relative => match event.code {
                codes::REL_X => self.rel.dx += event.value,
                codes::REL_Y => self.rel.dy += event.value,
                // 滚轮向上是正数, 这里翻转成"负数向上"
                codes::REL_WHEEL => self.rel.dz -= event.value,
                codes::REL_HWHEEL => self.rel.dw += event.value,
                _ => {}
            },
            EventKind::Absolute => match event.code {
                codes::ABS_X => self.touch.x = event.value,
                codes::ABS_Y => self.touch.y = event.value,
                codes::ABS_PRESSURE => self.touch.pressure = event.value.max(0) as u32,
                codes::ABS_TOOL_WIDTH => self.touch.width = event.value.max(0) as u32,
                _ => {}
            },
            EventKind::Key => {
                let pressed = event.value != 0;
                match event.code {
                    codes::BTN_TOUCH => self.touch.touching = pressed,
                    codes::BTN_TOOL_FINGER
                    | codes::BTN_TOOL_DOUBLETAP
                    | codes::BTN_TOOL_TRIPLETAP
                    | codes::BTN_TOOL_QUADTAP => {
                        let bit = 1 << tool_fingers(event.code);
                        if pressed {
                            self.touch.tools |= bit;
                        } else {
                            self.touch.tools &= !bit;
                        }
                    }
                    code => {
                        if let Some(button) = Buttons::from_key_code(code) {
                            self.buttons.set(button, pressed);
                        }
                    }
                }
            }
            _ => {}
        }
        None
    }

    fn finish(&mut self, time: Timestamp) -> DeviceFrame {
        match self.class {
            DeviceClass::Mouse => {
                let frame = MouseFrame {
                    time,
                    buttons: self.buttons,
                    ..self.rel
                };
                self.rel = MouseFrame::default();
                DeviceFrame::Mouse(frame)
            }
            DeviceClass::Touchpad => DeviceFrame::Touchpad(self.touch_frame(time)),
        }
    }

    fn touch_frame(&self, time: Timestamp) -> TouchFrame {
        let touch = &self.touch;
        let pressure = match (self.has_pressure, touch.touching) {
            // 没有压力轴的设备只能相信 BTN_TOUCH
            (false, true) => self.synthetic_pressure,
            (false, false) => 0,
            // 有压力却没有接触标志, 按没接触处理
            (true, false) => 0,
            (true, true) => touch.pressure,
        };
        let fingers = if touch.tools == 0 {
            u8::from(touch.touching)
        } else {
            (7 - touch.tools.leading_zeros()) as u8
        };
        TouchFrame {
            time,
            x: touch.x,
            y: touch.y,
            pressure,
            width: touch.width,
            fingers: if pressure == 0 { 0 } else { fingers },
            buttons: self.buttons,
        }
    }
}

fn tool_fingers(code: u16) -> u8 {
    match code {
        codes::BTN_TOOL_DOUBLETAP => 2,
        codes::BTN_TOOL_TRIPLETAP => 3,
        codes::BTN_TOOL_QUADTAP => 4,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn ms(v: u64) -> Timestamp {
        Duration::from_millis(v)
    }

    #[test]
    fn relative_events_are_summed_per_frame() {
        let mut asm = FrameAssembler::new(DeviceClass::Mouse, &TouchpadCaps::default(), 0);
        assert!(asm.push(&InputEvent::relative(ms(1), codes::REL_X, 3)).is_none());
        asm.push(&InputEvent::relative(ms(1), codes::REL_X, 2));
        asm.push(&InputEvent::relative(ms(1), codes::REL_WHEEL, 1));
        asm.push(&InputEvent::key(ms(1), codes::BTN_LEFT, true));
        let Some(DeviceFrame::Mouse(frame)) = asm.push(&InputEvent::sync(ms(1))) else {
            panic!("expected a mouse frame");
        };
        assert_eq!((frame.dx, frame.dy, frame.dz), (5, 0, -1));
        assert_eq!(frame.buttons, Buttons::LEFT);

        let Some(DeviceFrame::Mouse(frame)) = asm.push(&InputEvent::sync(ms(2))) else {
            panic!("expected a mouse frame");
        };
        assert_eq!((frame.dx, frame.dz), (0, 0));
        assert_eq!(frame.buttons, Buttons::LEFT);
    }

    #[test]
    fn disabled_codes_are_dropped() {
        let mut asm = FrameAssembler::new(DeviceClass::Mouse, &TouchpadCaps::default(), 0);
        asm.disable(codes::EV_REL, codes::REL_WHEEL);
        asm.push(&InputEvent::relative(ms(1), codes::REL_WHEEL, 1));
        asm.push(&InputEvent::relative(ms(1), codes::REL_X, 1));
        let Some(DeviceFrame::Mouse(frame)) = asm.push(&InputEvent::sync(ms(1))) else {
            panic!("expected a mouse frame");
        };
        assert_eq!((frame.dx, frame.dz), (1, 0));
    }

    #[test]
    fn touch_without_pressure_axis_uses_touch_flag() {
        let caps = TouchpadCaps {
            has_pressure: false,
            ..TouchpadCaps::default()
        };
        let mut asm = FrameAssembler::new(DeviceClass::Touchpad, &caps, 40);
        asm.push(&InputEvent::absolute(ms(1), codes::ABS_X, 100));
        asm.push(&InputEvent::key(ms(1), codes::BTN_TOUCH, true));
        asm.push(&InputEvent::key(ms(1), codes::BTN_TOOL_DOUBLETAP, true));
        let Some(DeviceFrame::Touchpad(frame)) = asm.push(&InputEvent::sync(ms(1))) else {
            panic!("expected a touchpad frame");
        };
        assert_eq!((frame.x, frame.pressure, frame.fingers), (100, 40, 2));
    }

    #[test]
    fn pressure_without_touch_flag_is_no_contact() {
        let mut asm = FrameAssembler::new(DeviceClass::Touchpad, &TouchpadCaps::default(), 40);
        asm.push(&InputEvent::absolute(ms(1), codes::ABS_PRESSURE, 70));
        let Some(DeviceFrame::Touchpad(frame)) = asm.push(&InputEvent::sync(ms(1))) else {
            panic!("expected a touchpad frame");
        };
        assert_eq!((frame.pressure, frame.fingers), (0, 0));
    }
}
