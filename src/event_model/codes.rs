//! evdev 事件码
//!
//! 常量只收录守护进程自己用到的部分, 名字解析走 libevdev 的完整表

use evdev_rs::{
    enums::{EventCode, EventType, InputProp, int_to_event_type},
    util::event_code_to_int,
};

pub const SYN_REPORT: u16 = 0x00;

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;
pub const EV_ABS: u16 = 0x03;

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_HWHEEL: u16 = 0x06;
pub const REL_WHEEL: u16 = 0x08;

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_PRESSURE: u16 = 0x18;
pub const ABS_TOOL_WIDTH: u16 = 0x1c;

pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_MIDDLE: u16 = 0x112;
pub const BTN_SIDE: u16 = 0x113;
pub const BTN_EXTRA: u16 = 0x114;
pub const BTN_FORWARD: u16 = 0x115;
pub const BTN_BACK: u16 = 0x116;
pub const BTN_TASK: u16 = 0x117;

pub const BTN_TOOL_FINGER: u16 = 0x145;
pub const BTN_TOUCH: u16 = 0x14a;
pub const BTN_TOOL_DOUBLETAP: u16 = 0x14d;
pub const BTN_TOOL_TRIPLETAP: u16 = 0x14e;
pub const BTN_TOOL_QUADTAP: u16 = 0x14f;

pub const INPUT_PROP_POINTER: u16 = 0x00;
pub const INPUT_PROP_DIRECT: u16 = 0x01;
pub const INPUT_PROP_BUTTONPAD: u16 = 0x02;
pub const INPUT_PROP_SEMI_MT: u16 = 0x03;
pub const INPUT_PROP_TOPBUTTONPAD: u16 = 0x04;
pub const INPUT_PROP_POINTINGSTICK: u16 = 0x05;
pub const INPUT_PROP_ACCELEROMETER: u16 = 0x06;

/// 解析 `0x..` 或十进制数字
pub fn parse_number(text: &str) -> Option<u16> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn code_value(code: &EventCode) -> u16 {
    event_code_to_int(code).1 as u16
}

pub fn event_type_from_name(name: &str) -> Option<u16> {
    EventType::from_str(name)
        .map(|ty| ty as u16)
        .or_else(|| parse_number(name))
}

/// 按名字查事件码, 名字必须属于给定的事件类型
pub fn event_code_from_name(event_type: u16, name: &str) -> Option<u16> {
    let named = int_to_event_type(u32::from(event_type))
        .and_then(|ty| EventCode::from_str(&ty, name))
        .map(|code| code_value(&code));
    named.or_else(|| parse_number(name))
}

/// 只有类型没有事件码的名字 (比如 `EV_REL`), 返回类型本身
///
/// 事件码名字的类型由前缀决定, `BTN_*` 归 `EV_KEY`
pub fn event_code_lookup(name: &str) -> Option<(u16, Option<u16>)> {
    if let Some(ty) = EventType::from_str(name) {
        return Some((ty as u16, None));
    }
    let ty = match name.split_once('_')?.0 {
        "KEY" | "BTN" => EventType::EV_KEY,
        prefix => EventType::from_str(&format!("EV_{prefix}"))?,
    };
    let code = EventCode::from_str(&ty, name)?;
    Some((ty as u16, Some(code_value(&code))))
}

pub fn input_prop_from_name(name: &str) -> Option<u16> {
    InputProp::from_str(name)
        .map(|prop| prop as u16)
        .or_else(|| parse_number(name))
}
