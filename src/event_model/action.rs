use bitflags::bitflags;

use super::{codes, event::Timestamp};

/// 物理按键数量上限
pub const MAX_BUTTONS: usize = 16;

bitflags! {
    /// 按键位图, 第 n 位对应第 n+1 号键
    ///
    /// 和传统 BSD 鼠标协议一致: 1 号是左键, 2 号是中键, 3 号是右键
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u32 {
        const LEFT = 1 << 0;
        const MIDDLE = 1 << 1;
        const RIGHT = 1 << 2;
        const _ = !0;
    }
}

impl Buttons {
    /// 1 起始的按键编号
    pub fn button(number: u8) -> Self {
        match number {
            1..=32 => Self::from_bits_retain(1 << (number - 1)),
            _ => Self::empty(),
        }
    }

    /// evdev 按键码映射到按键位
    pub fn from_key_code(code: u16) -> Option<Self> {
        let number = match code {
            codes::BTN_LEFT => 1,
            codes::BTN_MIDDLE => 2,
            codes::BTN_RIGHT => 3,
            codes::BTN_SIDE => 4,
            codes::BTN_EXTRA => 5,
            codes::BTN_FORWARD => 6,
            codes::BTN_BACK => 7,
            codes::BTN_TASK => 8,
            _ => return None,
        };
        Some(Self::button(number))
    }
}

/// 单个按键的状态变化, `clicks` 是连击计数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: u8,
    pub pressed: bool,
    pub clicks: u32,
}

/// 交给显示系统注入层的最终指针动作
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerAction {
    pub time: Timestamp,
    pub dx: i32,
    pub dy: i32,
    /// 垂直滚轮, 负数向上
    pub dz: i32,
    /// 水平滚轮, 负数向左
    pub dw: i32,
    pub buttons: Buttons,
    pub button_events: Vec<ButtonEvent>,
}

impl PointerAction {
    pub fn has_motion(&self) -> bool {
        self.dx != 0 || self.dy != 0 || self.dz != 0 || self.dw != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_numbers_map_to_bits() {
        assert_eq!(Buttons::button(1), Buttons::LEFT);
        assert_eq!(Buttons::button(2), Buttons::MIDDLE);
        assert_eq!(Buttons::button(3), Buttons::RIGHT);
        assert_eq!(Buttons::button(0), Buttons::empty());
        assert_eq!(Buttons::from_key_code(codes::BTN_RIGHT), Some(Buttons::RIGHT));
        assert_eq!(Buttons::from_key_code(codes::BTN_TOUCH), None);
    }

    #[test]
    fn complement_keeps_extra_buttons() {
        let all = Buttons::LEFT | Buttons::button(9);
        assert_eq!(all & !Buttons::LEFT, Buttons::button(9));
    }
}
