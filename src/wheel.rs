use crate::event_model::Buttons;

/// 把滚轮位移映射成按键 N..N+3: 上, 下, 左, 右
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelButtons {
    base: u8,
}

impl WheelButtons {
    /// `base` 为 0 表示不映射
    pub fn new(base: u8) -> Option<Self> {
        (base > 0 && usize::from(base) + 3 <= u32::BITS as usize).then_some(Self { base })
    }

    pub fn base(&self) -> u8 {
        self.base
    }

    /// 消耗滚轮位移, 返回本帧要点一下的按键
    pub fn map(&self, dz: &mut i32, dw: &mut i32) -> Buttons {
        let mut buttons = Buttons::empty();
        match (*dz).signum() {
            -1 => buttons |= Buttons::button(self.base),
            1 => buttons |= Buttons::button(self.base + 1),
            _ => {}
        }
        match (*dw).signum() {
            -1 => buttons |= Buttons::button(self.base + 2),
            1 => buttons |= Buttons::button(self.base + 3),
            _ => {}
        }
        *dz = 0;
        *dw = 0;
        buttons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_directions_map_to_consecutive_buttons() {
        let wheel = WheelButtons::new(4).unwrap();
        let (mut dz, mut dw) = (-2, 0);
        assert_eq!(wheel.map(&mut dz, &mut dw), Buttons::button(4));
        assert_eq!((dz, dw), (0, 0));

        let (mut dz, mut dw) = (1, 3);
        assert_eq!(
            wheel.map(&mut dz, &mut dw),
            Buttons::button(5) | Buttons::button(7)
        );
    }

    #[test]
    fn zero_base_disables_mapping() {
        assert!(WheelButtons::new(0).is_none());
        assert!(WheelButtons::new(31).is_none());
    }
}
