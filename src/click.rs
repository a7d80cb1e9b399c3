//! 连击计数
//!
//! 按下时距离上次动作不到阈值就累加, 否则从 1 重新计; 松开不改计数

use std::time::Duration;

use serde::Deserialize;

use crate::{
    event_model::{ButtonEvent, Buttons, Timestamp, action::MAX_BUTTONS},
    quirks::{Quirk, QuirkSet},
};

/// 滚轮映射出的虚拟按键数量
pub const WHEEL_BUTTONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClickSettings {
    pub threshold_ms: u64,
}

impl Default for ClickSettings {
    fn default() -> Self {
        Self { threshold_ms: 500 }
    }
}

impl ClickSettings {
    pub fn with_quirks(mut self, quirks: &QuirkSet) -> Self {
        if let Some(v) = quirks.get_uint(Quirk::MousedClickThreshold) {
            self.threshold_ms = u64::from(v);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ButtonRecord {
    count: u32,
    at: Option<Timestamp>,
}

impl ButtonRecord {
    fn update(&mut self, now: Timestamp, pressed: bool, threshold: Duration) -> u32 {
        if pressed {
            let recent = self
                .at
                .is_some_and(|at| now.saturating_sub(at) < threshold);
            self.count = if recent { self.count + 1 } else { 1 };
        }
        self.at = Some(now);
        self.count
    }
}

#[derive(Debug)]
pub struct ClickTracker {
    threshold: Duration,
    buttons: [ButtonRecord; MAX_BUTTONS],
    wheel: [ButtonRecord; WHEEL_BUTTONS],
    last: Buttons,
}

impl ClickTracker {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            buttons: [ButtonRecord::default(); MAX_BUTTONS],
            wheel: [ButtonRecord::default(); WHEEL_BUTTONS],
            last: Buttons::empty(),
        }
    }

    /// 上一次看到的按键状态
    pub fn buttons(&self) -> Buttons {
        self.last
    }

    /// 对比上一帧, 给每个变化的按键生成一个事件
    ///
    /// `wheel_base` 起的四个按键使用滚轮专用的计数记录
    pub fn update(
        &mut self,
        now: Timestamp,
        buttons: Buttons,
        wheel_base: Option<u8>,
    ) -> Vec<ButtonEvent> {
        let changed = buttons ^ self.last;
        self.last = buttons;

        let mut events = Vec::new();
        for bit in 0..u32::BITS {
            if changed.bits() & (1 << bit) == 0 {
                continue;
            }
            let number = bit as u8 + 1;
            let pressed = buttons.bits() & (1 << bit) != 0;
            let wheel_slot = wheel_base
                .filter(|&base| base > 0 && number >= base)
                .map(|base| usize::from(number - base))
                .filter(|&slot| slot < WHEEL_BUTTONS);
            let record = match wheel_slot {
                Some(slot) => &mut self.wheel[slot],
                None if (bit as usize) < MAX_BUTTONS => &mut self.buttons[bit as usize],
                None => continue,
            };
            let clicks = record.update(now, pressed, self.threshold);
            events.push(ButtonEvent {
                button: number,
                pressed,
                clicks,
            });
        }
        events
    }
}
