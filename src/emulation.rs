//! 左右键同时按下模拟中键
//!
//! 十状态机, 输入是左右键组合或超时. S1/S2/S4/S8 是延迟态, 进入后开一个短定时器

use std::time::Duration;

use serde::Deserialize;
use tracing::trace;

use crate::{
    event_model::{Buttons, Timestamp},
    quirks::{Quirk, QuirkSet},
};

/// 延迟态里最多容忍几帧位移, 超过就当作超时立即结算
const JITTER_EVENTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmulationSettings {
    pub enabled: bool,
    pub timeout_ms: u64,
}

impl Default for EmulationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: 100,
        }
    }
}

impl EmulationSettings {
    pub fn with_quirks(mut self, quirks: &QuirkSet) -> Self {
        if let Some(enabled) = quirks.get_bool(Quirk::MousedEmulateThirdButton) {
            self.enabled = enabled;
        }
        if let Some(timeout) = quirks.get_uint(Quirk::MousedEmulateThirdButtonTimeout) {
            self.timeout_ms = u64::from(timeout);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmulationState {
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    S8,
    S9,
}

/// 转移类别, 也是状态表的列号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    BothUp = 0,
    RightDown = 1,
    LeftDown = 2,
    BothDown = 3,
    Timeout = 4,
}

impl Transition {
    fn classify(buttons: Buttons) -> Self {
        match (
            buttons.contains(Buttons::LEFT),
            buttons.contains(Buttons::RIGHT),
        ) {
            (false, false) => Transition::BothUp,
            (false, true) => Transition::RightDown,
            (true, false) => Transition::LeftDown,
            (true, true) => Transition::BothDown,
        }
    }
}

struct Entry {
    next: [EmulationState; 5],
    buttons: Buttons,
    mask: Buttons,
    delayed: bool,
}

const ALL: Buttons = Buttons::all();
const NO_LEFT: Buttons = Buttons::LEFT.complement();
const NO_RIGHT: Buttons = Buttons::RIGHT.complement();
const NO_LR: Buttons = Buttons::LEFT.union(Buttons::RIGHT).complement();
const NONE: Buttons = Buttons::empty();

use EmulationState::*;

#[rustfmt::skip]
const TABLE: [Entry; 10] = [
    Entry { next: [S0, S2, S1, S3, S0], buttons: NONE, mask: NO_LR, delayed: false },
    Entry { next: [S4, S2, S1, S3, S5], buttons: NONE, mask: NO_LEFT, delayed: true },
    Entry { next: [S8, S2, S1, S3, S6], buttons: NONE, mask: NO_RIGHT, delayed: true },
    Entry { next: [S0, S9, S9, S3, S3], buttons: Buttons::MIDDLE, mask: NO_LR, delayed: false },
    Entry { next: [S0, S2, S1, S3, S0], buttons: Buttons::LEFT, mask: ALL, delayed: true },
    Entry { next: [S0, S2, S5, S7, S5], buttons: Buttons::LEFT, mask: ALL, delayed: false },
    Entry { next: [S0, S6, S1, S7, S6], buttons: Buttons::RIGHT, mask: ALL, delayed: false },
    Entry { next: [S0, S6, S5, S7, S7], buttons: Buttons::MIDDLE, mask: ALL, delayed: false },
    Entry { next: [S0, S2, S1, S3, S0], buttons: Buttons::RIGHT, mask: ALL, delayed: true },
    Entry { next: [S0, S9, S9, S3, S9], buttons: NONE, mask: NO_LR, delayed: false },
];

#[derive(Debug)]
pub struct ThirdButtonEmulator {
    timeout: Duration,
    state: EmulationState,
    since: Timestamp,
    moves: u32,
    last_input: Buttons,
}

impl ThirdButtonEmulator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: S0,
            since: Duration::ZERO,
            moves: 0,
            last_input: Buttons::empty(),
        }
    }

    pub fn state(&self) -> EmulationState {
        self.state
    }

    fn entry(&self) -> &'static Entry {
        &TABLE[self.state as usize]
    }

    fn transition(&mut self, now: Timestamp, transition: Transition) {
        let next = self.entry().next[transition as usize];
        if next != self.state {
            trace!(from = ?self.state, to = ?next, ?transition, "third button emulation");
            self.state = next;
            self.since = now;
            self.moves = 0;
        }
    }

    fn output(&self, input: Buttons) -> Buttons {
        let entry = self.entry();
        (input & entry.mask) | entry.buttons
    }

    fn expired(&self, now: Timestamp) -> bool {
        // 恰好到期也算, 定时器在 deadline 那一刻触发时必须能结算
        now.saturating_sub(self.since) >= self.timeout
    }

    /// 处理一帧的物理按键
    ///
    /// 延迟态先因为位移或超时被结算时, 第一个返回值是结算出的中间按键状态
    pub fn process(
        &mut self,
        now: Timestamp,
        input: Buttons,
        moved: bool,
    ) -> (Option<Buttons>, Buttons) {
        let mut settled = None;
        if self.entry().delayed {
            if moved {
                self.moves += 1;
            }
            if self.moves > JITTER_EVENTS || self.expired(now) {
                self.transition(now, Transition::Timeout);
                settled = Some(self.output(self.last_input));
            }
        }
        self.transition(now, Transition::classify(input));
        self.last_input = input;
        (settled, self.output(input))
    }

    /// 定时器到期
    pub fn on_timeout(&mut self, now: Timestamp) -> Option<Buttons> {
        if !self.entry().delayed || !self.expired(now) {
            return None;
        }
        self.transition(now, Transition::Timeout);
        Some(self.output(self.last_input))
    }

    /// 处于延迟态时定时器的到期时间
    pub fn deadline(&self) -> Option<Timestamp> {
        self.entry().delayed.then(|| self.since + self.timeout)
    }
}
