use std::time::Duration;

use num_enum::{FromPrimitive, IntoPrimitive};

/// 单调时钟上的时间点, 以某个固定起点为零
///
/// 所有状态机共用同一个时钟源, 超时比较才不会互相漂移
pub type Timestamp = Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum EventKind {
    Sync = 0x00,
    Key = 0x01,
    Relative = 0x02,
    Absolute = 0x03,
    #[num_enum(catch_all)]
    Other(u16),
}

/// 解码层交给我们的标准化事件, `(type, code, value)` 加上时间戳
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub time: Timestamp,
    pub kind: EventKind,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub fn new(time: Timestamp, kind: EventKind, code: u16, value: i32) -> Self {
        Self {
            time,
            kind,
            code,
            value,
        }
    }

    pub fn sync(time: Timestamp) -> Self {
        Self::new(time, EventKind::Sync, super::codes::SYN_REPORT, 0)
    }

    pub fn relative(time: Timestamp, code: u16, value: i32) -> Self {
        Self::new(time, EventKind::Relative, code, value)
    }

    pub fn absolute(time: Timestamp, code: u16, value: i32) -> Self {
        Self::new(time, EventKind::Absolute, code, value)
    }

    pub fn key(time: Timestamp, code: u16, pressed: bool) -> Self {
        Self::new(time, EventKind::Key, code, pressed as i32)
    }

    pub fn is_sync(&self) -> bool {
        self.kind == EventKind::Sync && self.code == super::codes::SYN_REPORT
    }
}
