//! 静止设备的漂移过滤
//!
//! 设备空闲超过 `after` 之后, 小幅位移先攒在窗口里, 攒够 `distance` 才放行

use std::time::Duration;

use serde::Deserialize;
use tracing::trace;

use crate::{
    event_model::Timestamp,
    quirks::{Quirk, QuirkSet},
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriftSettings {
    pub enabled: bool,
    /// 曼哈顿距离, 像素
    pub distance: u32,
    pub time_ms: u64,
    pub after_ms: u64,
}

impl Default for DriftSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            distance: 4,
            time_ms: 500,
            after_ms: 4000,
        }
    }
}

impl DriftSettings {
    pub fn with_quirks(mut self, quirks: &QuirkSet) -> Self {
        if let Some(v) = quirks.get_bool(Quirk::MousedDriftTerminate) {
            self.enabled = v;
        }
        if let Some(v) = quirks.get_uint(Quirk::MousedDriftDistance) {
            self.distance = v;
        }
        if let Some(v) = quirks.get_uint(Quirk::MousedDriftTime) {
            self.time_ms = u64::from(v);
        }
        if let Some(v) = quirks.get_uint(Quirk::MousedDriftAfter) {
            self.after_ms = u64::from(v);
        }
        self
    }
}

#[derive(Debug)]
pub struct DriftFilter {
    distance: i32,
    time: Duration,
    after: Duration,
    current: (i32, i32),
    previous: (i32, i32),
    since: Option<Timestamp>,
    last_activity: Timestamp,
}

impl DriftFilter {
    pub fn new(settings: &DriftSettings) -> Self {
        Self {
            distance: settings.distance.min(i32::MAX as u32) as i32,
            time: Duration::from_millis(settings.time_ms),
            after: Duration::from_millis(settings.after_ms),
            current: (0, 0),
            previous: (0, 0),
            since: None,
            last_activity: Duration::ZERO,
        }
    }

    /// 过滤一帧的位移, 返回 `None` 表示这次位移被吞掉
    ///
    /// `active` 表示本帧有按键或滚轮之类的真实操作
    pub fn filter(&mut self, now: Timestamp, dx: i32, dy: i32, active: bool) -> Option<(i32, i32)> {
        if active || (dx == 0 && dy == 0) {
            self.last_activity = now;
            return Some((dx, dy));
        }
        if now.saturating_sub(self.last_activity) <= self.after {
            return Some((dx, dy));
        }

        let window = self.since.map(|since| now.saturating_sub(since));
        if window.is_none_or(|w| w > self.time) {
            self.previous = match window {
                Some(w) if w <= self.time * 2 => self.current,
                _ => (0, 0),
            };
            self.current = (0, 0);
            self.since = Some(now);
        }

        self.current.0 += dx;
        self.current.1 += dy;
        if self.current.0.abs() + self.current.1.abs() > self.distance {
            let released = (
                self.current.0 + self.previous.0,
                self.current.1 + self.previous.1,
            );
            trace!(?released, "movement after idle released");
            self.current = (0, 0);
            self.previous = (0, 0);
            self.since = None;
            self.last_activity = now;
            return Some(released);
        }
        None
    }
}
