//! 事件录制文件的回放
//!
//! 每行一个事件: `<毫秒> <类型> <事件码> <值>`, 类型和事件码可以写名字或数字,
//! `#` 开头的行和空行忽略
//!
//! ```text
//! 0   EV_REL REL_X 5
//! 0   EV_SYN SYN_REPORT 0
//! 12  EV_KEY BTN_LEFT 1
//! ```

use std::time::Duration;

use thiserror::Error;
use tokio::{
    sync::mpsc,
    time::{Instant, sleep_until},
};
use tracing::debug;

use crate::{
    event_model::{EventKind, InputEvent, codes},
    pipeline::event_loop::{DeviceId, DeviceMessage},
};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct TraceError {
    pub line: usize,
    pub reason: String,
}

fn parse_line(text: &str) -> Result<Option<InputEvent>, String> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }
    let fields: Vec<&str> = text.split_whitespace().collect();
    let [time, event_type, code, value] = fields[..] else {
        return Err(format!("expected 4 fields, found {}", fields.len()));
    };
    let time: u64 = time
        .parse()
        .map_err(|_| format!("invalid timestamp `{time}`"))?;
    let event_type = codes::event_type_from_name(event_type)
        .ok_or_else(|| format!("unknown event type `{event_type}`"))?;
    let code = codes::event_code_from_name(event_type, code)
        .ok_or_else(|| format!("unknown event code `{code}`"))?;
    let value: i32 = value
        .parse()
        .map_err(|_| format!("invalid value `{value}`"))?;
    Ok(Some(InputEvent::new(
        Duration::from_millis(time),
        EventKind::from(event_type),
        code,
        value,
    )))
}

/// 解析整个录制文件, 时间戳必须单调不减
pub fn parse_trace(text: &str) -> Result<Vec<InputEvent>, TraceError> {
    let mut events: Vec<InputEvent> = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let error = |reason| TraceError {
            line: index + 1,
            reason,
        };
        let Some(event) = parse_line(line).map_err(error)? else {
            continue;
        };
        if events.last().is_some_and(|last| last.time > event.time) {
            return Err(error("timestamp goes backwards".to_string()));
        }
        events.push(event);
    }
    Ok(events)
}

/// 按时间戳把事件送进事件循环, 最后再等 `linger` 让挂起的定时器到期
pub async fn feed(
    sender: mpsc::Sender<(DeviceId, DeviceMessage)>,
    device: DeviceId,
    epoch: Instant,
    events: Vec<InputEvent>,
    linger: Duration,
) -> Result<(), mpsc::error::SendError<(DeviceId, DeviceMessage)>> {
    let mut last = Duration::ZERO;
    for event in events {
        sleep_until(epoch + event.time).await;
        last = event.time;
        sender.send((device, DeviceMessage::Event(event))).await?;
    }
    sleep_until(epoch + last + linger).await;
    debug!(device, "replay finished");
    sender.send((device, DeviceMessage::Detach)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_numbers_and_comments() {
        let events = parse_trace(
            "# mouse\n\
             0 EV_REL REL_X 5\n\
             \n\
             3 2 0x08 -1\n\
             3 EV_SYN SYN_REPORT 0\n",
        )
        .unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            InputEvent::relative(Duration::ZERO, codes::REL_X, 5)
        );
        assert_eq!(
            events[1],
            InputEvent::relative(Duration::from_millis(3), codes::REL_WHEEL, -1)
        );
        assert!(events[2].is_sync());
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = parse_trace("0 EV_REL REL_X 1\n1 EV_KEY REL_X\n").unwrap_err();
        assert_eq!(err.line, 2);

        let err = parse_trace("0 EV_KEY BTN_NOPE 1\n").unwrap_err();
        assert_eq!(err.reason, "unknown event code `BTN_NOPE`");

        let err = parse_trace("5 EV_SYN SYN_REPORT 0\n4 EV_SYN SYN_REPORT 0\n").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
