//! 单线程事件循环: 所有设备的事件和定时器都在这里串行处理

use std::collections::HashMap;

use tokio::{
    sync::mpsc,
    time::{Instant, sleep_until},
};
use tracing::{debug, info, warn};

use super::DevicePipeline;
use crate::event_model::{InputEvent, PointerAction, Timestamp};

pub type DeviceId = u32;

#[derive(Debug)]
pub enum DeviceMessage {
    Attach(Box<DevicePipeline>),
    Event(InputEvent),
    Detach,
}

/// 指针动作的去处, 通常是显示系统的注入层
pub trait PointerSink {
    fn deliver(&mut self, device: DeviceId, action: PointerAction);
}

impl PointerSink for Vec<(DeviceId, PointerAction)> {
    fn deliver(&mut self, device: DeviceId, action: PointerAction) {
        self.push((device, action));
    }
}

pub fn channel(capacity: usize) -> (
    mpsc::Sender<(DeviceId, DeviceMessage)>,
    mpsc::Receiver<(DeviceId, DeviceMessage)>,
) {
    mpsc::channel(capacity)
}

pub struct EventLoop<S> {
    receiver: mpsc::Receiver<(DeviceId, DeviceMessage)>,
    devices: HashMap<DeviceId, DevicePipeline>,
    sink: S,
    epoch: Instant,
}

impl<S: PointerSink> EventLoop<S> {
    /// 事件时间戳从 `epoch` 起算, 和定时器共用同一个单调时钟
    pub fn new(
        receiver: mpsc::Receiver<(DeviceId, DeviceMessage)>,
        sink: S,
        epoch: Instant,
    ) -> Self {
        Self {
            receiver,
            devices: HashMap::new(),
            sink,
            epoch,
        }
    }

    fn now(&self) -> Timestamp {
        self.epoch.elapsed()
    }

    fn next_deadline(&self) -> Option<Timestamp> {
        self.devices
            .values()
            .filter_map(DevicePipeline::next_deadline)
            .min()
    }

    /// 所有发送端关闭后返回
    pub async fn run(mut self) -> S {
        loop {
            let wake = self.next_deadline().map(|d| self.epoch + d);
            tokio::select! {
                message = self.receiver.recv() => match message {
                    Some((id, message)) => self.handle(id, message),
                    None => break,
                },
                () = async {
                    match wake {
                        Some(at) => sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => self.fire_timers(),
            }
        }
        info!(devices = self.devices.len(), "event loop finished");
        self.sink
    }

    fn handle(&mut self, id: DeviceId, message: DeviceMessage) {
        match message {
            DeviceMessage::Attach(pipeline) => {
                info!(device = id, name = %pipeline.identity().name, "device attached");
                self.devices.insert(id, *pipeline);
            }
            DeviceMessage::Detach => {
                // 设备的定时器和 quirks 引用随之释放
                if self.devices.remove(&id).is_some() {
                    info!(device = id, "device detached");
                }
            }
            DeviceMessage::Event(event) => {
                let Some(pipeline) = self.devices.get_mut(&id) else {
                    warn!(device = id, "event for unknown device");
                    return;
                };
                for action in pipeline.handle_event(&event) {
                    self.sink.deliver(id, action);
                }
            }
        }
    }

    fn fire_timers(&mut self) {
        let now = self.now();
        for (&id, pipeline) in self.devices.iter_mut() {
            if !pipeline.next_deadline().is_some_and(|d| d <= now) {
                continue;
            }
            debug!(device = id, ?now, "timer expired");
            for action in pipeline.on_timeout(now) {
                self.sink.deliver(id, action);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::sleep;

    use super::*;
    use crate::{
        config::Config,
        device::{Bus, DeviceDescription, DeviceIdentity, TouchpadCaps, UdevType},
        event_model::{Buttons, codes},
        quirks::QuirksStore,
    };

    fn touchpad() -> DevicePipeline {
        let description = DeviceDescription {
            identity: DeviceIdentity {
                bus: Bus::I2c,
                vendor: 0x06cb,
                product: 0xcd7d,
                version: 0x0100,
                name: "SYNA3602:00 06CB:CD7D Touchpad".into(),
                uniq: String::new(),
                udev_type: UdevType::TOUCHPAD,
                dmi: None,
                dt: None,
            },
            touchpad: Some(TouchpadCaps {
                res_x: 10,
                res_y: 10,
                ..TouchpadCaps::default()
            }),
        };
        DevicePipeline::open(&description, &QuirksStore::new(), &Config::default()).unwrap()
    }

    fn contact(time: Duration, pressure: i32, fingers: bool) -> Vec<InputEvent> {
        vec![
            InputEvent::absolute(time, codes::ABS_X, 500),
            InputEvent::absolute(time, codes::ABS_Y, 500),
            InputEvent::absolute(time, codes::ABS_PRESSURE, pressure),
            InputEvent::key(time, codes::BTN_TOUCH, fingers),
            InputEvent::key(time, codes::BTN_TOOL_FINGER, fingers),
            InputEvent::sync(time),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn tap_release_is_driven_by_the_timer() {
        let epoch = Instant::now();
        let (tx, rx) = channel(64);
        let event_loop = EventLoop::new(rx, Vec::new(), epoch);
        let handle = tokio::spawn(event_loop.run());

        tx.send((7, DeviceMessage::Attach(Box::new(touchpad()))))
            .await
            .unwrap();
        for event in contact(Duration::from_millis(0), 60, true) {
            tx.send((7, DeviceMessage::Event(event))).await.unwrap();
        }
        sleep_until(epoch + Duration::from_millis(40)).await;
        for event in contact(Duration::from_millis(40), 0, false) {
            tx.send((7, DeviceMessage::Event(event))).await.unwrap();
        }
        // 轻触保持 125ms 后由定时器松开
        sleep(Duration::from_millis(500)).await;
        tx.send((7, DeviceMessage::Detach)).await.unwrap();
        drop(tx);

        let delivered = handle.await.unwrap();
        let buttons: Vec<Buttons> = delivered.iter().map(|(_, a)| a.buttons).collect();
        assert_eq!(buttons, vec![Buttons::LEFT, Buttons::empty()]);
        assert!(delivered.iter().all(|(id, _)| *id == 7));
        assert_eq!(delivered[1].1.time, Duration::from_millis(165));
    }

    #[tokio::test]
    async fn events_for_unknown_devices_are_dropped() {
        let (tx, rx) = channel(8);
        let event_loop = EventLoop::new(rx, Vec::new(), Instant::now());
        tx.send((1, DeviceMessage::Event(InputEvent::sync(Duration::ZERO))))
            .await
            .unwrap();
        drop(tx);
        assert!(event_loop.run().await.is_empty());
    }
}
