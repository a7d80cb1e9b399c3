//! 单个设备的处理链
//!
//! 帧组装 → 手势 → 虚拟滚动 → 中键模拟 → 漂移过滤 → 滚轮按键 → 连击计数

pub mod event_loop;

use std::{sync::Arc, time::Duration};

use tracing::{debug, info};

use crate::{
    click::ClickTracker,
    config::Config,
    device::{DeviceClass, DeviceDescription, DeviceIdentity, TouchpadCaps},
    drift::DriftFilter,
    emulation::ThirdButtonEmulator,
    event_model::{Buttons, DeviceFrame, FrameAssembler, InputEvent, PointerAction, Timestamp},
    gesture::{GestureEngine, Motion, resolve_caps},
    quirks::{Quirk, QuirkSet, QuirksStore},
    scroll::ScrollDetector,
    wheel::WheelButtons,
};

/// 一帧里还没分发出去的位移
#[derive(Debug, Clone, Copy, Default)]
struct Delta {
    dx: i32,
    dy: i32,
    dz: i32,
    dw: i32,
}

impl Delta {
    fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0 && self.dz == 0 && self.dw == 0
    }
}

#[derive(Debug)]
pub struct DevicePipeline {
    identity: DeviceIdentity,
    quirks: Option<Arc<QuirkSet>>,
    assembler: FrameAssembler,
    gesture: Option<GestureEngine>,
    scroll: Option<ScrollDetector>,
    emulation: Option<ThirdButtonEmulator>,
    drift: Option<DriftFilter>,
    wheel: Option<WheelButtons>,
    clicks: ClickTracker,
}

impl DevicePipeline {
    /// 被 `MousedIgnoreDevice` 排除的设备返回 `None`
    pub fn open(
        description: &DeviceDescription,
        store: &QuirksStore,
        config: &Config,
    ) -> Option<Self> {
        let identity = description.identity.clone();
        let quirks = store.fetch(&identity);
        if let Some(quirks) = &quirks {
            if quirks.get_bool(Quirk::MousedIgnoreDevice) == Some(true) {
                info!(device = %identity.name, "device ignored by quirks");
                return None;
            }
        }
        let settings = match &quirks {
            Some(quirks) => config.with_quirks(quirks),
            None => config.clone(),
        };

        let class = identity.class();
        let caps = match class {
            DeviceClass::Touchpad => resolve_caps(
                description.touchpad.unwrap_or_default(),
                quirks.as_deref(),
            ),
            DeviceClass::Mouse => TouchpadCaps::default(),
        };
        let mut assembler =
            FrameAssembler::new(class, &caps, settings.touchpad.synthetic_pressure());
        if let Some(codes) = quirks
            .as_deref()
            .and_then(|q| q.get_tuples(Quirk::AttrEventCode))
        {
            for tuple in codes.iter().filter(|t| !t.enabled) {
                assembler.disable(tuple.first, tuple.second);
            }
        }

        let gesture = (class == DeviceClass::Touchpad)
            .then(|| GestureEngine::new(settings.touchpad.clone(), caps));
        let scroll = settings
            .scroll
            .enabled
            .then(|| ScrollDetector::new(&settings.scroll));
        let emulation = settings.emulation.enabled.then(|| {
            ThirdButtonEmulator::new(Duration::from_millis(settings.emulation.timeout_ms))
        });
        let drift = settings
            .drift
            .enabled
            .then(|| DriftFilter::new(&settings.drift));
        let wheel = WheelButtons::new(settings.mouse.wheel_buttons);

        info!(
            device = %identity.name,
            ?class,
            quirks = quirks.is_some(),
            scroll = scroll.is_some(),
            emulation = emulation.is_some(),
            drift = drift.is_some(),
            wheel_buttons = settings.mouse.wheel_buttons,
            "device opened"
        );

        Some(Self {
            identity,
            quirks,
            assembler,
            gesture,
            scroll,
            emulation,
            drift,
            wheel,
            clicks: ClickTracker::new(Duration::from_millis(settings.click.threshold_ms)),
        })
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn quirks(&self) -> Option<&Arc<QuirkSet>> {
        self.quirks.as_ref()
    }

    /// 喂入一个事件, 返回需要注入的指针动作
    pub fn handle_event(&mut self, event: &InputEvent) -> Vec<PointerAction> {
        let mut actions = Vec::new();
        let Some(frame) = self.assembler.push(event) else {
            return actions;
        };
        let now = frame.time();
        match frame {
            DeviceFrame::Mouse(f) => {
                let delta = Delta {
                    dx: f.dx,
                    dy: f.dy,
                    dz: f.dz,
                    dw: f.dw,
                };
                self.dispatch(now, delta, f.buttons, &mut actions);
            }
            DeviceFrame::Touchpad(f) => {
                let Some(output) = self.gesture.as_mut().and_then(|g| g.process(&f)) else {
                    return actions;
                };
                let delta = match output.motion {
                    Motion::Ignore | Motion::Accumulate => Delta::default(),
                    Motion::Move { dx, dy } => Delta {
                        dx,
                        dy,
                        ..Delta::default()
                    },
                    Motion::VScroll(dz) => Delta {
                        dz,
                        ..Delta::default()
                    },
                    Motion::HScroll(dw) => Delta {
                        dw,
                        ..Delta::default()
                    },
                };
                self.dispatch(now, delta, output.buttons, &mut actions);
            }
        }
        self.resolve_gesture_idle(now, &mut actions);
        actions
    }

    /// 所有状态机里最早的定时器
    pub fn next_deadline(&self) -> Option<Timestamp> {
        let gesture = self.gesture.as_ref().and_then(|g| g.next_deadline());
        let emulation = self.emulation.as_ref().and_then(|e| e.deadline());
        match (gesture, emulation) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// 定时器到期
    pub fn on_timeout(&mut self, now: Timestamp) -> Vec<PointerAction> {
        let mut actions = Vec::new();
        if let Some(buttons) = self.emulation.as_mut().and_then(|e| e.on_timeout(now)) {
            self.emit(now, Delta::default(), buttons, &mut actions);
        }
        self.resolve_gesture_idle(now, &mut actions);
        actions
    }

    /// 结算已经到期的手势空闲定时器, 零长度的当场结算
    fn resolve_gesture_idle(&mut self, now: Timestamp, actions: &mut Vec<PointerAction>) {
        while let Some(gesture) = self.gesture.as_mut() {
            if !gesture.next_deadline().is_some_and(|d| d <= now) {
                break;
            }
            if let Some(buttons) = gesture.on_idle(now) {
                self.dispatch(now, Delta::default(), buttons, actions);
            }
        }
    }

    fn dispatch(
        &mut self,
        now: Timestamp,
        mut delta: Delta,
        mut buttons: Buttons,
        actions: &mut Vec<PointerAction>,
    ) {
        if let Some(scroll) = self.scroll.as_mut() {
            let step = scroll.process(buttons, delta.dx, delta.dy);
            buttons = step.buttons;
            delta.dx = step.dx;
            delta.dy = step.dy;
            delta.dz += step.dz;
            delta.dw += step.dw;
            if let Some(click) = step.click {
                let held = self.clicks.buttons();
                self.emit(now, Delta::default(), held | click, actions);
                self.emit(now, Delta::default(), held, actions);
            }
        }

        if let Some(emulation) = self.emulation.as_mut() {
            let moved = delta.dx != 0 || delta.dy != 0;
            let (settled, output) = emulation.process(now, buttons, moved);
            if let Some(settled) = settled {
                self.emit(now, Delta::default(), settled, actions);
            }
            buttons = output;
        }

        if let Some(drift) = self.drift.as_mut() {
            let active = !buttons.is_empty() || delta.dz != 0 || delta.dw != 0;
            let (dx, dy) = drift
                .filter(now, delta.dx, delta.dy, active)
                .unwrap_or((0, 0));
            delta.dx = dx;
            delta.dy = dy;
        }

        let wheel = match self.wheel {
            Some(wheel) => wheel.map(&mut delta.dz, &mut delta.dw),
            None => Buttons::empty(),
        };
        self.emit(now, delta, buttons | wheel, actions);
        if !wheel.is_empty() {
            self.emit(now, Delta::default(), buttons, actions);
        }
    }

    /// 有位移或者按键变化才产生动作
    fn emit(
        &mut self,
        now: Timestamp,
        delta: Delta,
        buttons: Buttons,
        actions: &mut Vec<PointerAction>,
    ) {
        let wheel_base = self.wheel.map(|w| w.base());
        let button_events = self.clicks.update(now, buttons, wheel_base);
        if button_events.is_empty() && delta.is_zero() {
            return;
        }
        debug!(?delta, ?buttons, "pointer action");
        actions.push(PointerAction {
            time: now,
            dx: delta.dx,
            dy: delta.dy,
            dz: delta.dz,
            dw: delta.dw,
            buttons,
            button_events,
        });
    }
}
