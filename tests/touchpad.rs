use std::time::Duration;

use moused::{
    config::Config,
    device::{Bus, DeviceDescription, DeviceIdentity, TouchpadCaps, UdevType},
    event_model::{ButtonEvent, Buttons, InputEvent, PointerAction, codes},
    pipeline::DevicePipeline,
    quirks::QuirksStore,
};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn touchpad() -> DevicePipeline {
    let description = DeviceDescription {
        identity: DeviceIdentity {
            bus: Bus::Ps2,
            vendor: 0x0002,
            product: 0x0007,
            version: 0x01b1,
            name: "SynPS/2 Synaptics TouchPad".into(),
            uniq: String::new(),
            udev_type: UdevType::TOUCHPAD,
            dmi: None,
            dt: None,
        },
        touchpad: Some(TouchpadCaps {
            min_x: 0,
            max_x: 1000,
            min_y: 0,
            max_y: 700,
            res_x: 10,
            res_y: 10,
            has_pressure: true,
            has_width: false,
            is_clickpad: false,
        }),
    };
    DevicePipeline::open(&description, &QuirksStore::new(), &Config::default()).unwrap()
}

/// 一帧触摸板状态, `fingers` 为 0 表示抬起
fn frame(t: u64, x: i32, y: i32, pressure: i32, fingers: u8) -> Vec<InputEvent> {
    let time = ms(t);
    let tool = |code, n| InputEvent::key(time, code, fingers == n);
    vec![
        InputEvent::absolute(time, codes::ABS_X, x),
        InputEvent::absolute(time, codes::ABS_Y, y),
        InputEvent::absolute(time, codes::ABS_PRESSURE, pressure),
        InputEvent::key(time, codes::BTN_TOUCH, fingers > 0),
        tool(codes::BTN_TOOL_FINGER, 1),
        tool(codes::BTN_TOOL_DOUBLETAP, 2),
        tool(codes::BTN_TOOL_TRIPLETAP, 3),
        InputEvent::sync(time),
    ]
}

fn run(pipeline: &mut DevicePipeline, frames: &[Vec<InputEvent>]) -> Vec<PointerAction> {
    frames
        .iter()
        .flatten()
        .flat_map(|event| pipeline.handle_event(event))
        .collect()
}

fn presses(actions: &[PointerAction], button: u8) -> (usize, usize) {
    let events = actions.iter().flat_map(|a| &a.button_events);
    let (down, up): (Vec<&ButtonEvent>, Vec<&ButtonEvent>) = events
        .filter(|e| e.button == button)
        .partition(|e| e.pressed);
    (down.len(), up.len())
}

#[test]
fn single_tap_is_one_click() {
    let mut pad = touchpad();
    let mut actions = run(
        &mut pad,
        &[
            frame(0, 400, 300, 30, 1),
            frame(10, 401, 300, 55, 1),
            frame(25, 401, 301, 40, 1),
            frame(60, 401, 301, 0, 0),
        ],
    );
    assert_eq!(presses(&actions, 1), (1, 0));

    let deadline = pad.next_deadline().unwrap();
    assert_eq!(deadline, ms(60 + 125));
    actions.extend(pad.on_timeout(deadline));
    assert_eq!(presses(&actions, 1), (1, 1));
    assert!(actions.iter().all(|a| a.dx == 0 && a.dy == 0));
    assert_eq!(pad.next_deadline(), None);
}

#[test]
fn double_tap_is_two_clicks_with_counts() {
    let mut pad = touchpad();
    let mut actions = run(
        &mut pad,
        &[
            frame(0, 400, 300, 50, 1),
            frame(40, 400, 300, 0, 0),
            frame(90, 400, 300, 50, 1),
            frame(130, 400, 300, 0, 0),
        ],
    );
    actions.extend(pad.on_timeout(pad.next_deadline().unwrap()));
    let clicks: Vec<(bool, u32)> = actions
        .iter()
        .flat_map(|a| &a.button_events)
        .map(|e| (e.pressed, e.clicks))
        .collect();
    assert_eq!(clicks, vec![(true, 1), (false, 1), (true, 2), (false, 2)]);
}

#[test]
fn two_finger_hold_past_timeout_never_taps() {
    let mut pad = touchpad();
    let mut frames: Vec<Vec<InputEvent>> = (0..=30)
        .map(|i| frame(i * 10, 500, 350, 120, 2))
        .collect();
    frames.push(frame(310, 500, 350, 0, 0));
    let actions = run(&mut pad, &frames);
    assert!(actions.iter().all(|a| a.button_events.is_empty()));
    assert_eq!(pad.next_deadline(), None);
}

#[test]
fn two_finger_vertical_drag_scrolls() {
    let mut pad = touchpad();
    let actions = run(
        &mut pad,
        &[
            frame(0, 100, 100, 50, 2),
            frame(10, 100, 115, 50, 2),
            frame(20, 100, 130, 50, 2),
            frame(30, 100, 145, 50, 2),
            frame(40, 100, 160, 50, 2),
        ],
    );
    assert!(!actions.is_empty());
    assert!(actions.iter().all(|a| a.dx == 0 && a.dy == 0));
    assert!(actions.iter().all(|a| a.dz < 0));
    let total: i32 = actions.iter().map(|a| a.dz).sum();
    assert!(total <= -4);
}

#[test]
fn one_finger_drag_moves_the_pointer() {
    let mut pad = touchpad();
    let actions = run(
        &mut pad,
        &[
            frame(0, 100, 100, 50, 1),
            frame(10, 110, 100, 50, 1),
            frame(20, 140, 105, 50, 1),
            frame(30, 160, 110, 50, 1),
            frame(300, 160, 110, 0, 0),
        ],
    );
    let dx: i32 = actions.iter().map(|a| a.dx).sum();
    let dy: i32 = actions.iter().map(|a| a.dy).sum();
    assert_eq!((dx, dy), (60, 10));
    assert!(actions.iter().all(|a| a.buttons == Buttons::empty()));
}
