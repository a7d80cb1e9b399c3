use std::time::Duration;

use moused::{
    drift::{DriftFilter, DriftSettings},
    emulation::{EmulationState, ThirdButtonEmulator},
    event_model::Buttons,
};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// 左右键每 200ms 变化一次的所有长度为 6 的序列
#[test]
fn emulated_middle_never_mixes_with_real_buttons_outside_chord_states() {
    let inputs = [
        Buttons::empty(),
        Buttons::LEFT,
        Buttons::RIGHT,
        Buttons::LEFT | Buttons::RIGHT,
    ];
    let steps = 6;
    for seq in 0..inputs.len().pow(steps) {
        let mut emulator = ThirdButtonEmulator::new(ms(100));
        let mut code = seq;
        for step in 0..steps {
            let input = inputs[code % inputs.len()];
            code /= inputs.len();
            let now = ms(200 * u64::from(step));
            let (settled, output) = emulator.process(now, input, false);
            for out in settled.into_iter().chain([output]) {
                let real = Buttons::LEFT | Buttons::RIGHT;
                if out.contains(Buttons::MIDDLE) && out.intersects(real) {
                    assert!(
                        matches!(emulator.state(), EmulationState::S3 | EmulationState::S7),
                        "sequence {seq} step {step}: {out:?} in {:?}",
                        emulator.state()
                    );
                }
            }
            if let Some(deadline) = emulator.deadline() {
                if let Some(out) = emulator.on_timeout(deadline) {
                    assert!(!out.contains(Buttons::MIDDLE), "sequence {seq} step {step}");
                }
            }
        }
    }
}

#[test]
fn chord_after_delay_is_not_middle() {
    let mut emulator = ThirdButtonEmulator::new(ms(100));
    emulator.process(ms(0), Buttons::LEFT, false);
    assert_eq!(emulator.on_timeout(ms(100)), Some(Buttons::LEFT));
    let (_, out) = emulator.process(ms(200), Buttons::LEFT | Buttons::RIGHT, false);
    assert_eq!(out, Buttons::LEFT | Buttons::RIGHT | Buttons::MIDDLE);
    assert_eq!(emulator.state(), EmulationState::S7);
}

fn drift() -> DriftFilter {
    DriftFilter::new(&DriftSettings {
        enabled: true,
        ..DriftSettings::default()
    })
}

#[test]
fn jitter_after_idle_is_contained() {
    let mut filter = drift();
    let mut net = (0, 0);
    // 4s 之后每 150ms 抖一下, 持续 10s
    for i in 0..66 {
        let t = ms(4100 + i * 150);
        let (dx, dy) = if i % 2 == 0 { (1, 0) } else { (0, 1) };
        if let Some((x, y)) = filter.filter(t, dx, dy, false) {
            net.0 += x;
            net.1 += y;
        }
    }
    assert_eq!(net, (0, 0));
}

#[test]
fn real_movement_escapes_in_one_piece() {
    let mut filter = drift();
    assert_eq!(filter.filter(ms(6000), 1, 1, false), None);
    assert_eq!(filter.filter(ms(6050), 2, 3, false), Some((3, 4)));
}
