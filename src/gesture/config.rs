use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{
    device::TouchpadCaps,
    event_model::codes,
    quirks::{QuirkSet, Quirk},
};

/// 设备没报分辨率也没有尺寸提示时, 按 100mm 宽的板子估算
const FALLBACK_PAD_SIZE_MM: i32 = 100;

/// 触摸板手势参数, 距离类参数的单位是毫米
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TouchpadSettings {
    /// 压力超过它才算开始接触
    pub pressure_high: u32,
    /// 接触中压力不低于它就保持接触
    pub pressure_low: u32,
    pub max_pressure: u32,
    pub max_width: u32,
    /// 0 表示不识别轻触
    pub tap_timeout_ms: u64,
    pub tap_threshold: u32,
    pub tap_max_delta: f64,
    pub taphold_timeout_ms: u64,
    pub two_finger_scroll: bool,
    pub natural_scroll: bool,
    pub three_finger_drag: bool,
    pub vscroll_min_delta: f64,
    /// 正数是从底边算起的带宽, 负数是从顶边算起
    pub vscroll_hor_area: f64,
    /// 正数是从左边算起的带宽, 负数是从右边算起
    pub vscroll_ver_area: f64,
    pub softbuttons_y: i32,
    pub softbutton2_x: i32,
    pub softbutton3_x: i32,
    pub margin_top: i32,
    pub margin_right: i32,
    pub margin_bottom: i32,
    pub margin_left: i32,
}

impl Default for TouchpadSettings {
    fn default() -> Self {
        Self {
            pressure_high: 30,
            pressure_low: 25,
            max_pressure: 220,
            max_width: 10,
            tap_timeout_ms: 180,
            tap_threshold: 30,
            tap_max_delta: 1.3,
            taphold_timeout_ms: 125,
            two_finger_scroll: true,
            natural_scroll: false,
            three_finger_drag: false,
            vscroll_min_delta: 1.25,
            vscroll_hor_area: 0.0,
            vscroll_ver_area: -15.0,
            softbuttons_y: 0,
            softbutton2_x: 0,
            softbutton3_x: 0,
            margin_top: 0,
            margin_right: 0,
            margin_bottom: 0,
            margin_left: 0,
        }
    }
}

impl TouchpadSettings {
    pub fn tap_timeout(&self) -> Duration {
        Duration::from_millis(self.tap_timeout_ms)
    }

    pub fn taphold_timeout(&self) -> Duration {
        Duration::from_millis(self.taphold_timeout_ms)
    }

    /// 没有压力轴的设备, 接触时报告的合成压力
    pub fn synthetic_pressure(&self) -> u32 {
        self.pressure_high.max(self.tap_threshold)
    }

    pub fn with_quirks(mut self, quirks: &QuirkSet) -> Self {
        // 通用属性先套, 守护进程自己的属性后套, 后者优先
        if let Some(range) = quirks.get_range(Quirk::AttrPressureRange) {
            self.pressure_high = range.upper.max(0) as u32;
            self.pressure_low = range.lower.max(0) as u32;
        }
        if let Some(v) = quirks.get_uint(Quirk::AttrPalmPressureThreshold) {
            self.max_pressure = v;
        }
        if let Some(v) = quirks.get_uint(Quirk::AttrPalmSizeThreshold) {
            self.max_width = v;
        }

        let s = &mut self;
        set(&mut s.pressure_high, quirks.get_uint(Quirk::MousedPressureHigh));
        set(&mut s.pressure_low, quirks.get_uint(Quirk::MousedPressureLow));
        set(&mut s.max_pressure, quirks.get_uint(Quirk::MousedMaxPressure));
        set(&mut s.max_width, quirks.get_uint(Quirk::MousedMaxWidth));
        set(
            &mut s.tap_timeout_ms,
            quirks.get_uint(Quirk::MousedTapTimeout).map(u64::from),
        );
        set(
            &mut s.tap_threshold,
            quirks.get_uint(Quirk::MousedTapPressureThreshold),
        );
        set(&mut s.tap_max_delta, quirks.get_double(Quirk::MousedTapMaxDelta));
        set(
            &mut s.taphold_timeout_ms,
            quirks.get_uint(Quirk::MousedTapholdTimeout).map(u64::from),
        );
        set(
            &mut s.two_finger_scroll,
            quirks.get_bool(Quirk::MousedTwoFingerScroll),
        );
        set(&mut s.natural_scroll, quirks.get_bool(Quirk::MousedNaturalScroll));
        set(
            &mut s.three_finger_drag,
            quirks.get_bool(Quirk::MousedThreeFingerDrag),
        );
        set(
            &mut s.vscroll_min_delta,
            quirks.get_double(Quirk::MousedVScrollMinDelta),
        );
        set(
            &mut s.vscroll_hor_area,
            quirks.get_double(Quirk::MousedVScrollHorArea),
        );
        set(
            &mut s.vscroll_ver_area,
            quirks.get_double(Quirk::MousedVScrollVerArea),
        );
        set(&mut s.softbuttons_y, quirks.get_int(Quirk::MousedSoftButtonsY));
        set(&mut s.softbutton2_x, quirks.get_int(Quirk::MousedSoftButton2X));
        set(&mut s.softbutton3_x, quirks.get_int(Quirk::MousedSoftButton3X));
        set(&mut s.margin_top, quirks.get_int(Quirk::MousedMarginTop));
        set(&mut s.margin_right, quirks.get_int(Quirk::MousedMarginRight));
        set(&mut s.margin_bottom, quirks.get_int(Quirk::MousedMarginBottom));
        set(&mut s.margin_left, quirks.get_int(Quirk::MousedMarginLeft));
        self
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// 用 quirks 修正探测层给的能力: 分辨率提示, 尺寸提示, clickpad 属性
pub fn resolve_caps(mut caps: TouchpadCaps, quirks: Option<&QuirkSet>) -> TouchpadCaps {
    if let Some(quirks) = quirks {
        if let Some(props) = quirks.get_tuples(Quirk::AttrInputProp) {
            if let Some(enabled) = props.get(codes::INPUT_PROP_BUTTONPAD, 0) {
                caps.is_clickpad = enabled;
            }
        }
        if let Some(hint) = quirks.get_dimension(Quirk::AttrResolutionHint) {
            if caps.res_x == 0 {
                caps.res_x = hint.x as i32;
            }
            if caps.res_y == 0 {
                caps.res_y = hint.y as i32;
            }
        }
        if let Some(size) = quirks.get_dimension(Quirk::AttrSizeHint) {
            if caps.res_x == 0 {
                caps.res_x = (caps.max_x - caps.min_x) / size.x as i32;
            }
            if caps.res_y == 0 {
                caps.res_y = (caps.max_y - caps.min_y) / size.y as i32;
            }
        }
    }
    if caps.res_x <= 0 || caps.res_y <= 0 {
        caps.res_x = ((caps.max_x - caps.min_x) / FALLBACK_PAD_SIZE_MM).max(1);
        caps.res_y = ((caps.max_y - caps.min_y) / FALLBACK_PAD_SIZE_MM).max(1);
        debug!(res_x = caps.res_x, res_y = caps.res_y, "touchpad resolution estimated");
    }
    caps
}
