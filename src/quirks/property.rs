use std::fmt;

use heapless::Vec as FixedVec;
use tracing::warn;

use super::error::{QuirksError, Saturated};
use crate::event_model::{codes, frame::ANY_CODE};

/// 单个属性里最多合并多少个元组
pub const MAX_TUPLES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Bool,
    Uint,
    Int,
    Double,
    String,
    Dimension,
    Range,
    Tuples,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quirk {
    ModelAppleTouchpad,
    ModelTrackball,
    ModelBouncingKeys,

    AttrSizeHint,
    AttrResolutionHint,
    AttrTouchSizeRange,
    AttrPressureRange,
    AttrPalmSizeThreshold,
    AttrPalmPressureThreshold,
    AttrThumbPressureThreshold,
    AttrTrackpointMultiplier,
    AttrKeyboardIntegration,
    AttrTrackpointIntegration,
    AttrLidSwitchReliability,
    AttrEventCode,
    AttrInputProp,

    MousedIgnoreDevice,
    MousedClickThreshold,
    MousedEmulateThirdButton,
    MousedEmulateThirdButtonTimeout,
    MousedVirtualScrollEnable,
    MousedHorScrollEnable,
    MousedVirtualScrollSpeed,
    MousedVirtualScrollThreshold,
    MousedDriftTerminate,
    MousedDriftDistance,
    MousedDriftTime,
    MousedDriftAfter,
    MousedWheelButtons,
    MousedTwoFingerScroll,
    MousedNaturalScroll,
    MousedThreeFingerDrag,
    MousedSoftButton2X,
    MousedSoftButton3X,
    MousedSoftButtonsY,
    MousedTapTimeout,
    MousedTapPressureThreshold,
    MousedTapMaxDelta,
    MousedTapholdTimeout,
    MousedVScrollMinDelta,
    MousedVScrollHorArea,
    MousedVScrollVerArea,
    MousedMaxWidth,
    MousedMaxPressure,
    MousedMarginTop,
    MousedMarginRight,
    MousedMarginBottom,
    MousedMarginLeft,
    MousedPressureHigh,
    MousedPressureLow,
}

const QUIRKS: &[(Quirk, &str, PropertyKind)] = &[
    (Quirk::ModelAppleTouchpad, "ModelAppleTouchpad", PropertyKind::Bool),
    (Quirk::ModelTrackball, "ModelTrackball", PropertyKind::Bool),
    (Quirk::ModelBouncingKeys, "ModelBouncingKeys", PropertyKind::Bool),
    (Quirk::AttrSizeHint, "AttrSizeHint", PropertyKind::Dimension),
    (Quirk::AttrResolutionHint, "AttrResolutionHint", PropertyKind::Dimension),
    (Quirk::AttrTouchSizeRange, "AttrTouchSizeRange", PropertyKind::Range),
    (Quirk::AttrPressureRange, "AttrPressureRange", PropertyKind::Range),
    (Quirk::AttrPalmSizeThreshold, "AttrPalmSizeThreshold", PropertyKind::Uint),
    (Quirk::AttrPalmPressureThreshold, "AttrPalmPressureThreshold", PropertyKind::Uint),
    (Quirk::AttrThumbPressureThreshold, "AttrThumbPressureThreshold", PropertyKind::Uint),
    (Quirk::AttrTrackpointMultiplier, "AttrTrackpointMultiplier", PropertyKind::Double),
    (Quirk::AttrKeyboardIntegration, "AttrKeyboardIntegration", PropertyKind::String),
    (Quirk::AttrTrackpointIntegration, "AttrTrackpointIntegration", PropertyKind::String),
    (Quirk::AttrLidSwitchReliability, "AttrLidSwitchReliability", PropertyKind::String),
    (Quirk::AttrEventCode, "AttrEventCode", PropertyKind::Tuples),
    (Quirk::AttrInputProp, "AttrInputProp", PropertyKind::Tuples),
    (Quirk::MousedIgnoreDevice, "MousedIgnoreDevice", PropertyKind::Bool),
    (Quirk::MousedClickThreshold, "MousedClickThreshold", PropertyKind::Uint),
    (Quirk::MousedEmulateThirdButton, "MousedEmulateThirdButton", PropertyKind::Bool),
    (Quirk::MousedEmulateThirdButtonTimeout, "MousedEmulateThirdButtonTimeout", PropertyKind::Uint),
    (Quirk::MousedVirtualScrollEnable, "MousedVirtualScrollEnable", PropertyKind::Bool),
    (Quirk::MousedHorScrollEnable, "MousedHorScrollEnable", PropertyKind::Bool),
    (Quirk::MousedVirtualScrollSpeed, "MousedVirtualScrollSpeed", PropertyKind::Uint),
    (Quirk::MousedVirtualScrollThreshold, "MousedVirtualScrollThreshold", PropertyKind::Uint),
    (Quirk::MousedDriftTerminate, "MousedDriftTerminate", PropertyKind::Bool),
    (Quirk::MousedDriftDistance, "MousedDriftDistance", PropertyKind::Uint),
    (Quirk::MousedDriftTime, "MousedDriftTime", PropertyKind::Uint),
    (Quirk::MousedDriftAfter, "MousedDriftAfter", PropertyKind::Uint),
    (Quirk::MousedWheelButtons, "MousedWheelButtons", PropertyKind::Uint),
    (Quirk::MousedTwoFingerScroll, "MousedTwoFingerScroll", PropertyKind::Bool),
    (Quirk::MousedNaturalScroll, "MousedNaturalScroll", PropertyKind::Bool),
    (Quirk::MousedThreeFingerDrag, "MousedThreeFingerDrag", PropertyKind::Bool),
    (Quirk::MousedSoftButton2X, "MousedSoftButton2X", PropertyKind::Int),
    (Quirk::MousedSoftButton3X, "MousedSoftButton3X", PropertyKind::Int),
    (Quirk::MousedSoftButtonsY, "MousedSoftButtonsY", PropertyKind::Int),
    (Quirk::MousedTapTimeout, "MousedTapTimeout", PropertyKind::Uint),
    (Quirk::MousedTapPressureThreshold, "MousedTapPressureThreshold", PropertyKind::Uint),
    (Quirk::MousedTapMaxDelta, "MousedTapMaxDelta", PropertyKind::Double),
    (Quirk::MousedTapholdTimeout, "MousedTapholdTimeout", PropertyKind::Uint),
    (Quirk::MousedVScrollMinDelta, "MousedVScrollMinDelta", PropertyKind::Double),
    (Quirk::MousedVScrollHorArea, "MousedVScrollHorArea", PropertyKind::Double),
    (Quirk::MousedVScrollVerArea, "MousedVScrollVerArea", PropertyKind::Double),
    (Quirk::MousedMaxWidth, "MousedMaxWidth", PropertyKind::Uint),
    (Quirk::MousedMaxPressure, "MousedMaxPressure", PropertyKind::Uint),
    (Quirk::MousedMarginTop, "MousedMarginTop", PropertyKind::Int),
    (Quirk::MousedMarginRight, "MousedMarginRight", PropertyKind::Int),
    (Quirk::MousedMarginBottom, "MousedMarginBottom", PropertyKind::Int),
    (Quirk::MousedMarginLeft, "MousedMarginLeft", PropertyKind::Int),
    (Quirk::MousedPressureHigh, "MousedPressureHigh", PropertyKind::Uint),
    (Quirk::MousedPressureLow, "MousedPressureLow", PropertyKind::Uint),
];

impl Quirk {
    pub fn from_name(name: &str) -> Option<Self> {
        QUIRKS.iter().find(|(_, n, _)| *n == name).map(|(q, _, _)| *q)
    }

    fn entry(self) -> &'static (Quirk, &'static str, PropertyKind) {
        QUIRKS
            .iter()
            .find(|(q, _, _)| *q == self)
            .unwrap_or_else(|| unreachable!("{self:?} missing from the quirk table"))
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    pub fn kind(self) -> PropertyKind {
        self.entry().2
    }
}

impl fmt::Display for Quirk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub x: u32,
    pub y: u32,
}

/// 闭区间, 文本写作 `upper:lower`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub upper: i32,
    pub lower: i32,
}

/// 以 `(first, second)` 为键的开关项
///
/// 事件码属性里是 `(type, code)`, 输入属性里是 `(prop, 0)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuple {
    pub first: u16,
    pub second: u16,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleList {
    tuples: FixedVec<Tuple, MAX_TUPLES>,
}

impl TupleList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已有相同键的元组只替换开关, 否则追加
    pub fn insert(&mut self, tuple: Tuple) -> Result<(), Saturated> {
        if let Some(slot) = self
            .tuples
            .iter_mut()
            .find(|t| t.first == tuple.first && t.second == tuple.second)
        {
            slot.enabled = tuple.enabled;
            return Ok(());
        }
        self.tuples.push(tuple).map_err(|_| Saturated {
            capacity: MAX_TUPLES,
        })
    }

    /// 逐个合并, 满了以后剩下的丢掉并报告
    pub fn merge(&mut self, other: &TupleList) -> Result<(), Saturated> {
        let mut result = Ok(());
        for tuple in other.iter() {
            if let Err(e) = self.insert(*tuple) {
                result = Err(e);
            }
        }
        result
    }

    pub fn get(&self, first: u16, second: u16) -> Option<bool> {
        self.tuples
            .iter()
            .find(|t| t.first == first && t.second == second)
            .map(|t| t.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Uint(u32),
    Int(i32),
    Double(f64),
    String(String),
    Dimension(Dimension),
    Range(Range),
    Tuples(TupleList),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Bool(_) => PropertyKind::Bool,
            PropertyValue::Uint(_) => PropertyKind::Uint,
            PropertyValue::Int(_) => PropertyKind::Int,
            PropertyValue::Double(_) => PropertyKind::Double,
            PropertyValue::String(_) => PropertyKind::String,
            PropertyValue::Dimension(_) => PropertyKind::Dimension,
            PropertyValue::Range(_) => PropertyKind::Range,
            PropertyValue::Tuples(_) => PropertyKind::Tuples,
        }
    }

    /// 按属性声明的类型解析配置值, 这是构造属性值的唯一入口
    pub fn parse(quirk: Quirk, raw: &toml::Value) -> Result<Self, QuirksError> {
        let invalid = || QuirksError::InvalidValue {
            quirk,
            expected: quirk.kind(),
            found: raw.to_string(),
        };
        let value = match (quirk.kind(), raw) {
            (PropertyKind::Bool, toml::Value::Boolean(b)) => PropertyValue::Bool(*b),
            (PropertyKind::Bool, toml::Value::Integer(i @ (0 | 1))) => PropertyValue::Bool(*i == 1),
            (PropertyKind::Uint, toml::Value::Integer(i)) => {
                PropertyValue::Uint(u32::try_from(*i).map_err(|_| invalid())?)
            }
            (PropertyKind::Int, toml::Value::Integer(i)) => {
                PropertyValue::Int(i32::try_from(*i).map_err(|_| invalid())?)
            }
            (PropertyKind::Double, toml::Value::Float(f)) => PropertyValue::Double(*f),
            (PropertyKind::Double, toml::Value::Integer(i)) => PropertyValue::Double(*i as f64),
            (PropertyKind::String, toml::Value::String(s)) => PropertyValue::String(s.clone()),
            (PropertyKind::Dimension, toml::Value::String(s)) => {
                PropertyValue::Dimension(parse_dimension(s).ok_or_else(invalid)?)
            }
            (PropertyKind::Range, toml::Value::String(s)) => {
                PropertyValue::Range(parse_range(s).ok_or_else(invalid)?)
            }
            (PropertyKind::Tuples, toml::Value::String(s)) => {
                PropertyValue::Tuples(parse_tuples(quirk, s)?)
            }
            _ => return Err(invalid()),
        };
        Ok(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Uint(u) => write!(f, "{u}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Double(d) => write!(f, "{d}"),
            PropertyValue::String(s) => write!(f, "{s}"),
            PropertyValue::Dimension(d) => write!(f, "{}x{}", d.x, d.y),
            PropertyValue::Range(r) => write!(f, "{}:{}", r.upper, r.lower),
            PropertyValue::Tuples(list) => {
                for (i, t) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    let sign = if t.enabled { '+' } else { '-' };
                    if t.second == ANY_CODE {
                        write!(f, "{sign}{:#x}", t.first)?;
                    } else {
                        write!(f, "{sign}{:#x}:{:#x}", t.first, t.second)?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn parse_dimension(text: &str) -> Option<Dimension> {
    let (x, y) = text.split_once('x')?;
    let dim = Dimension {
        x: x.trim().parse().ok()?,
        y: y.trim().parse().ok()?,
    };
    (dim.x > 0 && dim.y > 0).then_some(dim)
}

fn parse_range(text: &str) -> Option<Range> {
    let (upper, lower) = text.split_once(':')?;
    let range = Range {
        upper: upper.trim().parse().ok()?,
        lower: lower.trim().parse().ok()?,
    };
    (range.upper >= range.lower).then_some(range)
}

/// `+`/`-` 开头, `;` 分隔的开关列表, 每项按属性决定是输入属性还是事件码
fn parse_tuples(quirk: Quirk, text: &str) -> Result<TupleList, QuirksError> {
    let mut list = TupleList::new();
    for item in text.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let enabled = match item.as_bytes()[0] {
            b'+' => true,
            b'-' => false,
            _ => return Err(QuirksError::InvalidTuple(item.to_string())),
        };
        let parsed = match quirk {
            Quirk::AttrInputProp => parse_input_prop(&item[1..]),
            _ => parse_event_code(&item[1..]),
        };
        let (first, second) = parsed.ok_or_else(|| QuirksError::InvalidTuple(item.to_string()))?;
        if let Err(e) = list.insert(Tuple {
            first,
            second,
            enabled,
        }) {
            warn!(item, "tuple list truncated: {e}");
            break;
        }
    }
    if list.is_empty() {
        return Err(QuirksError::InvalidTuple(text.to_string()));
    }
    Ok(list)
}

fn parse_event_code(text: &str) -> Option<(u16, u16)> {
    if let Some((ty, code)) = text.split_once(':') {
        let ty = codes::event_type_from_name(ty)?;
        return Some((ty, codes::event_code_from_name(ty, code)?));
    }
    codes::event_code_lookup(text).map(|(ty, code)| (ty, code.unwrap_or(ANY_CODE)))
}

fn parse_input_prop(text: &str) -> Option<(u16, u16)> {
    codes::input_prop_from_name(text).map(|prop| (prop, 0))
}
