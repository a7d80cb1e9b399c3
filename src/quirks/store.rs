use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    error::QuirksError,
    matcher::Match,
    property::{Dimension, PropertyValue, Quirk, Range, TupleList},
};
use crate::device::DeviceIdentity;

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub quirk: Quirk,
    pub value: PropertyValue,
}

/// 一个有名字的 match + 属性块, 加载后不再修改
#[derive(Debug, Clone)]
pub struct Section {
    name: String,
    matcher: Match,
    properties: Vec<Property>,
}

impl Section {
    pub fn new(name: impl Into<String>, matcher: Match) -> Self {
        Self {
            name: name.into(),
            matcher,
            properties: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// 追加属性, 值的类型必须和属性声明的一致
    pub fn with(mut self, quirk: Quirk, value: PropertyValue) -> Result<Self, QuirksError> {
        if value.kind() != quirk.kind() {
            return Err(QuirksError::InvalidValue {
                quirk,
                expected: quirk.kind(),
                found: value.to_string(),
            });
        }
        self.properties.push(Property { quirk, value });
        Ok(self)
    }

    /// 没有匹配条件或者没有属性的 section 都是配置错误
    pub fn validate(&self) -> Result<(), QuirksError> {
        if self.matcher.bits().is_empty() {
            return Err(QuirksError::EmptyMatch(self.name.clone()));
        }
        if self.properties.is_empty() {
            return Err(QuirksError::NoProperties(self.name.clone()));
        }
        Ok(())
    }
}

/// 某个设备最终生效的 quirk 集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuirkSet {
    properties: Vec<Property>,
}

impl QuirkSet {
    fn apply(&mut self, section: &str, property: &Property) {
        if let PropertyValue::Tuples(incoming) = &property.value {
            if let Some(Property {
                value: PropertyValue::Tuples(existing),
                ..
            }) = self
                .properties
                .iter_mut()
                .find(|p| p.quirk == property.quirk)
            {
                if let Err(e) = existing.merge(incoming) {
                    warn!(section, quirk = %property.quirk, "tuple list truncated: {e}");
                }
                return;
            }
        }
        // 标量属性: 丢掉旧值, 新值放到最后
        self.properties.retain(|p| p.quirk != property.quirk);
        self.properties.push(property.clone());
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    pub fn has(&self, quirk: Quirk) -> bool {
        self.lookup(quirk).is_some()
    }

    fn lookup(&self, quirk: Quirk) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .rev()
            .find(|p| p.quirk == quirk)
            .map(|p| &p.value)
    }

    fn mismatch(quirk: Quirk, requested: &str) -> ! {
        panic!("{quirk} is a {:?} property, requested as {requested}", quirk.kind())
    }

    pub fn get_bool(&self, quirk: Quirk) -> Option<bool> {
        match self.lookup(quirk)? {
            PropertyValue::Bool(v) => Some(*v),
            _ => Self::mismatch(quirk, "bool"),
        }
    }

    pub fn get_uint(&self, quirk: Quirk) -> Option<u32> {
        match self.lookup(quirk)? {
            PropertyValue::Uint(v) => Some(*v),
            _ => Self::mismatch(quirk, "uint"),
        }
    }

    pub fn get_int(&self, quirk: Quirk) -> Option<i32> {
        match self.lookup(quirk)? {
            PropertyValue::Int(v) => Some(*v),
            _ => Self::mismatch(quirk, "int"),
        }
    }

    pub fn get_double(&self, quirk: Quirk) -> Option<f64> {
        match self.lookup(quirk)? {
            PropertyValue::Double(v) => Some(*v),
            _ => Self::mismatch(quirk, "double"),
        }
    }

    pub fn get_string(&self, quirk: Quirk) -> Option<&str> {
        match self.lookup(quirk)? {
            PropertyValue::String(v) => Some(v),
            _ => Self::mismatch(quirk, "string"),
        }
    }

    pub fn get_dimension(&self, quirk: Quirk) -> Option<Dimension> {
        match self.lookup(quirk)? {
            PropertyValue::Dimension(v) => Some(*v),
            _ => Self::mismatch(quirk, "dimension"),
        }
    }

    pub fn get_range(&self, quirk: Quirk) -> Option<Range> {
        match self.lookup(quirk)? {
            PropertyValue::Range(v) => Some(*v),
            _ => Self::mismatch(quirk, "range"),
        }
    }

    pub fn get_tuples(&self, quirk: Quirk) -> Option<&TupleList> {
        match self.lookup(quirk)? {
            PropertyValue::Tuples(v) => Some(v),
            _ => Self::mismatch(quirk, "tuples"),
        }
    }
}

/// 按加载顺序保存所有 section
#[derive(Debug, Clone, Default)]
pub struct QuirksStore {
    sections: Vec<Section>,
}

impl QuirksStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 校验失败的 section 不会进入 store
    pub fn push(&mut self, section: Section) -> Result<(), QuirksError> {
        section.validate()?;
        self.sections.push(section);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// 按顺序评估所有 section, 后匹配的覆盖先匹配的
    pub fn fetch(&self, device: &DeviceIdentity) -> Option<Arc<QuirkSet>> {
        let mut quirks = QuirkSet::default();
        for section in &self.sections {
            if !section.matcher.matches(device) {
                continue;
            }
            debug!(section = %section.name, device = %device.name, "quirks section matched");
            for property in &section.properties {
                quirks.apply(&section.name, property);
            }
        }
        if quirks.is_empty() {
            None
        } else {
            Some(Arc::new(quirks))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::{Bus, UdevType},
        event_model::codes,
        quirks::property::Tuple,
    };

    fn device() -> DeviceIdentity {
        DeviceIdentity {
            bus: Bus::Ps2,
            vendor: 0x0002,
            product: 0x0007,
            version: 0,
            name: "SynPS/2 Synaptics TouchPad".into(),
            uniq: String::new(),
            udev_type: UdevType::TOUCHPAD,
            dmi: None,
            dt: None,
        }
    }

    fn tuples(items: &[(u16, u16, bool)]) -> PropertyValue {
        let mut list = TupleList::new();
        for &(first, second, enabled) in items {
            list.insert(Tuple {
                first,
                second,
                enabled,
            })
            .unwrap();
        }
        PropertyValue::Tuples(list)
    }

    #[test]
    fn later_sections_override_scalars() {
        let mut store = QuirksStore::new();
        let early = Section::new("generic", Match::new().bus(Bus::Ps2).unwrap())
            .with(Quirk::MousedTapTimeout, PropertyValue::Uint(180))
            .unwrap()
            .with(Quirk::MousedNaturalScroll, PropertyValue::Bool(true))
            .unwrap();
        let late = Section::new("synaptics", Match::new().name("SynPS/2*").unwrap())
            .with(Quirk::MousedTapTimeout, PropertyValue::Uint(120))
            .unwrap();
        store.push(early).unwrap();
        store.push(late).unwrap();

        let quirks = store.fetch(&device()).unwrap();
        assert_eq!(quirks.get_uint(Quirk::MousedTapTimeout), Some(120));
        assert_eq!(quirks.get_bool(Quirk::MousedNaturalScroll), Some(true));
        assert_eq!(quirks.get_uint(Quirk::MousedTapholdTimeout), None);
    }

    #[test]
    fn tuple_lists_merge_per_tuple() {
        let mut store = QuirksStore::new();
        let early = Section::new("a", Match::new().bus(Bus::Ps2).unwrap())
            .with(
                Quirk::AttrEventCode,
                tuples(&[
                    (codes::EV_KEY, codes::BTN_RIGHT, false),
                    (codes::EV_REL, codes::REL_WHEEL, false),
                ]),
            )
            .unwrap();
        let late = Section::new("b", Match::new().vendor(0x0002).unwrap())
            .with(
                Quirk::AttrEventCode,
                tuples(&[(codes::EV_REL, codes::REL_WHEEL, true)]),
            )
            .unwrap();
        store.push(early).unwrap();
        store.push(late).unwrap();

        let quirks = store.fetch(&device()).unwrap();
        let list = quirks.get_tuples(Quirk::AttrEventCode).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(codes::EV_KEY, codes::BTN_RIGHT), Some(false));
        assert_eq!(list.get(codes::EV_REL, codes::REL_WHEEL), Some(true));
    }

    #[test]
    fn nothing_matched_is_none() {
        let mut store = QuirksStore::new();
        let section = Section::new("usb only", Match::new().bus(Bus::Usb).unwrap())
            .with(Quirk::MousedIgnoreDevice, PropertyValue::Bool(true))
            .unwrap();
        store.push(section).unwrap();
        assert!(store.fetch(&device()).is_none());
    }

    #[test]
    fn invalid_sections_are_refused() {
        let mut store = QuirksStore::new();
        let no_match = Section::new("x", Match::new())
            .with(Quirk::MousedIgnoreDevice, PropertyValue::Bool(true))
            .unwrap();
        assert!(matches!(store.push(no_match), Err(QuirksError::EmptyMatch(_))));
        let no_props = Section::new("y", Match::new().bus(Bus::Usb).unwrap());
        assert!(matches!(store.push(no_props), Err(QuirksError::NoProperties(_))));
        assert!(
            Section::new("z", Match::new())
                .with(Quirk::MousedTapTimeout, PropertyValue::Bool(true))
                .is_err()
        );
        assert!(store.is_empty());
    }

    #[test]
    #[should_panic(expected = "requested as bool")]
    fn wrong_accessor_type_panics() {
        let mut store = QuirksStore::new();
        let section = Section::new("s", Match::new().bus(Bus::Ps2).unwrap())
            .with(Quirk::MousedTapTimeout, PropertyValue::Uint(10))
            .unwrap();
        store.push(section).unwrap();
        let quirks = store.fetch(&device()).unwrap();
        quirks.get_bool(Quirk::MousedTapTimeout);
    }
}
