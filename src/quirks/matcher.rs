use bitflags::bitflags;
use glob::Pattern;
use heapless::Vec as FixedVec;
use tracing::trace;

use super::error::{QuirksError, Saturated};
use crate::device::{Bus, DeviceIdentity, UdevType};

/// `MatchProduct` 最多列多少个产品号
pub const MAX_PRODUCTS: usize = 64;

bitflags! {
    /// 匹配条件的种类, 一个 section 声明了哪些, 设备就得全部满足
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MatchFlags: u32 {
        const NAME = 1 << 0;
        const UNIQ = 1 << 1;
        const BUS = 1 << 2;
        const VENDOR = 1 << 3;
        const PRODUCT = 1 << 4;
        const VERSION = 1 << 5;
        const UDEV_TYPE = 1 << 6;
        const DMI = 1 << 7;
        const DT = 1 << 8;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Match {
    bits: MatchFlags,
    name: Option<Pattern>,
    uniq: Option<Pattern>,
    bus: Option<Bus>,
    vendor: Option<u16>,
    products: FixedVec<u16, MAX_PRODUCTS>,
    version: Option<u16>,
    udev_type: UdevType,
    dmi: Option<Pattern>,
    dt: Option<Pattern>,
}

fn compile(pattern: &str) -> Result<Pattern, QuirksError> {
    Pattern::new(pattern).map_err(|source| QuirksError::InvalidGlob {
        pattern: pattern.to_string(),
        source,
    })
}

impl Match {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明过的匹配条件
    pub fn bits(&self) -> MatchFlags {
        self.bits
    }

    fn declare(&mut self, flag: MatchFlags, what: &'static str) -> Result<(), QuirksError> {
        if self.bits.contains(flag) {
            return Err(QuirksError::DuplicateMatch(what));
        }
        self.bits |= flag;
        Ok(())
    }

    pub fn name(mut self, pattern: &str) -> Result<Self, QuirksError> {
        self.declare(MatchFlags::NAME, "MatchName")?;
        self.name = Some(compile(pattern)?);
        Ok(self)
    }

    pub fn uniq(mut self, pattern: &str) -> Result<Self, QuirksError> {
        self.declare(MatchFlags::UNIQ, "MatchUniq")?;
        self.uniq = Some(compile(pattern)?);
        Ok(self)
    }

    pub fn bus(mut self, bus: Bus) -> Result<Self, QuirksError> {
        self.declare(MatchFlags::BUS, "MatchBus")?;
        self.bus = Some(bus);
        Ok(self)
    }

    pub fn vendor(mut self, vendor: u16) -> Result<Self, QuirksError> {
        self.declare(MatchFlags::VENDOR, "MatchVendor")?;
        self.vendor = Some(vendor);
        Ok(self)
    }

    /// 产品号列表, 超出容量的部分被截掉并通过返回值报告
    pub fn products(
        mut self,
        products: &[u16],
    ) -> Result<(Self, Option<Saturated>), QuirksError> {
        self.declare(MatchFlags::PRODUCT, "MatchProduct")?;
        let mut saturated = None;
        for &product in products {
            if self.products.push(product).is_err() {
                saturated = Some(Saturated {
                    capacity: MAX_PRODUCTS,
                });
                break;
            }
        }
        Ok((self, saturated))
    }

    pub fn version(mut self, version: u16) -> Result<Self, QuirksError> {
        self.declare(MatchFlags::VERSION, "MatchVersion")?;
        self.version = Some(version);
        Ok(self)
    }

    pub fn udev_type(mut self, udev_type: UdevType) -> Result<Self, QuirksError> {
        self.declare(MatchFlags::UDEV_TYPE, "MatchUdevType")?;
        self.udev_type = udev_type;
        Ok(self)
    }

    pub fn dmi(mut self, pattern: &str) -> Result<Self, QuirksError> {
        self.declare(MatchFlags::DMI, "MatchDMIModalias")?;
        self.dmi = Some(compile(pattern)?);
        Ok(self)
    }

    pub fn dt(mut self, pattern: &str) -> Result<Self, QuirksError> {
        self.declare(MatchFlags::DT, "MatchDeviceTree")?;
        self.dt = Some(compile(pattern)?);
        Ok(self)
    }

    /// 只检查声明过的条件, 返回设备满足的那些
    pub fn evaluate(&self, device: &DeviceIdentity) -> MatchFlags {
        let mut matched = MatchFlags::empty();
        if let Some(pattern) = &self.name {
            matched.set(MatchFlags::NAME, pattern.matches(&device.name));
        }
        if let Some(pattern) = &self.uniq {
            matched.set(MatchFlags::UNIQ, pattern.matches(&device.uniq));
        }
        if let Some(bus) = self.bus {
            matched.set(MatchFlags::BUS, bus == device.bus);
        }
        if let Some(vendor) = self.vendor {
            matched.set(MatchFlags::VENDOR, vendor == device.vendor);
        }
        if self.bits.contains(MatchFlags::PRODUCT) {
            matched.set(MatchFlags::PRODUCT, self.products.contains(&device.product));
        }
        if let Some(version) = self.version {
            matched.set(MatchFlags::VERSION, version == device.version);
        }
        if self.bits.contains(MatchFlags::UDEV_TYPE) {
            matched.set(
                MatchFlags::UDEV_TYPE,
                self.udev_type.intersects(device.udev_type),
            );
        }
        if let Some(pattern) = &self.dmi {
            let hit = device.dmi.as_deref().is_some_and(|dmi| pattern.matches(dmi));
            matched.set(MatchFlags::DMI, hit);
        }
        if let Some(pattern) = &self.dt {
            let hit = device.dt.as_deref().is_some_and(|dt| pattern.matches(dt));
            matched.set(MatchFlags::DT, hit);
        }
        matched
    }

    pub fn matches(&self, device: &DeviceIdentity) -> bool {
        let matched = self.evaluate(device);
        trace!(declared = ?self.bits, ?matched, "match evaluated");
        !self.bits.is_empty() && matched == self.bits
    }
}
