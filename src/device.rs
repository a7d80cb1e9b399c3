use std::fmt;

use bitflags::bitflags;
use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Deserializer, de};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum Bus {
    Pci = 0x01,
    Usb = 0x03,
    Bluetooth = 0x05,
    Virtual = 0x06,
    Ps2 = 0x11,
    I2c = 0x18,
    Spi = 0x1c,
    Rmi = 0x1d,
    #[num_enum(catch_all)]
    Other(u16),
}

impl Bus {
    pub fn from_name(name: &str) -> Option<Self> {
        let bus = match name {
            "pci" => Bus::Pci,
            "usb" => Bus::Usb,
            "bluetooth" => Bus::Bluetooth,
            "virtual" => Bus::Virtual,
            "ps2" => Bus::Ps2,
            "i2c" => Bus::I2c,
            "spi" => Bus::Spi,
            "rmi" => Bus::Rmi,
            _ => return None,
        };
        Some(bus)
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bus::Pci => write!(f, "pci"),
            Bus::Usb => write!(f, "usb"),
            Bus::Bluetooth => write!(f, "bluetooth"),
            Bus::Virtual => write!(f, "virtual"),
            Bus::Ps2 => write!(f, "ps2"),
            Bus::I2c => write!(f, "i2c"),
            Bus::Spi => write!(f, "spi"),
            Bus::Rmi => write!(f, "rmi"),
            Bus::Other(id) => write!(f, "{id:#06x}"),
        }
    }
}

impl<'de> Deserialize<'de> for Bus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Bus::from_name(&name).ok_or_else(|| de::Error::custom(format!("unknown bus `{name}`")))
    }
}

bitflags! {
    /// udev 风格的设备类别位图
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UdevType: u32 {
        const MOUSE = 1 << 0;
        const POINTINGSTICK = 1 << 1;
        const TOUCHPAD = 1 << 2;
        const TABLET = 1 << 3;
        const TABLET_PAD = 1 << 4;
        const JOYSTICK = 1 << 5;
        const KEYBOARD = 1 << 6;
    }
}

impl UdevType {
    pub fn from_udev_name(name: &str) -> Option<Self> {
        let ty = match name {
            "mouse" => UdevType::MOUSE,
            "pointingstick" => UdevType::POINTINGSTICK,
            "touchpad" => UdevType::TOUCHPAD,
            "tablet" => UdevType::TABLET,
            "tablet-pad" => UdevType::TABLET_PAD,
            "joystick" => UdevType::JOYSTICK,
            "keyboard" => UdevType::KEYBOARD,
            _ => return None,
        };
        Some(ty)
    }
}

impl<'de> Deserialize<'de> for UdevType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names.iter().try_fold(UdevType::empty(), |acc, name| {
            UdevType::from_udev_name(name)
                .map(|ty| acc | ty)
                .ok_or_else(|| de::Error::custom(format!("unknown udev type `{name}`")))
        })
    }
}

/// 设备打开时采集的身份信息, 之后不再改变
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceIdentity {
    pub bus: Bus,
    #[serde(default)]
    pub vendor: u16,
    #[serde(default)]
    pub product: u16,
    #[serde(default)]
    pub version: u16,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uniq: String,
    #[serde(default)]
    pub udev_type: UdevType,
    #[serde(default)]
    pub dmi: Option<String>,
    #[serde(default)]
    pub dt: Option<String>,
}

impl DeviceIdentity {
    pub fn class(&self) -> DeviceClass {
        if self.udev_type.contains(UdevType::TOUCHPAD) {
            DeviceClass::Touchpad
        } else {
            DeviceClass::Mouse
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mouse,
    Touchpad,
}

/// 触摸板的坐标范围和能力, 由探测层提供
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TouchpadCaps {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    /// 每毫米多少设备单位, 0 表示设备没报
    pub res_x: i32,
    pub res_y: i32,
    pub has_pressure: bool,
    pub has_width: bool,
    pub is_clickpad: bool,
}

impl Default for TouchpadCaps {
    fn default() -> Self {
        Self {
            min_x: 0,
            max_x: 4095,
            min_y: 0,
            max_y: 4095,
            res_x: 0,
            res_y: 0,
            has_pressure: true,
            has_width: false,
            is_clickpad: false,
        }
    }
}

/// 设备描述文件: 身份加上可选的触摸板能力
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceDescription {
    pub identity: DeviceIdentity,
    #[serde(default)]
    pub touchpad: Option<TouchpadCaps>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_parses_from_toml() {
        let text = r#"
            [identity]
            bus = "i2c"
            vendor = 0x06cb
            product = 0xcd7d
            name = "SYNA2393:00 06CB:CD7D Touchpad"
            udev_type = ["touchpad", "mouse"]

            [touchpad]
            max_x = 1200
            res_x = 12
            is_clickpad = true
        "#;
        let desc: DeviceDescription = toml::from_str(text).unwrap();
        assert_eq!(desc.identity.bus, Bus::I2c);
        assert_eq!(desc.identity.vendor, 0x06cb);
        assert_eq!(desc.identity.class(), DeviceClass::Touchpad);
        let caps = desc.touchpad.unwrap();
        assert_eq!((caps.max_x, caps.res_x, caps.max_y), (1200, 12, 4095));
        assert!(caps.is_clickpad);
    }

    #[test]
    fn unknown_bus_is_rejected() {
        let text = "[identity]\nbus = \"firewire\"\n";
        assert!(toml::from_str::<DeviceDescription>(text).is_err());
        assert_eq!(Bus::from(0x03), Bus::Usb);
        assert_eq!(Bus::Other(0x42).to_string(), "0x0042");
    }

    #[test]
    fn udev_type_names() {
        assert_eq!(UdevType::from_udev_name("tablet-pad"), Some(UdevType::TABLET_PAD));
        assert_eq!(UdevType::from_udev_name("touchscreen"), None);
        let text = "[identity]\nbus = \"usb\"\nudev_type = [\"pointingstick\", \"mouse\"]\n";
        let desc: DeviceDescription = toml::from_str(text).unwrap();
        assert_eq!(desc.identity.udev_type, UdevType::POINTINGSTICK | UdevType::MOUSE);
    }
}
