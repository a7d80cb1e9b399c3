//! 守护进程配置文件
//!
//! ```toml
//! [mouse]
//! wheel_buttons = 4
//!
//! [emulation]
//! enabled = true
//! timeout_ms = 80
//! ```
//!
//! 匹配到的 quirks 逐设备覆盖这里的值

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    click::ClickSettings,
    drift::DriftSettings,
    emulation::EmulationSettings,
    gesture::TouchpadSettings,
    quirks::{Quirk, QuirkSet},
    scroll::ScrollSettings,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MouseSettings {
    /// 滚轮映射成按键时的起始编号, 0 表示不映射
    pub wheel_buttons: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub mouse: MouseSettings,
    pub touchpad: TouchpadSettings,
    pub scroll: ScrollSettings,
    pub drift: DriftSettings,
    pub emulation: EmulationSettings,
    pub click: ClickSettings,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 叠加某个设备的 quirks, 得到该设备实际使用的参数
    pub fn with_quirks(&self, quirks: &QuirkSet) -> Self {
        let mut mouse = self.mouse.clone();
        if let Some(base) = quirks.get_uint(Quirk::MousedWheelButtons) {
            mouse.wheel_buttons = u8::try_from(base).unwrap_or(0);
        }
        Self {
            mouse,
            touchpad: self.touchpad.clone().with_quirks(quirks),
            scroll: self.scroll.clone().with_quirks(quirks),
            drift: self.drift.clone().with_quirks(quirks),
            emulation: self.emulation.clone().with_quirks(quirks),
            click: self.click.clone().with_quirks(quirks),
        }
    }
}
