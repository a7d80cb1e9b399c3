//! quirks 文件的 TOML 前端
//!
//! ```toml
//! [[section]]
//! name = "Logitech M570"
//! match = { bus = "usb", vendor = 0x046d, product = [0x1028] }
//! properties = { MousedEmulateThirdButton = true, AttrEventCode = "-BTN_SIDE" }
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::{info, warn};

use super::{
    error::QuirksError,
    matcher::Match,
    property::{PropertyValue, Quirk},
    store::{QuirksStore, Section},
};
use crate::device::{Bus, UdevType};

const QUIRKS_EXTENSION: &str = "quirks";

#[derive(Debug, Deserialize)]
struct QuirksFile {
    #[serde(default)]
    section: Vec<RawSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSection {
    name: String,
    #[serde(rename = "match", default)]
    matcher: RawMatch,
    #[serde(default)]
    properties: toml::Table,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMatch {
    name: Option<String>,
    uniq: Option<String>,
    bus: Option<String>,
    vendor: Option<u16>,
    product: Option<Vec<u16>>,
    version: Option<u16>,
    udev_type: Option<Vec<String>>,
    dmi: Option<String>,
    dt: Option<String>,
}

impl RawMatch {
    fn build(self, section: &str) -> Result<Match, QuirksError> {
        let mut m = Match::new();
        if let Some(name) = &self.name {
            m = m.name(name)?;
        }
        if let Some(uniq) = &self.uniq {
            m = m.uniq(uniq)?;
        }
        if let Some(bus) = &self.bus {
            let bus = Bus::from_name(bus).ok_or_else(|| QuirksError::UnknownBus(bus.clone()))?;
            m = m.bus(bus)?;
        }
        if let Some(vendor) = self.vendor {
            m = m.vendor(vendor)?;
        }
        if let Some(products) = &self.product {
            let (built, saturated) = m.products(products)?;
            if let Some(e) = saturated {
                warn!(section, "MatchProduct list truncated: {e}");
            }
            m = built;
        }
        if let Some(version) = self.version {
            m = m.version(version)?;
        }
        if let Some(names) = &self.udev_type {
            let mut ty = UdevType::empty();
            for name in names {
                ty |= UdevType::from_udev_name(name)
                    .ok_or_else(|| QuirksError::UnknownUdevType(name.clone()))?;
            }
            m = m.udev_type(ty)?;
        }
        if let Some(dmi) = &self.dmi {
            m = m.dmi(dmi)?;
        }
        if let Some(dt) = &self.dt {
            m = m.dt(dt)?;
        }
        Ok(m)
    }
}

impl RawSection {
    fn build(self) -> Result<Section, QuirksError> {
        let matcher = self.matcher.build(&self.name)?;
        let mut section = Section::new(self.name, matcher);
        for (key, raw) in &self.properties {
            let quirk =
                Quirk::from_name(key).ok_or_else(|| QuirksError::UnknownProperty(key.clone()))?;
            section = section.with(quirk, PropertyValue::parse(quirk, raw)?)?;
        }
        section.validate()?;
        Ok(section)
    }
}

/// 解析一个文件的内容并追加到 store
///
/// 整个文件解析失败时返回错误; 单个 section 出错只跳过该 section
pub fn load_str(store: &mut QuirksStore, path: &Path, text: &str) -> Result<usize, QuirksError> {
    let file: QuirksFile = toml::from_str(text).map_err(|source| QuirksError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let mut loaded = 0;
    for raw in file.section {
        let name = raw.name.clone();
        match raw.build().and_then(|section| store.push(section)) {
            Ok(()) => loaded += 1,
            Err(e) => warn!(file = %path.display(), section = %name, "skipping section: {e}"),
        }
    }
    Ok(loaded)
}

/// 按文件名顺序加载目录下所有 `*.quirks` 文件
pub fn load_dir(dir: &Path) -> Result<QuirksStore, QuirksError> {
    let io_err = |source| QuirksError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_err)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == QUIRKS_EXTENSION))
        .collect();
    paths.sort();

    let mut store = QuirksStore::new();
    for path in paths {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(source) => {
                warn!("{}", QuirksError::Io { path, source });
                continue;
            }
        };
        match load_str(&mut store, &path, &text) {
            Ok(count) => info!(file = %path.display(), sections = count, "quirks loaded"),
            Err(e) => warn!("skipping file: {e}"),
        }
    }
    Ok(store)
}
