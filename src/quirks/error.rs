use std::path::PathBuf;

use thiserror::Error;

use super::property::{PropertyKind, Quirk};

#[derive(Debug, Error)]
pub enum QuirksError {
    #[error("quirks: cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("quirks: {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("quirks: section `{0}` has no match predicate")]
    EmptyMatch(String),
    #[error("quirks: section `{0}` sets no property")]
    NoProperties(String),
    #[error("quirks: unknown property `{0}`")]
    UnknownProperty(String),
    #[error("quirks: {quirk:?} expects a {expected:?} value, got `{found}`")]
    InvalidValue {
        quirk: Quirk,
        expected: PropertyKind,
        found: String,
    },
    #[error("quirks: invalid glob `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("quirks: unknown bus `{0}`")]
    UnknownBus(String),
    #[error("quirks: unknown udev type `{0}`")]
    UnknownUdevType(String),
    #[error("quirks: malformed tuple `{0}`")]
    InvalidTuple(String),
    #[error("quirks: {0} declared more than once")]
    DuplicateMatch(&'static str),
}

/// 固定容量容器已满, 多出来的条目被丢弃
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("capacity of {capacity} entries exhausted")]
pub struct Saturated {
    pub capacity: usize,
}
