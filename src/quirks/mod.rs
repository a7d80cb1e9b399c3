//! 按设备身份匹配的配置覆盖
//!
//! 标量属性后者覆盖前者, `AttrEventCode` / `AttrInputProp` 这种列表按元组逐个合并

pub mod error;
pub mod loader;
pub mod matcher;
pub mod property;
pub mod store;

pub use error::{QuirksError, Saturated};
pub use matcher::{Match, MatchFlags};
pub use property::{PropertyValue, Quirk, Tuple, TupleList};
pub use store::{QuirkSet, QuirksStore, Section};
