pub mod action;
pub mod codes;
pub mod event;
pub mod frame;

pub use action::{ButtonEvent, Buttons, PointerAction};
pub use event::{EventKind, InputEvent, Timestamp};
pub use frame::{DeviceFrame, FrameAssembler, MouseFrame, TouchFrame};
