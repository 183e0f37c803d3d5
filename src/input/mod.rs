//! Response capture: normalized input events and the per-trial response gate

mod capture;
mod event;
mod gate;

pub use capture::{from_terminal_event, key_from_terminal, pointer_side};
pub use event::{Direction, InputEvent, InputKind, ResponseKey};
pub use gate::ResponseGate;
