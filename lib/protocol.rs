mod decoder;
mod event;
mod message;

pub use decoder::*;
pub use event::*;
pub use message::*;
