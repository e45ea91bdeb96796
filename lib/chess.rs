mod board;
mod color;
mod pgn;
mod played;
mod role;
mod square;
mod termination;

pub use board::*;
pub use color::*;
pub use pgn::*;
pub use played::*;
pub use role::*;
pub use square::*;
pub use termination::*;
