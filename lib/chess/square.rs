use derive_more::Display;
use shakmaty as sm;

/// A square on the chess board, printed in coordinate notation, e.g. `e4`.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash)]
#[display(fmt = "{}", _0)]
pub struct Square(sm::Square);

#[doc(hidden)]
impl From<sm::Square> for Square {
    fn from(s: sm::Square) -> Self {
        Square(s)
    }
}

#[doc(hidden)]
impl From<Square> for sm::Square {
    fn from(s: Square) -> Self {
        s.0
    }
}
