use super::{Color, Role, Square};

/// A move that was applied to the board.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Played {
    /// The side that moved.
    pub color: Color,
    /// The kind of piece that moved.
    pub role: Role,
    pub whence: Square,
    /// Where the moving piece landed, which for castling is the king's destination.
    pub whither: Square,
    /// The kind of piece captured, if any.
    pub capture: Option<Role>,
    pub promotion: Option<Role>,
    /// The move in normalized algebraic notation, including check suffixes.
    pub san: String,
}
