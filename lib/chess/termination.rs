use super::Color;
use derive_more::Display;

/// The rule under which a game was drawn without agreement.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum DrawKind {
    #[display(fmt = "stalemate")]
    Stalemate,

    #[display(fmt = "insufficient material")]
    InsufficientMaterial,

    #[display(fmt = "fifty-move rule")]
    FiftyMoveRule,

    #[display(fmt = "threefold repetition")]
    ThreefoldRepetition,
}

/// The reason why a game ended.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum Termination {
    #[display(fmt = "checkmate by the {_0} player")]
    Checkmate(Color),

    #[display(fmt = "{_0} player resigned")]
    Resignation(Color),

    #[display(fmt = "draw by agreement")]
    DrawAgreement,

    #[display(fmt = "draw by {_0}")]
    RulesDraw(DrawKind),
}

impl Termination {
    /// Whether neither side has won.
    pub fn is_draw(&self) -> bool {
        !self.is_decisive()
    }

    /// Whether one of the sides has won.
    pub fn is_decisive(&self) -> bool {
        matches!(self, Termination::Checkmate(_) | Termination::Resignation(_))
    }

    /// The winning side, if the game was [decisive](`Self::is_decisive`).
    pub fn winner(&self) -> Option<Color> {
        match *self {
            Termination::Checkmate(c) => Some(c),
            Termination::Resignation(c) => Some(!c),
            _ => None,
        }
    }

    /// The game result as it appears in PGN.
    pub fn score(&self) -> &'static str {
        match self.winner() {
            Some(Color::White) => "1-0",
            Some(Color::Black) => "0-1",
            None => "1/2-1/2",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[proptest]
    fn termination_is_either_draw_or_decisive(t: Termination) {
        assert_ne!(t.is_draw(), t.is_decisive());
    }

    #[proptest]
    fn neither_side_wins_if_draw(#[filter(#t.is_draw())] t: Termination) {
        assert_eq!(t.winner(), None);
        assert_eq!(t.score(), "1/2-1/2");
    }

    #[proptest]
    fn side_that_checkmates_wins(c: Color) {
        assert_eq!(Termination::Checkmate(c).winner(), Some(c));
    }

    #[proptest]
    fn side_that_resigns_loses(c: Color) {
        assert_eq!(Termination::Resignation(c).winner(), Some(!c));
    }

    #[test]
    fn score_follows_the_winner() {
        assert_eq!(Termination::Checkmate(Color::White).score(), "1-0");
        assert_eq!(Termination::Resignation(Color::White).score(), "0-1");
    }
}
