use super::{Color, DrawKind, Played, Termination};
use derive_more::{Display, Error};
use shakmaty::{self as sm, fen::Fen, san::SanPlus, EnPassantMode};
use std::collections::HashMap;
use tracing::instrument;

/// Represents a move the rules engine refused in a given position.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error)]
#[display(fmt = "move `{}` is illegal in position `{}`", _0, _1)]
pub struct IllegalMove(pub String, pub String);

/// The board as reconstructed from a sequence of moves.
///
/// Besides the current position, it remembers how often every position
/// occurred so that repetitions can be detected.
#[derive(Debug, Clone)]
pub struct Board {
    chess: sm::Chess,
    seen: HashMap<String, usize>,
}

impl Default for Board {
    fn default() -> Self {
        let mut board = Board {
            chess: sm::Chess::default(),
            seen: HashMap::new(),
        };

        board.remember();
        board
    }
}

impl Board {
    /// Rebuilds the board from scratch by playing every move from the starting position.
    #[instrument(level = "trace", skip(moves), err)]
    pub fn replay<I, S>(moves: I) -> Result<Self, IllegalMove>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut board = Board::default();
        for m in moves {
            board.play(m.as_ref())?;
        }

        Ok(board)
    }

    /// The side to move.
    pub fn turn(&self) -> Color {
        sm::Position::turn(&self.chess).into()
    }

    /// The current position in [FEN].
    ///
    /// [FEN]: https://www.chessprogramming.org/Forsyth-Edwards_Notation
    pub fn fen(&self) -> String {
        Fen::from_position(self.chess.clone(), EnPassantMode::Legal).to_string()
    }

    /// Plays a move given in algebraic notation.
    pub fn play(&mut self, text: &str) -> Result<Played, IllegalMove> {
        let m = text
            .trim()
            .parse::<SanPlus>()
            .ok()
            .and_then(|san| san.san.to_move(&self.chess).ok())
            .ok_or_else(|| IllegalMove(text.to_string(), self.fen()))?;

        let color = self.turn();
        let whither = match m.castling_side() {
            Some(side) => side.king_to(color.into()),
            None => m.to(),
        };

        let san = SanPlus::from_move_and_play_unchecked(&mut self.chess, &m);
        self.remember();

        Ok(Played {
            color,
            role: m.role().into(),
            whence: m.from().unwrap_or(whither).into(),
            whither: whither.into(),
            capture: m.capture().map(Into::into),
            promotion: m.promotion().map(Into::into),
            san: san.to_string(),
        })
    }

    /// How the game ended, if the rules say it has.
    pub fn termination(&self) -> Option<Termination> {
        if sm::Position::is_checkmate(&self.chess) {
            Some(Termination::Checkmate(!self.turn()))
        } else if sm::Position::is_stalemate(&self.chess) {
            Some(Termination::RulesDraw(DrawKind::Stalemate))
        } else if sm::Position::is_insufficient_material(&self.chess) {
            Some(Termination::RulesDraw(DrawKind::InsufficientMaterial))
        } else if sm::Position::halfmoves(&self.chess) >= 100 {
            Some(Termination::RulesDraw(DrawKind::FiftyMoveRule))
        } else if self.seen.get(&self.key()).copied().unwrap_or(0) >= 3 {
            Some(Termination::RulesDraw(DrawKind::ThreefoldRepetition))
        } else {
            None
        }
    }

    /// Identifies the position regardless of the move counters.
    fn key(&self) -> String {
        let fen = self.fen();
        fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
    }

    fn remember(&mut self) {
        *self.seen.entry(self.key()).or_default() += 1;
    }
}
