use super::Termination;
use std::fmt::{self, Display};

/// The description of a chess game.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Pgn {
    pub white: String,
    pub black: String,
    pub outcome: Option<Termination>,
    pub moves: Vec<String>,
}

/// Prints a simplified [PGN] description of the game
///
/// [PGN]: https://www.chessprogramming.org/Portable_Game_Notation
impl Display for Pgn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "[White {:?}]", self.white)?;
        writeln!(f, "[Black {:?}]", self.black)?;

        match self.outcome {
            Some(t) => writeln!(f, "[Result \"{}\"]", t.score())?,
            None => writeln!(f, "[Result \"*\"]")?,
        }

        for (i, san) in self.moves.iter().enumerate() {
            if i % 2 == 0 {
                write!(f, "{}. ", i / 2 + 1)?;
            }

            write!(f, "{} ", san)?;
        }

        match self.outcome {
            Some(t) => write!(f, "{{{}}} {}", t, t.score()),
            None => write!(f, "*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::{Color, DrawKind};
    use pgn_reader::{BufferedReader, Visitor};
    use shakmaty::san::SanPlus;
    use std::mem::take;

    #[derive(Default)]
    struct PgnVisitor {
        moves: Vec<String>,
    }

    impl Visitor for PgnVisitor {
        type Result = Vec<String>;

        fn san(&mut self, sp: SanPlus) {
            self.moves.push(sp.to_string());
        }

        fn end_game(&mut self) -> Self::Result {
            take(&mut self.moves)
        }
    }

    fn read(pgn: &Pgn) -> Option<Vec<String>> {
        let mut reader = BufferedReader::new_cursor(pgn.to_string());
        let mut visitor = PgnVisitor::default();
        reader.read_game(&mut visitor).ok().flatten()
    }

    #[test]
    fn prints_readable_pgn_of_finished_games() {
        let pgn = Pgn {
            white: "o4-mini".into(),
            black: "grok-3-mini".into(),
            outcome: Some(Termination::Checkmate(Color::Black)),
            moves: vec!["f3".into(), "e5".into(), "g4".into(), "Qh4#".into()],
        };

        assert_eq!(read(&pgn), Some(pgn.moves.clone()));
        assert!(pgn.to_string().ends_with("0-1"));
    }

    #[test]
    fn prints_readable_pgn_of_unfinished_games() {
        let pgn = Pgn {
            white: "o4-mini".into(),
            black: "grok-3-mini".into(),
            outcome: None,
            moves: vec!["e4".into(), "e5".into(), "Nf3".into()],
        };

        assert_eq!(read(&pgn), Some(pgn.moves.clone()));
        assert!(pgn.to_string().ends_with('*'));
    }

    #[test]
    fn draws_are_annotated_with_their_reason() {
        let pgn = Pgn {
            white: "a".into(),
            black: "b".into(),
            outcome: Some(Termination::RulesDraw(DrawKind::Stalemate)),
            moves: vec![],
        };

        assert!(pgn.to_string().ends_with("{draw by stalemate} 1/2-1/2"));
    }
}
