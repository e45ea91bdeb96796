use crate::chess::{Board, ByColor, Color, Pgn, Played, Role, Termination};
use derive_more::Display;
use std::time::Duration;

/// Identifies one request issued to the move source.
///
/// Responses are only ever applied if they carry the ticket of the
/// request the session is currently waiting on.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[display(fmt = "#{}", _0)]
pub struct Ticket(pub u64);

/// The lifecycle of a game.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Status {
    #[display(fmt = "not started")]
    NotStarted,

    #[display(fmt = "in progress")]
    InProgress,

    #[display(fmt = "paused")]
    Paused,

    #[display(fmt = "awaiting draw response")]
    AwaitingDrawResponse,

    #[display(fmt = "finished, {_0}")]
    Finished(Termination),
}

/// Per-turn measurements, one entry per completed turn.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct Metrics {
    pub thinking_tokens: Vec<u64>,
    pub elapsed: Vec<Duration>,
}

impl Metrics {
    /// The number of completed turns.
    pub fn len(&self) -> usize {
        self.thinking_tokens.len()
    }

    /// Whether no turn has completed yet.
    pub fn is_empty(&self) -> bool {
        self.thinking_tokens.is_empty()
    }

    fn push(&mut self, tokens: u64, elapsed: Duration) {
        self.thinking_tokens.push(tokens);
        self.elapsed.push(elapsed);
    }
}

/// The complete mutable state of one game.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Session {
    position: String,
    history: Vec<String>,
    turn: Color,
    models: ByColor<Option<String>>,
    status: Status,
    captured: ByColor<Vec<Role>>,
    metrics: Metrics,
    draw_offer: Option<Color>,
    thinking: String,
    last_move: Option<Played>,
    in_flight: Option<Ticket>,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            position: Board::default().fen(),
            history: Vec::new(),
            turn: Color::White,
            models: ByColor::default(),
            status: Status::NotStarted,
            captured: ByColor::default(),
            metrics: Metrics::default(),
            draw_offer: None,
            thinking: String::new(),
            last_move: None,
            in_flight: None,
        }
    }
}

impl Session {
    /// The current position in FEN.
    pub fn position(&self) -> &str {
        &self.position
    }

    /// The moves played so far.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// The side whose turn it is.
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// The model assigned to a side.
    pub fn model(&self, c: Color) -> Option<&str> {
        self.models[c].as_deref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// How the game ended, if it has.
    pub fn termination(&self) -> Option<Termination> {
        match self.status {
            Status::Finished(t) => Some(t),
            _ => None,
        }
    }

    /// Whether the game has ended.
    pub fn is_finished(&self) -> bool {
        self.termination().is_some()
    }

    /// Whether turns are being played, as opposed to not started, paused or finished.
    pub fn is_playing(&self) -> bool {
        matches!(self.status, Status::InProgress | Status::AwaitingDrawResponse)
    }

    /// The pieces captured by a side, in order of capture.
    pub fn captured(&self, c: Color) -> &[Role] {
        &self.captured[c]
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The side that offered a draw still waiting for an answer.
    pub fn pending_draw_offer(&self) -> Option<Color> {
        self.draw_offer
    }

    /// The visible reasoning of the model currently thinking.
    pub fn thinking(&self) -> &str {
        &self.thinking
    }

    /// The most recently applied move.
    pub fn last_move(&self) -> Option<&Played> {
        self.last_move.as_ref()
    }

    /// The request the session is waiting on, if any.
    pub fn in_flight(&self) -> Option<Ticket> {
        self.in_flight
    }

    /// The game so far in PGN.
    pub fn pgn(&self) -> Pgn {
        Pgn {
            white: self.model(Color::White).unwrap_or("?").to_string(),
            black: self.model(Color::Black).unwrap_or("?").to_string(),
            outcome: self.termination(),
            moves: self.history.clone(),
        }
    }

    pub(crate) fn assign(&mut self, c: Color, model: String) {
        self.models[c] = Some(model);
    }

    /// Clears all per-game state, keeping only the assigned models.
    pub(crate) fn reset(&mut self) {
        let models = std::mem::take(&mut self.models);
        *self = Session {
            models,
            ..Session::default()
        };
    }

    pub(crate) fn start(&mut self) {
        self.reset();
        self.status = Status::InProgress;
    }

    pub(crate) fn pause(&mut self) {
        self.status = Status::Paused;
    }

    pub(crate) fn resume(&mut self) {
        self.status = match self.draw_offer {
            Some(_) => Status::AwaitingDrawResponse,
            None => Status::InProgress,
        };
    }

    /// Marks a request as outstanding and forgets the previous reasoning.
    pub(crate) fn begin_request(&mut self, ticket: Ticket) {
        self.in_flight = Some(ticket);
        self.thinking.clear();
    }

    pub(crate) fn end_request(&mut self) {
        self.in_flight = None;
    }

    pub(crate) fn show_thinking(&mut self, text: &str) {
        self.thinking.clear();
        self.thinking.push_str(text);
    }

    pub(crate) fn clear_thinking(&mut self) {
        self.thinking.clear();
    }

    /// Records a move accepted by the rules engine.
    pub(crate) fn record_move(
        &mut self,
        played: Played,
        board: &Board,
        tokens: u64,
        elapsed: Duration,
    ) {
        self.history.push(played.san.clone());
        self.position = board.fen();
        self.turn = board.turn();

        if let Some(r) = played.capture {
            self.captured[played.color].push(r);
        }

        if let Some(t) = board.termination() {
            self.status = Status::Finished(t);
        }

        self.metrics.push(tokens, elapsed);
        self.last_move = Some(played);
    }

    pub(crate) fn record_resignation(&mut self, c: Color, tokens: u64, elapsed: Duration) {
        self.status = Status::Finished(Termination::Resignation(c));
        self.metrics.push(tokens, elapsed);
    }

    pub(crate) fn record_draw_offer(&mut self, c: Color, tokens: u64, elapsed: Duration) {
        self.draw_offer = Some(c);
        if self.status == Status::InProgress {
            self.status = Status::AwaitingDrawResponse;
        }

        self.metrics.push(tokens, elapsed);
    }

    pub(crate) fn record_draw_response(&mut self, accepted: bool, tokens: u64, elapsed: Duration) {
        self.draw_offer = None;
        if accepted {
            self.status = Status::Finished(Termination::DrawAgreement);
        } else if self.status == Status::AwaitingDrawResponse {
            self.status = Status::InProgress;
        }

        self.metrics.push(tokens, elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::DrawKind;
    use test_strategy::proptest;

    fn started() -> Session {
        let mut session = Session::default();
        session.assign(Color::White, "o4-mini".into());
        session.assign(Color::Black, "grok-3-mini".into());
        session.start();
        session
    }

    fn play(session: &mut Session, moves: &[&str]) {
        let mut board = Board::replay(session.history()).unwrap();
        for m in moves {
            let played = board.play(m).unwrap();
            session.record_move(played, &board, 1, Duration::ZERO);
        }
    }

    #[test]
    fn new_session_has_not_started() {
        let session = Session::default();
        assert_eq!(session.status(), Status::NotStarted);
        assert_eq!(session.turn(), Color::White);
        assert_eq!(session.position(), Board::default().fen());
        assert!(session.history().is_empty());
        assert!(session.metrics().is_empty());
    }

    #[test]
    fn reset_keeps_only_the_models() {
        let mut session = started();
        play(&mut session, &["e4", "d5", "exd5"]);
        session.begin_request(Ticket(3));
        session.show_thinking("hmm");

        session.reset();

        assert_eq!(
            session,
            Session {
                models: ByColor {
                    white: Some("o4-mini".into()),
                    black: Some("grok-3-mini".into()),
                },
                ..Session::default()
            }
        );
    }

    #[test]
    fn captures_are_attributed_to_the_capturing_side() {
        let mut session = started();
        play(&mut session, &["e4", "d5", "exd5", "Qxd5"]);

        assert_eq!(session.captured(Color::White), &[Role::Pawn]);
        assert_eq!(session.captured(Color::Black), &[Role::Pawn]);
        assert_eq!(session.last_move().map(|m| m.role), Some(Role::Queen));
    }

    #[test]
    fn every_recorded_turn_appends_metrics() {
        let mut session = started();
        play(&mut session, &["e4"]);
        session.record_draw_offer(Color::Black, 2, Duration::from_secs(2));
        session.record_draw_response(false, 3, Duration::from_secs(3));
        session.record_resignation(Color::Black, 4, Duration::from_secs(4));

        assert_eq!(session.metrics().len(), 4);
        assert_eq!(session.metrics().thinking_tokens, vec![1, 2, 3, 4]);
        assert_eq!(session.metrics().elapsed.len(), 4);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn checkmate_finishes_the_game() {
        let mut session = started();
        play(&mut session, &["f3", "e5", "g4", "Qh4#"]);

        assert_eq!(
            session.status(),
            Status::Finished(Termination::Checkmate(Color::Black))
        );

        assert!(!session.is_playing());
    }

    #[test]
    fn stalemate_finishes_the_game_as_a_rules_draw() {
        let mut session = started();
        play(
            &mut session,
            &[
                "e3", "a5", "Qh5", "Ra6", "Qxa5", "h5", "h4", "Rah6", "Qxc7", "f6", "Qxd7+",
                "Kf7", "Qxb7", "Qd3", "Qxb8", "Qh7", "Qxc8", "Kg6", "Qe6",
            ],
        );

        assert_eq!(
            session.termination(),
            Some(Termination::RulesDraw(DrawKind::Stalemate))
        );
    }

    #[proptest]
    fn draw_offer_awaits_a_response(c: Color) {
        let mut session = started();
        session.record_draw_offer(c, 0, Duration::ZERO);

        assert_eq!(session.status(), Status::AwaitingDrawResponse);
        assert_eq!(session.pending_draw_offer(), Some(c));
        assert_eq!(session.turn(), Color::White);
    }

    #[proptest]
    fn draw_offer_while_paused_stays_paused(c: Color) {
        let mut session = started();
        session.pause();
        session.record_draw_offer(c, 0, Duration::ZERO);

        assert_eq!(session.status(), Status::Paused);
        assert_eq!(session.pending_draw_offer(), Some(c));

        session.resume();
        assert_eq!(session.status(), Status::AwaitingDrawResponse);
    }

    #[test]
    fn accepted_draw_finishes_the_game() {
        let mut session = started();
        session.record_draw_offer(Color::White, 0, Duration::ZERO);
        session.record_draw_response(true, 0, Duration::ZERO);

        assert_eq!(session.termination(), Some(Termination::DrawAgreement));
        assert_eq!(session.pending_draw_offer(), None);
    }

    #[test]
    fn declined_draw_resumes_play() {
        let mut session = started();
        session.record_draw_offer(Color::White, 0, Duration::ZERO);
        session.record_draw_response(false, 0, Duration::ZERO);

        assert_eq!(session.status(), Status::InProgress);
        assert_eq!(session.pending_draw_offer(), None);
        assert_eq!(session.turn(), Color::White);
    }

    #[test]
    fn pgn_is_tagged_with_the_models() {
        let mut session = started();
        play(&mut session, &["e4", "e5"]);

        let pgn = session.pgn();
        assert_eq!(pgn.white, "o4-mini");
        assert_eq!(pgn.black, "grok-3-mini");
        assert_eq!(pgn.moves, vec!["e4", "e5"]);
        assert_eq!(pgn.outcome, None);
    }
}
