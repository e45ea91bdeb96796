use crate::chess::{Board, Color, Played, Termination};
use crate::protocol::{DrawReply, MoveRequest, Reply, ResultPayload, StreamEvent};
use crate::session::{Session, Status, Ticket};
use crate::source::{MoveSource, SourceError};
use crate::{roster, timing::Timing};
use derive_more::{Display, Error};
use futures_util::{stream::BoxStream, StreamExt};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::{task::JoinHandle, time::sleep_until, time::Instant};
use tracing::{debug, info, instrument, trace, warn};

/// The reason why the controller refused an intent.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash, Error)]
pub enum ControlError {
    #[display(fmt = "the {_0} player has no model assigned")]
    MissingModel(#[error(not(source))] Color),

    #[display(fmt = "a game is being played")]
    GameInProgress,

    #[display(fmt = "the game is not in progress")]
    NotInProgress,

    #[display(fmt = "a request is already in flight")]
    Busy,

    #[display(fmt = "the game is over")]
    GameOver,
}

/// A model answered with a move the rules engine refused.
#[derive(Debug, Display, Clone, Eq, PartialEq, Hash, Error)]
#[display(fmt = "{} playing {} returned the invalid move `{}`", model, color, raw)]
pub struct InvalidMove {
    pub model: String,
    pub color: Color,
    pub raw: String,
}

/// Whether turns start on their own or wait for [`Controller::advance_turn`].
#[derive(Debug, Display, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Pace {
    #[default]
    #[display(fmt = "auto")]
    Auto,
    #[display(fmt = "manual")]
    Manual,
}

/// What a request asks of a model.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RequestKind {
    #[display(fmt = "move")]
    Move,
    #[display(fmt = "draw response")]
    DrawResponse,
}

/// An observable change of the controller's state.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Update {
    /// A request was issued to the move source.
    Requested {
        color: Color,
        model: String,
        kind: RequestKind,
    },

    /// The visible reasoning changed, see [`Session::thinking`].
    Reasoning,

    /// A move was applied to the board.
    Moved(Played),

    /// A side offered a draw.
    DrawOffered(Color),

    /// A side declined the draw offered by its opponent.
    DrawDeclined(Color),

    /// The game ended.
    Finished(Termination),

    /// A model returned an invalid move, it will be asked again.
    Rejected(InvalidMove),

    /// The move source failed to answer, the turn may be retried.
    Failed { color: Color, reason: String },

    /// The warning about an invalid move expired.
    Cleared,
}

/// A transient warning and the instant it expires.
#[derive(Debug, Clone, Eq, PartialEq)]
struct Notice {
    warning: InvalidMove,
    expires: Instant,
}

#[derive(Debug)]
struct Request {
    ticket: Ticket,
    kind: RequestKind,
    color: Color,
    model: String,
    started: Instant,
    live: String,
    task: JoinHandle<()>,
}

#[derive(Debug)]
enum Message {
    Thought(Ticket, String),
    ThoughtEnd(Ticket),
    Moved(Ticket, Result<ResultPayload, SourceError>),
    Responded(Ticket, Result<DrawReply, SourceError>),
}

enum Wake {
    Message(Message),
    Clear,
    Flush,
    Advance,
}

/// Drives a game between two models.
///
/// All state transitions happen on the caller's task, either through the
/// intent methods or while awaiting [`Controller::next`]. Requests run in
/// the background and report back tagged with their [`Ticket`], so that
/// responses to superseded requests are recognized and dropped.
#[derive(Debug)]
pub struct Controller<S> {
    source: Arc<S>,
    timing: Timing,
    pace: Pace,
    session: Session,
    tickets: u64,
    request: Option<Request>,
    notice: Option<Notice>,
    advance_at: Option<Instant>,
    flush_at: Option<Instant>,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
}

impl<S> Drop for Controller<S> {
    fn drop(&mut self) {
        if let Some(r) = &self.request {
            r.task.abort();
        }
    }
}

impl<S: MoveSource + 'static> Controller<S> {
    /// Constructs a [`Controller`] with a fresh [`Session`].
    pub fn new(source: S, timing: Timing, pace: Pace) -> Self {
        let (tx, rx) = unbounded_channel();

        Controller {
            source: Arc::new(source),
            timing,
            pace,
            session: Session::default(),
            tickets: 0,
            request: None,
            notice: None,
            advance_at: None,
            flush_at: None,
            tx,
            rx,
        }
    }

    /// The current state of the game.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The warning about an invalid move, while it hasn't expired.
    pub fn notice(&self) -> Option<&InvalidMove> {
        self.notice.as_ref().map(|n| &n.warning)
    }

    pub fn pace(&self) -> Pace {
        self.pace
    }

    /// Switches between automatic and manual pacing.
    pub fn set_pace(&mut self, pace: Pace) {
        self.pace = pace;
        self.rearm();
    }

    fn is_underway(&self) -> bool {
        matches!(
            self.session.status(),
            Status::InProgress | Status::Paused | Status::AwaitingDrawResponse
        )
    }

    /// Assigns a model to a side ahead of the next game.
    pub fn assign(&mut self, c: Color, model: impl Into<String>) -> Result<(), ControlError> {
        let model = model.into();

        if self.is_underway() {
            Err(ControlError::GameInProgress)
        } else if model.trim().is_empty() {
            Err(ControlError::MissingModel(c))
        } else {
            self.session.assign(c, model);
            Ok(())
        }
    }

    /// Assigns two distinct models drawn at random from the [roster](crate::roster).
    pub fn pick_random_models<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), ControlError> {
        if self.is_underway() {
            return Err(ControlError::GameInProgress);
        }

        let (white, black) = roster::pairing(rng);
        self.session.assign(Color::White, white.into());
        self.session.assign(Color::Black, black.into());
        Ok(())
    }

    /// Starts a new game from the initial position, abandoning any game underway.
    #[instrument(level = "debug", skip(self, white, black), err)]
    pub fn start_game(
        &mut self,
        white: impl Into<String>,
        black: impl Into<String>,
    ) -> Result<(), ControlError> {
        let (white, black) = (white.into(), black.into());

        if white.trim().is_empty() {
            return Err(ControlError::MissingModel(Color::White));
        } else if black.trim().is_empty() {
            return Err(ControlError::MissingModel(Color::Black));
        }

        self.cancel();
        self.notice = None;
        self.session.assign(Color::White, white);
        self.session.assign(Color::Black, black);
        self.session.start();
        self.rearm();

        info!(
            white = self.session.model(Color::White),
            black = self.session.model(Color::Black),
            "game started"
        );

        Ok(())
    }

    /// Asks the model whose turn it is for its next action.
    ///
    /// While a draw offer is pending, the opponent of the side that offered
    /// it is asked whether it accepts instead.
    pub fn advance_turn(&mut self) -> Result<Update, ControlError> {
        match self.session.status() {
            Status::InProgress | Status::AwaitingDrawResponse => {}
            Status::Finished(_) => return Err(ControlError::GameOver),
            Status::NotStarted | Status::Paused => return Err(ControlError::NotInProgress),
        }

        if self.request.is_some() {
            return Err(ControlError::Busy);
        }

        let (color, kind) = match self.session.pending_draw_offer() {
            Some(offerer) => (!offerer, RequestKind::DrawResponse),
            None => (self.session.turn(), RequestKind::Move),
        };

        let model = self
            .session
            .model(color)
            .ok_or(ControlError::MissingModel(color))?
            .to_string();

        Ok(self.issue(kind, color, model))
    }

    /// Pauses a game in progress or resumes a paused one.
    ///
    /// A request already in flight is not cancelled and its result still applies.
    pub fn pause_toggle(&mut self) -> Result<Status, ControlError> {
        match self.session.status() {
            Status::InProgress => self.session.pause(),
            Status::Paused => self.session.resume(),
            Status::Finished(_) => return Err(ControlError::GameOver),
            Status::NotStarted | Status::AwaitingDrawResponse => {
                return Err(ControlError::NotInProgress)
            }
        }

        self.rearm();
        Ok(self.session.status())
    }

    /// Abandons the game, keeping the assigned models.
    #[instrument(level = "debug", skip(self))]
    pub fn reset_game(&mut self) {
        self.cancel();
        self.notice = None;
        self.session.reset();
        self.rearm();
    }

    /// Waits for the next observable change.
    ///
    /// This is where responses are applied and timers fire, so it must be
    /// polled for the game to make progress. It is cancellation safe.
    pub async fn next(&mut self) -> Update {
        loop {
            let now = Instant::now();
            let clearing = self.notice.as_ref().map(|n| n.expires);
            let (flushing, advancing) = (self.flush_at, self.advance_at);

            let wake = tokio::select! {
                biased;
                Some(msg) = self.rx.recv() => Wake::Message(msg),
                _ = sleep_until(clearing.unwrap_or(now)), if clearing.is_some() => Wake::Clear,
                _ = sleep_until(flushing.unwrap_or(now)), if flushing.is_some() => Wake::Flush,
                _ = sleep_until(advancing.unwrap_or(now)), if advancing.is_some() => Wake::Advance,
            };

            let update = match wake {
                Wake::Message(msg) => self.receive(msg),
                Wake::Clear => self.clear_notice(),
                Wake::Flush => self.flush(),
                Wake::Advance => {
                    self.advance_at = None;
                    match self.advance_turn() {
                        Ok(update) => Some(update),
                        Err(e) => {
                            debug!("skipping scheduled turn: {}", e);
                            None
                        }
                    }
                }
            };

            if let Some(update) = update {
                return update;
            }
        }
    }

    /// Schedules the next turn if the game is waiting on nobody.
    fn rearm(&mut self) {
        self.advance_at = match self.pace {
            Pace::Auto if self.request.is_none() && self.session.is_playing() => {
                Some(Instant::now() + self.timing.advance)
            }
            _ => None,
        };
    }

    fn cancel(&mut self) {
        if let Some(r) = self.request.take() {
            debug!(ticket = %r.ticket, "cancelling request");
            r.task.abort();
        }

        self.flush_at = None;
        self.session.end_request();
    }

    #[instrument(level = "debug", skip(self))]
    fn issue(&mut self, kind: RequestKind, color: Color, model: String) -> Update {
        self.cancel();
        self.advance_at = None;

        self.tickets += 1;
        let ticket = Ticket(self.tickets);

        let body = MoveRequest {
            model: model.clone(),
            game_state: self.session.position().to_string(),
            move_history: self.session.history().to_vec(),
        };

        self.session.begin_request(ticket);

        let tx = self.tx.clone();
        let task = match kind {
            RequestKind::Move => {
                self.flush_at = Some(Instant::now() + self.timing.flush);
                tokio::spawn(relay(ticket, self.source.stream_move(body), tx))
            }

            RequestKind::DrawResponse => {
                let source = self.source.clone();
                tokio::spawn(async move {
                    let reply = source.draw_response(body).await;
                    tx.send(Message::Responded(ticket, reply)).ok();
                })
            }
        };

        info!(%ticket, "requesting {} from {}", kind, model);

        self.request = Some(Request {
            ticket,
            kind,
            color,
            model: model.clone(),
            started: Instant::now(),
            live: String::new(),
            task,
        });

        Update::Requested { color, model, kind }
    }

    fn current(&mut self, ticket: Ticket) -> Option<&mut Request> {
        self.request.as_mut().filter(|r| r.ticket == ticket)
    }

    fn receive(&mut self, msg: Message) -> Option<Update> {
        match msg {
            Message::Thought(ticket, text) => {
                self.current(ticket)?.live.push_str(&text);
                None
            }

            Message::ThoughtEnd(ticket) => {
                self.current(ticket)?;
                self.flush()
            }

            Message::Moved(ticket, result) => {
                let request = self.settle(ticket)?;
                let update = self.apply_move(&request, result);
                self.rearm();
                Some(update)
            }

            Message::Responded(ticket, result) => {
                let request = self.settle(ticket)?;
                let update = self.apply_draw_response(&request, result);
                self.rearm();
                Some(update)
            }
        }
    }

    /// Copies the streamed reasoning into the session and schedules the next copy.
    fn flush(&mut self) -> Option<Update> {
        self.flush_at = None;

        let request = self.request.as_ref()?;
        self.flush_at = Some(Instant::now() + self.timing.flush);

        if request.live == self.session.thinking() {
            None
        } else {
            self.session.show_thinking(&request.live);
            Some(Update::Reasoning)
        }
    }

    fn clear_notice(&mut self) -> Option<Update> {
        match &self.notice {
            Some(n) if n.expires <= Instant::now() => {
                self.notice = None;
                Some(Update::Cleared)
            }
            _ => None,
        }
    }

    /// Retires the request a response belongs to, unless the response is stale.
    fn settle(&mut self, ticket: Ticket) -> Option<Request> {
        if self.current(ticket).is_none() {
            debug!(%ticket, "discarding stale response");
            return None;
        }

        let request = self.request.take()?;
        self.flush_at = None;
        self.session.end_request();

        if self.session.is_finished() {
            debug!(%ticket, kind = %request.kind, "discarding response to a finished game");
            return None;
        }

        self.session.show_thinking(&request.live);
        Some(request)
    }

    fn fail(&mut self, request: &Request, e: SourceError) -> Update {
        warn!(ticket = %request.ticket, kind = %request.kind, model = %request.model, "{}", e);
        self.session.clear_thinking();

        Update::Failed {
            color: request.color,
            reason: e.to_string(),
        }
    }

    #[instrument(level = "debug", skip(self, request, result),
        fields(ticket = %request.ticket, color = %request.color, model = %request.model))]
    fn apply_move(
        &mut self,
        request: &Request,
        result: Result<ResultPayload, SourceError>,
    ) -> Update {
        let elapsed = request.started.elapsed();
        let color = request.color;

        let (reply, tokens) = match result {
            Err(e) => return self.fail(request, e),
            Ok(payload) => match payload.reply() {
                None => return self.fail(request, SourceError::EmptyReply),
                Some(reply) => (reply, payload.thinking_tokens.unwrap_or(0)),
            },
        };

        match reply {
            Reply::Resign => {
                self.session.record_resignation(color, tokens, elapsed);
                info!("the {} player resigned", color);
                Update::Finished(Termination::Resignation(color))
            }

            Reply::DrawOffer => {
                self.session.record_draw_offer(color, tokens, elapsed);
                info!("the {} player offered a draw", color);
                Update::DrawOffered(color)
            }

            Reply::Move(raw) => {
                let replayed = Board::replay(self.session.history()).and_then(|mut board| {
                    let played = board.play(&raw)?;
                    Ok((played, board))
                });

                match replayed {
                    Err(e) => {
                        warn!("{}", e);

                        let warning = InvalidMove {
                            model: request.model.clone(),
                            color,
                            raw,
                        };

                        self.notice = Some(Notice {
                            warning: warning.clone(),
                            expires: Instant::now() + self.timing.notice,
                        });

                        Update::Rejected(warning)
                    }

                    Ok((played, board)) => {
                        info!(san = %played.san, tokens, ?elapsed, "move applied");
                        self.session.record_move(played.clone(), &board, tokens, elapsed);

                        match self.session.termination() {
                            Some(t) => Update::Finished(t),
                            None => Update::Moved(played),
                        }
                    }
                }
            }
        }
    }

    #[instrument(level = "debug", skip(self, request, result),
        fields(ticket = %request.ticket, color = %request.color, model = %request.model))]
    fn apply_draw_response(
        &mut self,
        request: &Request,
        result: Result<DrawReply, SourceError>,
    ) -> Update {
        let elapsed = request.started.elapsed();

        match result {
            Err(e) => self.fail(request, e),
            Ok(reply) => {
                let accepted = reply.accepts();
                let tokens = reply.thinking_tokens.unwrap_or(0);
                self.session.record_draw_response(accepted, tokens, elapsed);

                if accepted {
                    info!("the {} player accepted the draw", request.color);
                    Update::Finished(Termination::DrawAgreement)
                } else {
                    info!("the {} player declined the draw", request.color);
                    Update::DrawDeclined(request.color)
                }
            }
        }
    }
}

/// Forwards the events of a move stream until its result arrives.
async fn relay(
    ticket: Ticket,
    mut events: BoxStream<'static, Result<StreamEvent, SourceError>>,
    tx: UnboundedSender<Message>,
) {
    let result = loop {
        match events.next().await {
            None => break Err(SourceError::NoResult),
            Some(Err(e)) => break Err(e),
            Some(Ok(StreamEvent::Result { data })) => break Ok(data),
            Some(Ok(StreamEvent::Error { message })) => break Err(SourceError::Remote(message)),

            Some(Ok(StreamEvent::ThinkingDelta { content })) => {
                tx.send(Message::Thought(ticket, content)).ok();
            }

            Some(Ok(StreamEvent::ThinkingEnd)) => {
                tx.send(Message::ThoughtEnd(ticket)).ok();
            }

            Some(Ok(e)) => trace!(?e, "ignoring event"),
        }
    };

    drop(events);
    tx.send(Message::Moved(ticket, result)).ok();
}
