use crate::console::{Command, Console};
use anyhow::{Context, Error as Anyhow};
use clap::Parser;
use lib::chess::{Color, Pgn, Termination};
use lib::controller::{Controller, Pace, Update};
use lib::source::{HttpSource, MoveSource, DEFAULT_URL};
use lib::{roster, timing::Timing};
use rand::thread_rng;
use std::num::NonZeroUsize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::io::{stdin, stdout};
use tracing::{debug, info, instrument, warn};

/// A match of chess between two models.
///
/// While a game is underway, type <enter> to advance the turn,
/// `p` to pause or resume, `r` to restart the game, and `q` to quit.
#[derive(Debug, Parser)]
#[clap(disable_help_flag = true, disable_version_flag = true)]
pub struct Play {
    /// The address of the service that relays requests to the models.
    #[clap(short, long, env = "LLM_CHESS_API_URL", default_value = DEFAULT_URL)]
    url: String,

    /// The model that starts with the white pieces.
    #[clap(short, long, required_unless_present = "random")]
    white: Option<String>,

    /// The model that starts with the black pieces.
    #[clap(short, long, required_unless_present = "random")]
    black: Option<String>,

    /// Pit two distinct models drawn at random from the roster.
    #[clap(short, long, conflicts_with_all = ["white", "black"])]
    random: bool,

    /// How many games to play, alternating colors.
    #[clap(short = 'n', long, default_value = "1")]
    games: NonZeroUsize,

    /// Only advance turns when asked to.
    #[clap(short, long)]
    manual: bool,

    /// Pacing of turns and reasoning updates.
    #[clap(short, long, default_value_t)]
    timing: Timing,
}

/// How a game came to a halt.
enum Halt {
    Finished(Termination),
    Quit,
}

impl Play {
    #[instrument(level = "trace", skip(self), err)]
    pub async fn execute(self) -> Result<(), Anyhow> {
        let pace = if self.manual { Pace::Manual } else { Pace::Auto };
        let source = HttpSource::new(self.url);
        let mut controller = Controller::new(source, self.timing, pace);

        if self.random {
            controller.pick_random_models(&mut thread_rng())?;
        }

        let white = self.white.as_deref().or(controller.session().model(Color::White));
        let black = self.black.as_deref().or(controller.session().model(Color::Black));

        let players = [
            white.map(String::from).context("no model assigned to white")?,
            black.map(String::from).context("no model assigned to black")?,
        ];

        for model in &players {
            if !roster::is_known(model) {
                warn!(%model, "the model is not in the roster");
            }
        }

        let mut console = Console::new(stdout(), stdin());
        let (mut wins, mut losses, mut draws) = (0, 0, 0);
        let mut pgns: Vec<Pgn> = Vec::with_capacity(self.games.get());

        for n in 0..self.games.get() {
            let (white, black) = (&players[n % 2], &players[(n + 1) % 2]);
            controller.start_game(white, black)?;

            let halt = play(&mut controller, &mut console).await?;
            pgns.push(controller.session().pgn());

            match halt {
                Halt::Quit => break,
                Halt::Finished(t) => {
                    let wl = [&mut wins, &mut losses];
                    match t.winner() {
                        Some(c) => *wl[(n + c as usize) % 2] += 1,
                        None => draws += 1,
                    }

                    info!(
                        games = wins + losses + draws,
                        challenger = %players[0],
                        wins,
                        losses,
                        draws,
                    );
                }
            }
        }

        for pgn in pgns {
            console.send(format!("{pgn}\n")).await?;
        }

        Ok(())
    }
}

/// Keeps track of how much of the reasoning of the current turn was printed.
#[derive(Debug, Default)]
struct Transcript {
    shown: usize,
    open: bool,
}

impl Transcript {
    /// Forgets the previous turn.
    fn restart(&mut self) {
        self.shown = 0;
    }

    /// The part of the reasoning that wasn't printed yet.
    fn unseen<'a>(&mut self, thinking: &'a str) -> &'a str {
        if thinking.len() < self.shown || !thinking.is_char_boundary(self.shown) {
            self.shown = 0;
        }

        let unseen = &thinking[self.shown..];
        self.shown = thinking.len();
        self.open |= !unseen.is_empty();
        unseen
    }

    /// Whether a line of reasoning is left unterminated.
    fn close(&mut self) -> bool {
        std::mem::take(&mut self.open)
    }
}

/// Plays a single game to the end, or until the operator quits.
async fn play<S, W, R>(
    controller: &mut Controller<S>,
    console: &mut Console<W, R>,
) -> Result<Halt, Anyhow>
where
    S: MoveSource + 'static,
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let mut transcript = Transcript::default();
    let mut listening = true;

    loop {
        tokio::select! {
            update = controller.next() => {
                if let Update::Requested { .. } = update {
                    transcript.restart();
                }

                let unseen = transcript.unseen(controller.session().thinking());
                if !unseen.is_empty() {
                    console.write(unseen).await?;
                }

                if !matches!(update, Update::Reasoning | Update::Cleared) && transcript.close() {
                    console.send("").await?;
                }

                match update {
                    Update::Requested { color, model, kind } => {
                        info!(%color, %model, "waiting on {}", kind);
                    }

                    Update::Moved(m) => {
                        info!(color = %m.color, san = %m.san, position = controller.session().position());
                    }

                    Update::Reasoning => {}
                    Update::DrawOffered(c) => info!("the {} player offers a draw", c),
                    Update::DrawDeclined(c) => info!("the {} player declines the draw", c),
                    Update::Rejected(warning) => warn!("{}", warning),
                    Update::Failed { color, reason } => warn!(%color, "{}", reason),
                    Update::Cleared => debug!("warning cleared"),

                    Update::Finished(t) => {
                        info!(result = t.score(), "{}", t);
                        return Ok(Halt::Finished(t));
                    }
                }
            },

            cmd = console.recv(), if listening => match cmd? {
                None => listening = false,
                Some(Command::Quit) => return Ok(Halt::Quit),

                Some(Command::Advance) => match controller.advance_turn() {
                    Ok(update) => {
                        transcript.restart();
                        debug!(?update);
                    }

                    Err(e) => warn!("{}", e),
                },

                Some(Command::Pause) => match controller.pause_toggle() {
                    Ok(status) => info!(%status),
                    Err(e) => warn!("{}", e),
                },

                Some(Command::Reset) => {
                    let session = controller.session();
                    let white = session.model(Color::White).map(String::from);
                    let black = session.model(Color::Black).map(String::from);

                    controller.reset_game();
                    controller.start_game(white.unwrap_or_default(), black.unwrap_or_default())?;
                    transcript.restart();
                    info!("game restarted");
                }
            },
        }
    }
}
