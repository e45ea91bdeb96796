use derive_more::{Display, Error};
use std::{fmt::Display as Print, io, str::FromStr};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tracing::{instrument, warn};

/// What the operator may ask for while a game is underway.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Command {
    #[display(fmt = "advance")]
    Advance,
    #[display(fmt = "pause")]
    Pause,
    #[display(fmt = "reset")]
    Reset,
    #[display(fmt = "quit")]
    Quit,
}

/// The reason why parsing [`Command`] failed.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error)]
#[display(fmt = "unknown command `{}`, expected one of <enter>, p, r or q", _0)]
pub struct ParseCommandError(#[error(not(source))] String);

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(Command::Advance),
            "p" => Ok(Command::Pause),
            "r" => Ok(Command::Reset),
            "q" => Ok(Command::Quit),
            s => Err(ParseCommandError(s.into())),
        }
    }
}

/// The operator's terminal.
#[derive(Debug)]
pub struct Console<W: AsyncWrite, R: AsyncRead> {
    writer: W,
    reader: Lines<BufReader<R>>,
}

impl<W: AsyncWrite + Unpin, R: AsyncRead + Unpin> Console<W, R> {
    pub fn new(writer: W, reader: R) -> Self {
        Console {
            writer,
            reader: BufReader::new(reader).lines(),
        }
    }

    /// Waits for the next valid command, or `None` once input is exhausted.
    ///
    /// This method is cancellation safe.
    #[instrument(level = "trace", skip(self), ret, err)]
    pub async fn recv(&mut self) -> io::Result<Option<Command>> {
        while let Some(line) = self.reader.next_line().await? {
            match line.parse() {
                Ok(cmd) => return Ok(Some(cmd)),
                Err(e) => warn!("{}", e),
            }
        }

        Ok(None)
    }

    /// Writes text as is.
    #[instrument(level = "trace", skip(self, msg), err)]
    pub async fn write(&mut self, msg: impl Print) -> io::Result<()> {
        self.writer.write_all(msg.to_string().as_bytes()).await?;
        self.writer.flush().await
    }

    /// Writes text followed by a line break.
    #[instrument(level = "trace", skip(self, msg), err)]
    pub async fn send(&mut self, msg: impl Print) -> io::Result<()> {
        self.write(format!("{msg}\n")).await
    }
}
