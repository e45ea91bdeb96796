use crate::protocol::{DrawReply, MoveRequest, StreamEvent};
use async_trait::async_trait;
use derive_more::{Display, Error, From};
use futures_util::stream::BoxStream;

mod http;

pub use http::*;

/// The reason why the move source failed to answer.
#[derive(Debug, Display, Error, From)]
pub enum SourceError {
    #[display(fmt = "failed to reach the move source")]
    Http(reqwest::Error),

    #[display(fmt = "the move source reported an error: {}", _0)]
    #[from(ignore)]
    Remote(#[error(not(source))] String),

    #[display(fmt = "the stream ended before a result was received")]
    #[from(ignore)]
    NoResult,

    #[display(fmt = "the result carried neither a move nor an action")]
    #[from(ignore)]
    EmptyReply,
}

/// Trait for services that know how to ask models for their next action.
///
/// Returned streams and futures own everything they need, dropping them
/// aborts the underlying request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MoveSource: Send + Sync {
    /// Asks a model for its move, streaming its reasoning as it goes.
    fn stream_move(&self, request: MoveRequest) -> BoxStream<'static, Result<StreamEvent, SourceError>>;

    /// Asks a model whether it accepts the draw offered by its opponent.
    async fn draw_response(&self, request: MoveRequest) -> Result<DrawReply, SourceError>;
}
