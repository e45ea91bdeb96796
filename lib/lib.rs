/// Chess domain types backed by the rules engine.
pub mod chess;
/// The turn controller driving a game between two models.
pub mod controller;
/// Wire types and the streaming event decoder.
pub mod protocol;
/// The known model identifiers.
pub mod roster;
/// The mutable state of a single game.
pub mod session;
/// Clients for the service that relays positions to the models.
pub mod source;
/// Pacing configuration.
pub mod timing;
