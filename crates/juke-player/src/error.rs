use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    /// No tracks to act on. Non-fatal; the caller decides how to surface it.
    #[error("queue is empty")]
    EmptyQueue,

    /// A command parameter that cannot be clamped into range (NaN, ±inf).
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The audio sink rejected or could not receive a command.
    #[error("audio sink: {0}")]
    Sink(#[source] anyhow::Error),
}
