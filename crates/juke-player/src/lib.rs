//! Local playback: queue model, fade scheduler, the `AudioSink` contract
//! with its mpv adapter, and the transport state machine tying them
//! together.

pub mod error;
pub mod fade;
pub mod player;
pub mod queue;
pub mod sink;

pub use error::PlayerError;
pub use player::{Outcome, PlaybackState, Player, PlayerSettings, PlayerSnapshot};
pub use queue::Queue;
pub use sink::AudioSink;
