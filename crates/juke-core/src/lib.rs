//! Shared types and host plumbing for juke: config, platform discovery,
//! the `Track` type, playlist-folder enumeration, and playlist URL parsing.

pub mod config;
pub mod library;
pub mod platform;
pub mod track;
pub mod url;

pub use config::Config;
pub use track::Track;
