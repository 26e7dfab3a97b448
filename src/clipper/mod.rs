//! Cut a long video into fixed-length vertical clips with burned-in,
//! color-cycling subtitles.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod schedule;
pub mod subtitles;
pub mod support;
pub mod transcribe;
pub mod transcript;

pub use cli::ClipperCommands;
pub use commands::handle_clipper_command;
