pub mod audio_block;
pub mod config;
pub mod error;
pub mod messages;
pub mod persisted;
pub mod profile;
pub mod state;
pub mod tab;
