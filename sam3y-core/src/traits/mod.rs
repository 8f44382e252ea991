pub mod host_launcher;
pub mod media_stream;
pub mod separation;
pub mod state_store;
pub mod tab_platform;
