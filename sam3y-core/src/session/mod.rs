pub mod capture;
pub mod coordinator;
pub mod host;
pub mod launcher;
pub mod render;
