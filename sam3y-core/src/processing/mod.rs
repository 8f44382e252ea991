pub mod biquad;
pub mod chain;
pub mod compressor;
pub mod mixer;
pub mod ring_buffer;
pub mod separation;
