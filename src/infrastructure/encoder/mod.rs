//! Encoder infrastructure module
//!
//! Drives the external FFmpeg binary for capture and header repair.

mod ffmpeg;

pub use ffmpeg::{capture_backend, FfmpegCapture, FfmpegEncoder};
