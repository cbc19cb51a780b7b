//! Trackstrip - Language Track Filter
//!
//! Removes unwanted audio and subtitle language tracks from video files by
//! probing them with ffprobe and remuxing the kept streams with ffmpeg.

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod probe;
pub mod processor;
pub mod selector;
pub mod setup;
pub mod verify;
pub mod workflow;
