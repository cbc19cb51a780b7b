// Stream probing
//
// - Types: the probed view of a file (streams with kind, codec, language)
// - FFprobe: ffprobe-backed prober and its JSON mapping

pub mod ffprobe;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

pub use ffprobe::*;

use crate::config::ToolsConfig;
use crate::error::ProcessingError;

/// Language tag used when a stream carries none
pub const UNDETERMINED_LANGUAGE: &str = "und";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Other,
}

impl StreamKind {
    /// Map an ffprobe `codec_type` value
    pub fn from_codec_type(codec_type: Option<&str>) -> Self {
        match codec_type {
            Some("video") => StreamKind::Video,
            Some("audio") => StreamKind::Audio,
            Some("subtitle") => StreamKind::Subtitle,
            _ => StreamKind::Other,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
            StreamKind::Subtitle => "subtitle",
            StreamKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// One elementary stream as reported by the prober
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub index: u32,
    pub kind: StreamKind,
    pub codec_name: Option<String>,
    pub language: String,
}

impl MediaStream {
    pub fn new(index: u32, kind: StreamKind, language: Option<&str>) -> Self {
        Self {
            index,
            kind,
            codec_name: None,
            language: language.unwrap_or(UNDETERMINED_LANGUAGE).to_string(),
        }
    }

    pub fn with_codec<S: Into<String>>(mut self, codec_name: S) -> Self {
        self.codec_name = Some(codec_name.into());
        self
    }
}

/// Streams of one file in probe order, plus the raw container metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeResult {
    pub streams: Vec<MediaStream>,
    pub format: Map<String, Value>,
}

impl ProbeResult {
    pub fn new(streams: Vec<MediaStream>) -> Self {
        Self {
            streams,
            format: Map::new(),
        }
    }

    pub fn count_of(&self, kind: StreamKind) -> usize {
        self.streams.iter().filter(|s| s.kind == kind).count()
    }
}

/// Enumerates the streams of a media file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<ProbeResult, ProcessingError>;
}

/// Factory for creating prober instances
pub struct ProberFactory;

impl ProberFactory {
    /// Create the default prober implementation (FFprobe-based)
    pub fn create_prober(config: &ToolsConfig) -> Box<dyn Prober> {
        Box::new(FfprobeProber::new(&config.ffprobe))
    }
}
