use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::ProcessingError;
use crate::media::MediaCommandBuilder;
use super::{MediaStream, ProbeResult, Prober, StreamKind};

/// ffprobe `-print_format json` document
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl From<FfprobeStream> for MediaStream {
    fn from(stream: FfprobeStream) -> Self {
        let mut media_stream = MediaStream::new(
            stream.index,
            StreamKind::from_codec_type(stream.codec_type.as_deref()),
            stream.tags.get("language").map(String::as_str),
        );
        media_stream.codec_name = stream.codec_name;
        media_stream
    }
}

/// Parse ffprobe JSON output into a [`ProbeResult`], streams sorted by index
pub fn parse_probe_output(json: &str) -> Result<ProbeResult, serde_json::Error> {
    let output: FfprobeOutput = serde_json::from_str(json)?;

    let mut streams: Vec<MediaStream> = output.streams.into_iter().map(MediaStream::from).collect();
    streams.sort_by_key(|s| s.index);

    Ok(ProbeResult {
        streams,
        format: output.format,
    })
}

/// ffprobe-backed prober
pub struct FfprobeProber {
    command_builder: MediaCommandBuilder,
}

impl FfprobeProber {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            command_builder: MediaCommandBuilder::new(binary_path),
        }
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<ProbeResult, ProcessingError> {
        debug!("Probing {}", path.display());

        let stdout = self
            .command_builder
            .probe_streams(path)
            .execute()
            .await
            .map_err(|e| ProcessingError::probe(path, e.to_string()))?;

        let result = parse_probe_output(&stdout).map_err(|e| {
            ProcessingError::probe(path, format!("Failed to parse ffprobe output: {}", e))
        })?;

        debug!("Found {} streams in {}", result.streams.len(), path.display());
        Ok(result)
    }
}
