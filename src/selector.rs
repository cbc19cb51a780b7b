//! Stream selection: which probed streams survive the remux.

use tracing::debug;

use crate::config::SelectionPolicy;
use crate::error::SelectionError;
use crate::probe::{ProbeResult, StreamKind};

/// Ordered list of kept stream indices, as passed to `-map`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMapping {
    indices: Vec<u32>,
}

impl StreamMapping {
    pub fn from_indices(indices: Vec<u32>) -> Self {
        Self { indices }
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Pick the streams to keep.
///
/// Streams are walked in ascending index order. The first video stream is
/// always kept and any later video stream dropped; audio and subtitle streams
/// are kept when their language tag is in the matching policy set; anything
/// else is dropped. A mapping holding only the video stream is valid.
pub fn select(probe: &ProbeResult, policy: &SelectionPolicy) -> Result<StreamMapping, SelectionError> {
    let mut streams: Vec<_> = probe.streams.iter().collect();
    streams.sort_by_key(|s| s.index);

    let mut indices = Vec::new();
    let mut video_mapped = false;

    for stream in streams {
        let keep = match stream.kind {
            StreamKind::Video if !video_mapped => {
                video_mapped = true;
                true
            }
            StreamKind::Audio => policy.keeps_audio(&stream.language),
            StreamKind::Subtitle => policy.keeps_subtitle(&stream.language),
            StreamKind::Video | StreamKind::Other => false,
        };

        if keep {
            debug!("Mapped {} stream: {} ({})", stream.kind, stream.index, stream.language);
            indices.push(stream.index);
        }
    }

    if !video_mapped {
        return Err(SelectionError::NoVideoStream);
    }
    if indices.is_empty() {
        return Err(SelectionError::NoMatchingStreams);
    }

    Ok(StreamMapping::from_indices(indices))
}
