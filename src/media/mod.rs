// Remux execution
//
// - Commands: ffmpeg/ffprobe command builders
// - Remuxer: capability trait plus the ffmpeg-backed implementation

pub mod commands;
pub mod remuxer;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use remuxer::*;

use crate::config::{SelectionPolicy, ToolsConfig};
use crate::error::ProcessingError;
use crate::selector::StreamMapping;

/// Writes a copy of `input_path` containing only the mapped streams
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Remuxer: Send + Sync {
    async fn remux(
        &self,
        input_path: &Path,
        mapping: &StreamMapping,
        policy: &SelectionPolicy,
        output_path: &Path,
    ) -> Result<(), ProcessingError>;
}

/// Factory for creating remuxer instances
pub struct RemuxerFactory;

impl RemuxerFactory {
    /// Create the default remuxer implementation (FFmpeg-based)
    pub fn create_remuxer(config: &ToolsConfig) -> Box<dyn Remuxer> {
        Box::new(FfmpegRemuxer::new(&config.ffmpeg))
    }
}
