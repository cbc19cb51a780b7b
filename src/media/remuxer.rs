use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use crate::config::SelectionPolicy;
use crate::error::ProcessingError;
use crate::selector::StreamMapping;
use super::{MediaCommandBuilder, Remuxer};

/// ffmpeg-backed remuxer
pub struct FfmpegRemuxer {
    command_builder: MediaCommandBuilder,
}

impl FfmpegRemuxer {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            command_builder: MediaCommandBuilder::new(binary_path),
        }
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn remux(
        &self,
        input_path: &Path,
        mapping: &StreamMapping,
        policy: &SelectionPolicy,
        output_path: &Path,
    ) -> Result<(), ProcessingError> {
        info!(
            "Remuxing {} -> {} ({} streams, {})",
            input_path.display(),
            output_path.display(),
            mapping.len(),
            if policy.copy_streams() { "stream copy" } else { "re-encode" }
        );

        let command = self.command_builder.remux(
            input_path,
            mapping,
            policy.copy_streams(),
            output_path,
        );

        command
            .execute()
            .await
            .map_err(|e| ProcessingError::remux(input_path, e.to_string()))?;

        debug!("Remux finished: {}", output_path.display());
        Ok(())
    }
}
