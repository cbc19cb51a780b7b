use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::config::{BatchConfig, Config, SelectionPolicy};
use crate::error::{ProcessingError, Result, TrackstripError};
use crate::media::{Remuxer, RemuxerFactory};
use crate::probe::{Prober, ProberFactory};
use crate::processor::FileProcessor;

/// Counts reported at the end of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// What happened to one input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Completed,
    Skipped,
}

pub struct Workflow {
    batch: BatchConfig,
    policy: SelectionPolicy,
    prober: Box<dyn Prober>,
    remuxer: Box<dyn Remuxer>,
}

impl Workflow {
    /// Build a workflow backed by the configured ffprobe/ffmpeg binaries
    pub fn new(config: &Config, policy: SelectionPolicy) -> Self {
        Self::with_backends(
            config.batch.clone(),
            policy,
            ProberFactory::create_prober(&config.tools),
            RemuxerFactory::create_remuxer(&config.tools),
        )
    }

    pub fn with_backends(
        batch: BatchConfig,
        policy: SelectionPolicy,
        prober: Box<dyn Prober>,
        remuxer: Box<dyn Remuxer>,
    ) -> Self {
        Self {
            batch,
            policy,
            prober,
            remuxer,
        }
    }

    /// Output directory for an input: `<dir>/processed` for a directory,
    /// `<parent>/processed` for a single file
    pub fn output_dir_for(&self, input_path: &Path) -> PathBuf {
        let base = if input_path.is_dir() {
            input_path
        } else {
            input_path.parent().unwrap_or_else(|| Path::new(""))
        };
        base.join(&self.batch.output_dir_name)
    }

    /// Files to process: the input itself, or every matching file below it
    /// outside of output directories, sorted by path
    pub fn discover_inputs(&self, input_path: &Path) -> Vec<PathBuf> {
        if !input_path.is_dir() {
            return vec![input_path.to_path_buf()];
        }

        let output_dir_name = self.batch.output_dir_name.as_str();
        let mut files = Vec::new();

        let walker = WalkDir::new(input_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !(e.depth() > 0 && e.file_type().is_dir() && e.file_name() == output_dir_name)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() && self.has_video_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files
    }

    fn has_video_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.batch.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Process a file or directory, one file at a time.
    ///
    /// Per-file failures are logged and counted; only a missing input or an
    /// output directory that cannot be created stops the batch.
    pub async fn run(&self, input_path: &Path) -> Result<BatchSummary> {
        if !input_path.exists() {
            return Err(TrackstripError::InputNotFound(input_path.to_path_buf()));
        }

        let output_dir = self.output_dir_for(input_path);
        fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| TrackstripError::OutputDirectory {
                path: output_dir.clone(),
                source: e,
            })?;

        let files = self.discover_inputs(input_path);
        info!("Found {} video files to process", files.len());

        let mut summary = BatchSummary {
            total: files.len(),
            ..BatchSummary::default()
        };

        for (position, video_path) in files.iter().enumerate() {
            let label = display_name(input_path, video_path);
            info!("Processing [{}/{}]: {}", position + 1, summary.total, label);

            match self.process_file(video_path, &output_dir).await {
                Ok(FileOutcome::Completed) => {
                    summary.succeeded += 1;
                    info!("Successfully processed: {}", label);
                }
                Ok(FileOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!("Failed to process {}: {}", label, e);
                }
            }
        }

        info!(
            "Processing complete: succeeded {} / {} ({} skipped, {} failed)",
            summary.succeeded, summary.total, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Run the processor for one file unless its output already exists
    pub async fn process_file(
        &self,
        video_path: &Path,
        output_dir: &Path,
    ) -> std::result::Result<FileOutcome, ProcessingError> {
        let file_name = video_path
            .file_name()
            .ok_or_else(|| ProcessingError::output(video_path, "Input has no file name"))?;
        let output_path = output_dir.join(file_name);

        let exists = fs::try_exists(&output_path)
            .await
            .map_err(|e| ProcessingError::output(&output_path, e.to_string()))?;
        if exists {
            warn!("Output file already exists, skipping: {}", output_path.display());
            return Ok(FileOutcome::Skipped);
        }

        let mut processor = FileProcessor::new(
            video_path,
            &self.policy,
            self.prober.as_ref(),
            self.remuxer.as_ref(),
        );
        processor.process(&output_path).await?;

        Ok(FileOutcome::Completed)
    }
}

/// Path relative to the batch root for logs, or the file name for single files
fn display_name(root: &Path, file: &Path) -> String {
    if root.is_dir() {
        if let Some(relative) = pathdiff::diff_paths(file, root) {
            return relative.display().to_string();
        }
    }
    file.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string())
}
