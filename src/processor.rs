use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::SelectionPolicy;
use crate::error::ProcessingError;
use crate::media::Remuxer;
use crate::probe::{ProbeResult, Prober, StreamKind};
use crate::selector::{self, StreamMapping};
use crate::verify::verify_output;

/// Where a single file is in its processing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Initializing,
    Analyzing,
    Processing,
    Verifying,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }

    /// Forward-only transitions; `Failed` is reachable from any non-terminal state.
    pub fn can_transition_to(self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Initializing, Analyzing)
            | (Analyzing, Processing)
            | (Processing, Verifying)
            | (Processing, Completed)
            | (Verifying, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessingStatus::Initializing => "initializing",
            ProcessingStatus::Analyzing => "analyzing",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Verifying => "verifying",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Single-use processor for one input file.
///
/// Holds the probe of its own input once it has been taken; probes of other
/// paths (the output, during verification) never touch that cache.
pub struct FileProcessor<'a> {
    input_path: PathBuf,
    policy: &'a SelectionPolicy,
    prober: &'a dyn Prober,
    remuxer: &'a dyn Remuxer,
    status: ProcessingStatus,
    probe: Option<ProbeResult>,
}

impl<'a> FileProcessor<'a> {
    pub fn new<P: Into<PathBuf>>(
        input_path: P,
        policy: &'a SelectionPolicy,
        prober: &'a dyn Prober,
        remuxer: &'a dyn Remuxer,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            policy,
            prober,
            remuxer,
            status: ProcessingStatus::Initializing,
            probe: None,
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    /// Cached probe of the input, if one has succeeded
    pub fn probe_result(&self) -> Option<&ProbeResult> {
        self.probe.as_ref()
    }

    fn transition(&mut self, next: ProcessingStatus) -> Result<(), ProcessingError> {
        if !self.status.can_transition_to(next) {
            return Err(ProcessingError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        debug!("{}: {} -> {}", self.input_path.display(), self.status, next);
        self.status = next;
        Ok(())
    }

    fn fail(&mut self, error: ProcessingError) -> ProcessingError {
        if self.transition(ProcessingStatus::Failed).is_err() {
            debug!("{}: already {}, not marking failed", self.input_path.display(), self.status);
        }
        error
    }

    /// Probe the input file, reusing the first successful result
    pub async fn probe_input(&mut self) -> Result<&ProbeResult, ProcessingError> {
        if self.probe.is_none() {
            if self.status != ProcessingStatus::Analyzing {
                self.transition(ProcessingStatus::Analyzing)?;
            }
            let probed = self.prober.probe(&self.input_path).await;
            match probed {
                Ok(result) => self.probe = Some(result),
                Err(e) => return Err(self.fail(e)),
            }
        }

        self.probe.as_ref().ok_or_else(|| {
            ProcessingError::probe(&self.input_path, "probe result missing after probing")
        })
    }

    /// Derive the stream mapping from the (cached) input probe
    pub async fn stream_mapping(&mut self) -> Result<StreamMapping, ProcessingError> {
        let policy = self.policy;
        let probe = self.probe_input().await?;
        let selected = selector::select(probe, policy);
        let has_tracks = probe.count_of(StreamKind::Audio) + probe.count_of(StreamKind::Subtitle) > 0;

        match selected {
            Ok(mapping) => {
                if mapping.len() == 1 && has_tracks {
                    warn!(
                        "No audio or subtitle stream of {} matches the requested languages; keeping video only",
                        self.input_path.display()
                    );
                }
                Ok(mapping)
            }
            Err(source) => {
                let error = ProcessingError::Selection {
                    path: self.input_path.clone(),
                    source,
                };
                Err(self.fail(error))
            }
        }
    }

    /// Run the whole pipeline, writing the filtered copy to `output_path`
    pub async fn process(&mut self, output_path: &Path) -> Result<(), ProcessingError> {
        if self.status != ProcessingStatus::Initializing {
            return Err(ProcessingError::InvalidTransition {
                from: self.status,
                to: ProcessingStatus::Analyzing,
            });
        }

        let mapping = self.stream_mapping().await?;
        self.transition(ProcessingStatus::Processing)?;

        // Only outputs written by this run may be discarded on failure
        let existing = fs::try_exists(output_path).await;
        match existing {
            Ok(false) => {}
            Ok(true) => {
                return Err(self.fail(ProcessingError::output(output_path, "File already exists")));
            }
            Err(e) => return Err(self.fail(ProcessingError::output(output_path, e.to_string()))),
        }

        let remuxed = self
            .remuxer
            .remux(&self.input_path, &mapping, self.policy, output_path)
            .await;
        if let Err(e) = remuxed {
            discard_output(output_path).await;
            return Err(self.fail(e));
        }

        if self.policy.verify_output() {
            self.transition(ProcessingStatus::Verifying)?;
            let verified = verify_output(self.prober, output_path).await;
            if let Err(e) = verified {
                discard_output(output_path).await;
                return Err(self.fail(e));
            }
        }

        self.transition(ProcessingStatus::Completed)?;
        info!(
            "Kept {} of {} streams: {}",
            mapping.len(),
            self.probe.as_ref().map(|p| p.streams.len()).unwrap_or_default(),
            output_path.display()
        );
        Ok(())
    }
}

/// Remove a partial or unusable output so a later run does not skip the input
async fn discard_output(output_path: &Path) {
    match fs::remove_file(output_path).await {
        Ok(()) => debug!("Removed failed output: {}", output_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove failed output {}: {}", output_path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectionError;
    use crate::media::MockRemuxer;
    use crate::probe::{MediaStream, MockProber};
    use assert_fs::prelude::*;

    fn sample_probe() -> ProbeResult {
        ProbeResult::new(vec![
            MediaStream::new(0, StreamKind::Video, None).with_codec("h264"),
            MediaStream::new(1, StreamKind::Audio, Some("eng")).with_codec("aac"),
            MediaStream::new(2, StreamKind::Audio, Some("jpn")).with_codec("aac"),
            MediaStream::new(3, StreamKind::Subtitle, Some("eng")).with_codec("subrip"),
        ])
    }

    fn policy(verify: bool) -> SelectionPolicy {
        SelectionPolicy::new(&["eng"], &["eng"], true, verify).unwrap()
    }

    /// Prober answering the input with `sample_probe` and anything else with a video-only probe
    fn prober_for(input: PathBuf, input_calls: usize, other_calls: usize) -> MockProber {
        let mut prober = MockProber::new();
        let input_match = input.clone();
        prober
            .expect_probe()
            .withf(move |path| path.to_path_buf() == input_match)
            .times(input_calls)
            .returning(|_| Ok(sample_probe()));
        prober
            .expect_probe()
            .withf(move |path| path.to_path_buf() != input)
            .times(other_calls)
            .returning(|_| Ok(ProbeResult::new(vec![MediaStream::new(0, StreamKind::Video, None)])));
        prober
    }

    /// Remuxer that writes `contents` to the output and records the mapping
    fn writing_remuxer(contents: &'static [u8]) -> MockRemuxer {
        let mut remuxer = MockRemuxer::new();
        remuxer
            .expect_remux()
            .withf(|_, mapping, policy, _| mapping.indices() == [0, 1, 3] && policy.copy_streams())
            .times(1)
            .returning(move |_, _, _, output| {
                std::fs::write(output, contents).unwrap();
                Ok(())
            });
        remuxer
    }

    #[test]
    fn test_status_transitions() {
        use ProcessingStatus::*;
        assert!(Initializing.can_transition_to(Analyzing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Verifying.can_transition_to(Failed));
        assert!(Initializing.can_transition_to(Failed));
        assert!(!Analyzing.can_transition_to(Initializing));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Analyzing));
        assert!(!Analyzing.can_transition_to(Verifying));
    }

    #[tokio::test]
    async fn test_process_with_verification_completes() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("movie.mkv");
        input.write_binary(b"input").unwrap();
        let output = temp.child("processed/movie.mkv");
        std::fs::create_dir_all(temp.child("processed").path()).unwrap();

        let prober = prober_for(input.path().to_path_buf(), 1, 1);
        let remuxer = writing_remuxer(b"remuxed");
        let policy = policy(true);

        let mut processor = FileProcessor::new(input.path(), &policy, &prober, &remuxer);
        processor.process(output.path()).await.unwrap();

        assert_eq!(processor.status(), ProcessingStatus::Completed);
        output.assert("remuxed");
        assert_eq!(processor.probe_result(), Some(&sample_probe()));
    }

    #[tokio::test]
    async fn test_process_without_verification_skips_output_probe() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("movie.mkv");
        let output = temp.child("out.mkv");

        let prober = prober_for(input.path().to_path_buf(), 1, 0);
        let remuxer = writing_remuxer(b"");
        let policy = policy(false);

        let mut processor = FileProcessor::new(input.path(), &policy, &prober, &remuxer);
        processor.process(output.path()).await.unwrap();
        assert_eq!(processor.status(), ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn test_empty_output_after_successful_remux_fails_verification() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("movie.mkv");
        let output = temp.child("out.mkv");

        let prober = prober_for(input.path().to_path_buf(), 1, 0);
        let remuxer = writing_remuxer(b"");
        let policy = policy(true);

        let mut processor = FileProcessor::new(input.path(), &policy, &prober, &remuxer);
        let err = processor.process(output.path()).await.unwrap_err();

        assert!(matches!(err, ProcessingError::Verification { .. }));
        assert_eq!(processor.status(), ProcessingStatus::Failed);
        assert!(!output.path().exists());
    }

    #[tokio::test]
    async fn test_probe_input_is_cached() {
        let input = PathBuf::from("/media/movie.mkv");
        let prober = prober_for(input.clone(), 1, 0);
        let remuxer = MockRemuxer::new();
        let policy = policy(true);

        let mut processor = FileProcessor::new(&input, &policy, &prober, &remuxer);
        processor.probe_input().await.unwrap();
        assert_eq!(processor.status(), ProcessingStatus::Analyzing);
        processor.probe_input().await.unwrap();
        let mapping = processor.stream_mapping().await.unwrap();
        assert_eq!(mapping.indices(), &[0, 1, 3]);
    }

    #[tokio::test]
    async fn test_probe_failure_marks_failed() {
        let mut prober = MockProber::new();
        prober
            .expect_probe()
            .times(1)
            .returning(|path| Err(ProcessingError::probe(path, "ffprobe exited with return code 1")));
        let mut remuxer = MockRemuxer::new();
        remuxer.expect_remux().never();
        let policy = policy(true);

        let mut processor = FileProcessor::new("/media/broken.mkv", &policy, &prober, &remuxer);
        let err = processor.process(Path::new("/media/processed/broken.mkv")).await.unwrap_err();

        assert!(matches!(err, ProcessingError::Probe { .. }));
        assert_eq!(processor.status(), ProcessingStatus::Failed);
        assert!(processor.probe_result().is_none());
    }

    #[tokio::test]
    async fn test_missing_video_fails_before_remux() {
        let mut prober = MockProber::new();
        prober.expect_probe().times(1).returning(|_| {
            Ok(ProbeResult::new(vec![MediaStream::new(0, StreamKind::Audio, Some("eng"))]))
        });
        let mut remuxer = MockRemuxer::new();
        remuxer.expect_remux().never();
        let policy = policy(true);

        let mut processor = FileProcessor::new("/media/audio.mka", &policy, &prober, &remuxer);
        let err = processor.process(Path::new("/tmp/out.mka")).await.unwrap_err();

        assert!(matches!(
            err,
            ProcessingError::Selection { source: SelectionError::NoVideoStream, .. }
        ));
        assert_eq!(processor.status(), ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn test_remux_failure_marks_failed_and_removes_partial_output() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("movie.mkv");
        let output = temp.child("out.mkv");

        let prober = prober_for(input.path().to_path_buf(), 1, 0);
        let mut remuxer = MockRemuxer::new();
        remuxer
            .expect_remux()
            .times(1)
            .returning(|input, _, _, output| {
                std::fs::write(output, b"half a header").unwrap();
                Err(ProcessingError::remux(input, "Invalid data found"))
            });
        let policy = policy(true);

        let mut processor = FileProcessor::new(input.path(), &policy, &prober, &remuxer);
        let err = processor.process(output.path()).await.unwrap_err();

        assert!(err.to_string().contains("Invalid data found"));
        assert_eq!(processor.status(), ProcessingStatus::Failed);
        assert!(!output.path().exists());
    }

    #[tokio::test]
    async fn test_existing_output_is_left_alone() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("movie.mkv");
        let output = temp.child("out.mkv");
        output.write_binary(b"someone else's file").unwrap();

        let prober = prober_for(input.path().to_path_buf(), 1, 0);
        let mut remuxer = MockRemuxer::new();
        remuxer.expect_remux().never();
        let policy = policy(true);

        let mut processor = FileProcessor::new(input.path(), &policy, &prober, &remuxer);
        let err = processor.process(output.path()).await.unwrap_err();

        assert!(matches!(err, ProcessingError::Output { .. }));
        assert_eq!(processor.status(), ProcessingStatus::Failed);
        output.assert("someone else's file");
    }

    #[tokio::test]
    async fn test_processor_is_single_use() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("movie.mkv");
        let output = temp.child("out.mkv");

        let prober = prober_for(input.path().to_path_buf(), 1, 0);
        let remuxer = writing_remuxer(b"data");
        let policy = policy(false);

        let mut processor = FileProcessor::new(input.path(), &policy, &prober, &remuxer);
        processor.process(output.path()).await.unwrap();

        let err = processor.process(output.path()).await.unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::InvalidTransition { from: ProcessingStatus::Completed, .. }
        ));
        assert_eq!(processor.status(), ProcessingStatus::Completed);
    }
}
