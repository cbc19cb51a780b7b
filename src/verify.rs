use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::error::ProcessingError;
use crate::probe::Prober;

/// Check that a remuxed file exists, is non-empty and can be probed again.
///
/// The output is always probed fresh; a successful exit code from the remux
/// tool alone is not trusted.
pub async fn verify_output(prober: &dyn Prober, output_path: &Path) -> Result<(), ProcessingError> {
    let file_name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| output_path.display().to_string());

    let metadata = match fs::metadata(output_path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProcessingError::verification(
                output_path,
                format!("Failed to create: {}", file_name),
            ));
        }
        Err(e) => {
            return Err(ProcessingError::verification(
                output_path,
                format!("Cannot read {}: {}", file_name, e),
            ));
        }
    };

    if metadata.len() == 0 {
        return Err(ProcessingError::verification(
            output_path,
            format!("Empty output file: {}", file_name),
        ));
    }

    let probe = prober.probe(output_path).await.map_err(|e| {
        ProcessingError::verification(output_path, format!("Output file cannot be probed: {}", e))
    })?;

    debug!("Verified output has {} streams", probe.streams.len());
    info!("Output verified: {} ({} bytes)", output_path.display(), metadata.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{MediaStream, MockProber, ProbeResult, StreamKind};
    use assert_fs::prelude::*;

    fn probe_ok() -> ProbeResult {
        ProbeResult::new(vec![MediaStream::new(0, StreamKind::Video, None)])
    }

    #[tokio::test]
    async fn test_missing_output_fails() {
        let temp = assert_fs::TempDir::new().unwrap();
        let mut prober = MockProber::new();
        prober.expect_probe().never();

        let err = verify_output(&prober, &temp.path().join("missing.mkv")).await.unwrap_err();
        assert!(matches!(err, ProcessingError::Verification { .. }));
        assert!(err.to_string().contains("Failed to create"));
    }

    #[tokio::test]
    async fn test_empty_output_fails_without_probing() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("empty.mkv");
        output.touch().unwrap();

        let mut prober = MockProber::new();
        prober.expect_probe().never();

        let err = verify_output(&prober, output.path()).await.unwrap_err();
        assert!(err.to_string().contains("Empty output file"));
    }

    #[tokio::test]
    async fn test_unprobeable_output_fails() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("broken.mkv");
        output.write_binary(b"garbage").unwrap();

        let mut prober = MockProber::new();
        prober
            .expect_probe()
            .times(1)
            .returning(|path| Err(ProcessingError::probe(path, "invalid data")));

        let err = verify_output(&prober, output.path()).await.unwrap_err();
        assert!(matches!(err, ProcessingError::Verification { .. }));
        assert!(err.to_string().contains("invalid data"));
    }

    #[tokio::test]
    async fn test_probed_output_passes() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("good.mkv");
        output.write_binary(b"not really matroska").unwrap();
        let expected = output.path().to_path_buf();

        let mut prober = MockProber::new();
        prober
            .expect_probe()
            .withf(move |path| path.to_path_buf() == expected)
            .times(1)
            .returning(|_| Ok(probe_ok()));

        verify_output(&prober, output.path()).await.unwrap();
    }
}
