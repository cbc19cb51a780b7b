use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{BatchConfig, ToolsConfig};
use crate::error::{Result, TrackstripError};
use crate::media::MediaCommandBuilder;

/// An external tool resolved on `PATH`
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub path: PathBuf,
    pub version: Option<String>,
}

/// Resolve a tool by name or path, failing when it cannot be found
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| TrackstripError::ToolNotFound(name.to_string()))
}

/// Run the pre-flight checks that must pass before any file is touched.
///
/// Missing tools are fatal; low memory only warns.
pub async fn preflight(tools: &ToolsConfig, batch: &BatchConfig) -> Result<Vec<ToolInfo>> {
    let mut found = Vec::new();

    for name in [&tools.ffprobe, &tools.ffmpeg] {
        let path = require_tool(name)?;
        let version = tool_version(&path).await;
        info!(
            "{} is available: {} ({})",
            name,
            path.display(),
            version.as_deref().unwrap_or("unknown version")
        );
        found.push(ToolInfo {
            name: name.clone(),
            path,
            version,
        });
    }

    check_memory(batch.min_available_memory_mb);
    Ok(found)
}

/// First line of `<tool> -version`, if the tool answers
async fn tool_version(path: &Path) -> Option<String> {
    let builder = MediaCommandBuilder::new(path.to_string_lossy());
    match builder.version_check().execute().await {
        Ok(stdout) => stdout.lines().next().map(|line| line.trim().to_string()),
        Err(e) => {
            debug!("Version check failed for {}: {}", path.display(), e);
            None
        }
    }
}

/// Warn when available memory is at or below the recommended minimum
pub fn check_memory(min_available_mb: u64) {
    match available_memory_bytes() {
        Some(available) => {
            let available_mb = available / (1024 * 1024);
            if available_mb <= min_available_mb {
                warn!(
                    "Low memory available ({} MB). Recommended: {:.2} GB or more. Processing may be slow.",
                    available_mb,
                    min_available_mb as f64 / 1024.0
                );
            } else {
                debug!("Available memory: {} MB", available_mb);
            }
        }
        None => debug!("Available memory unknown, skipping memory check"),
    }
}

fn available_memory_bytes() -> Option<u64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_mem_available(&meminfo)
}

/// Extract `MemAvailable` (reported in kB) from `/proc/meminfo` contents
fn parse_mem_available(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemAvailable:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_tool_not_found() {
        let err = require_tool("trackstrip_nonexistent_tool_12345").unwrap_err();
        assert!(matches!(err, TrackstripError::ToolNotFound(name) if name == "trackstrip_nonexistent_tool_12345"));
    }

    #[tokio::test]
    async fn test_preflight_fails_on_missing_tool() {
        let tools = ToolsConfig {
            ffprobe: "trackstrip_missing_ffprobe".to_string(),
            ffmpeg: "trackstrip_missing_ffmpeg".to_string(),
        };
        let err = preflight(&tools, &BatchConfig::default()).await.unwrap_err();
        assert!(matches!(err, TrackstripError::ToolNotFound(name) if name == "trackstrip_missing_ffprobe"));
    }

    #[test]
    fn test_parse_mem_available() {
        let meminfo = "MemTotal:       16318480 kB\nMemFree:         1234567 kB\nMemAvailable:    8159240 kB\n";
        assert_eq!(parse_mem_available(meminfo), Some(8159240 * 1024));
        assert_eq!(parse_mem_available("MemTotal: 1 kB\n"), None);
    }
}
