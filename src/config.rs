use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use crate::error::{Result, TrackstripError};

/// File name looked up in the current directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "trackstrip.toml";

fn default_audio_languages() -> Vec<String> {
    ["eng", "en", "kor", "jpn", "chi", "zho", "cmn"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_subtitle_languages() -> Vec<String> {
    vec!["eng".to_string(), "en".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    ["mkv", "mp4", "avi", "mov"].iter().map(|s| s.to_string()).collect()
}

fn default_output_dir_name() -> String {
    "processed".to_string()
}

fn default_min_available_memory_mb() -> u64 {
    4096
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Raw, unvalidated language policy as written in the config file.
/// Turned into a [`SelectionPolicy`] once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Audio language tags to keep (e.g. "eng", "jpn")
    #[serde(default = "default_audio_languages")]
    pub audio_languages: Vec<String>,
    /// Subtitle language tags to keep
    #[serde(default = "default_subtitle_languages")]
    pub subtitle_languages: Vec<String>,
    /// Stream copy (true) or re-encode (false)
    #[serde(default = "default_true")]
    pub copy_streams: bool,
    /// Re-probe the output after remuxing
    #[serde(default = "default_true")]
    pub verify_output: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path or name of the ffprobe binary
    pub ffprobe: String,
    /// Path or name of the ffmpeg binary
    pub ffmpeg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Extensions (without dot, case-insensitive) picked up when walking a directory
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Name of the output directory created next to the inputs
    #[serde(default = "default_output_dir_name")]
    pub output_dir_name: String,
    /// Warn when less memory than this is available
    #[serde(default = "default_min_available_memory_mb")]
    pub min_available_memory_mb: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily-rotated log files; console only when unset
    pub directory: Option<PathBuf>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            audio_languages: default_audio_languages(),
            subtitle_languages: default_subtitle_languages(),
            copy_streams: true,
            verify_output: true,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffprobe: "ffprobe".to_string(),
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            output_dir_name: default_output_dir_name(),
            min_available_memory_mb: default_min_available_memory_mb(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TrackstripError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TrackstripError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the batch section; the policy is validated by [`PolicyConfig::to_policy`].
    pub fn validate(&self) -> Result<()> {
        if self.batch.output_dir_name.trim().is_empty()
            || self.batch.output_dir_name.contains(['/', '\\'])
        {
            return Err(TrackstripError::Config(format!(
                "Invalid output directory name '{}'",
                self.batch.output_dir_name
            )));
        }
        if self.batch.extensions.is_empty() {
            return Err(TrackstripError::Config(
                "At least one input extension is required".to_string(),
            ));
        }
        Ok(())
    }
}

impl PolicyConfig {
    pub fn to_policy(&self) -> Result<SelectionPolicy> {
        SelectionPolicy::new(
            self.audio_languages.as_slice(),
            self.subtitle_languages.as_slice(),
            self.copy_streams,
            self.verify_output,
        )
    }
}

/// Validated language policy for a run. Tags are trimmed and deduplicated;
/// matching against probed tags is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPolicy {
    audio_languages: BTreeSet<String>,
    subtitle_languages: BTreeSet<String>,
    copy_streams: bool,
    verify_output: bool,
}

impl SelectionPolicy {
    pub fn new<S: AsRef<str>>(
        audio_languages: &[S],
        subtitle_languages: &[S],
        copy_streams: bool,
        verify_output: bool,
    ) -> Result<Self> {
        Ok(Self {
            audio_languages: language_set("audio", audio_languages)?,
            subtitle_languages: language_set("subtitle", subtitle_languages)?,
            copy_streams,
            verify_output,
        })
    }

    pub fn keeps_audio(&self, language: &str) -> bool {
        self.audio_languages.contains(language)
    }

    pub fn keeps_subtitle(&self, language: &str) -> bool {
        self.subtitle_languages.contains(language)
    }

    pub fn audio_languages(&self) -> &BTreeSet<String> {
        &self.audio_languages
    }

    pub fn subtitle_languages(&self) -> &BTreeSet<String> {
        &self.subtitle_languages
    }

    pub fn copy_streams(&self) -> bool {
        self.copy_streams
    }

    pub fn verify_output(&self) -> bool {
        self.verify_output
    }
}

fn language_set<S: AsRef<str>>(kind: &str, tags: &[S]) -> Result<BTreeSet<String>> {
    tags.iter()
        .map(|tag| {
            let tag = tag.as_ref().trim();
            if tag.is_empty() {
                Err(TrackstripError::Config(format!("Empty {} language tag", kind)))
            } else {
                Ok(tag.to_string())
            }
        })
        .collect()
}
