use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, SelectionPolicy};
use crate::error::Result;

/// Remove unwanted language tracks from video files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Input video file or directory
    pub input_path: PathBuf,

    /// Audio language codes to keep (default: eng, en, kor, jpn, chi, zho, cmn)
    #[arg(long, num_args = 1..)]
    pub audio_langs: Option<Vec<String>>,

    /// Subtitle language codes to keep (default: eng, en)
    #[arg(long, num_args = 1..)]
    pub subtitle_langs: Option<Vec<String>>,

    /// Don't use stream copy mode (will re-encode streams)
    #[arg(long)]
    pub no_copy: bool,

    /// Skip output file verification
    #[arg(long)]
    pub no_verify: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Apply command line overrides on top of a loaded configuration
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(langs) = &self.audio_langs {
            config.policy.audio_languages = langs.clone();
        }
        if let Some(langs) = &self.subtitle_langs {
            config.policy.subtitle_languages = langs.clone();
        }
        if self.no_copy {
            config.policy.copy_streams = false;
        }
        if self.no_verify {
            config.policy.verify_output = false;
        }
    }

    /// Apply the overrides, validate the result and build the run's policy
    pub fn resolve_policy(&self, config: &mut Config) -> Result<SelectionPolicy> {
        self.apply_to(config);
        config.validate()?;
        config.policy.to_policy()
    }
}
