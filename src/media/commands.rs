use std::path::Path;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::selector::StreamMapping;

/// Why an external media command did not succeed
#[derive(Error, Debug)]
pub enum CommandFailure {
    #[error("failed to execute {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{description} exited with {}: {stderr}", exit_code_label(.code))]
    Exit {
        description: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("return code {}", code),
        None => "no return code (terminated by signal)".to_string(),
    }
}

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file (or a bare path operand, as ffprobe takes it)
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Refuse to overwrite an existing output; ffmpeg exits with an error instead
    pub fn no_overwrite(self) -> Self {
        self.arg("-n")
    }

    /// Never read from stdin, so a batch run cannot block on a prompt
    pub fn no_stdin(self) -> Self {
        self.arg("-nostdin")
    }

    /// Map one stream of the first input
    pub fn map_stream(self, index: u32) -> Self {
        self.arg("-map").arg(format!("0:{}", index))
    }

    /// Map every stream of a mapping, in order
    pub fn map_streams(self, mapping: &StreamMapping) -> Self {
        mapping
            .indices()
            .iter()
            .fold(self, |cmd, &index| cmd.map_stream(index))
    }

    /// Copy every mapped stream without re-encoding
    pub fn copy_all(self) -> Self {
        self.arg("-c").arg("copy")
    }

    /// Full command line, for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.binary_path.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Execute the command and return its stdout
    pub async fn execute(&self) -> Result<String, CommandFailure> {
        debug!("Executing media processing command: {}", self.command_line());
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| CommandFailure::Spawn {
                binary: self.binary_path.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(CommandFailure::Exit {
                description: self.description.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builder for the ffmpeg/ffprobe invocations this tool needs
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build ffprobe stream listing command
    pub fn probe_streams<P: AsRef<Path>>(&self, media_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Stream probe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .output(media_path)
    }

    /// Build ffmpeg remux command keeping only the mapped streams
    pub fn remux<P: AsRef<Path>>(
        &self,
        input_path: P,
        mapping: &StreamMapping,
        copy_streams: bool,
        output_path: P,
    ) -> MediaCommand {
        let cmd = MediaCommand::new(&self.binary_path, "Stream remux")
            .no_stdin()
            .no_overwrite()
            .input(input_path)
            .map_streams(mapping);

        let cmd = if copy_streams { cmd.copy_all() } else { cmd };

        cmd.output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}
