use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::{debug, warn};

/// Fixed name of the highlighter scratch file in the temp directory.
/// Concurrent sessions share it.
pub const SCRATCH_FILE_NAME: &str = "pipefile-pyplay";

/// Render a value as a block-style YAML document with an explicit `---`
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_yaml::Error> {
    Ok(format!("---\n{}", serde_yaml::to_string(value)?))
}

/// Prints YAML documents, optionally through an external highlighter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrettyPrinter {
    highlighter: Option<String>,
    scratch: PathBuf,
}

impl PrettyPrinter {
    pub fn new(highlighter: Option<String>) -> Self {
        Self {
            highlighter,
            scratch: std::env::temp_dir().join(SCRATCH_FILE_NAME),
        }
    }

    pub fn with_scratch(mut self, scratch: impl Into<PathBuf>) -> Self {
        self.scratch = scratch.into();
        self
    }

    /// The text to show for `document`: highlighted when a highlighter is
    /// configured and succeeds, the document itself otherwise
    pub fn render(&self, document: &str) -> String {
        let Some(command) = &self.highlighter else {
            return document.to_string();
        };

        match self.highlight(command, document) {
            Ok(highlighted) => highlighted,
            Err(err) => {
                warn!(command = %command, error = %err, "highlighter failed, printing plain YAML");
                document.to_string()
            }
        }
    }

    /// Pipe `document` through `sh -c command` into the scratch file and
    /// read it back
    fn highlight(&self, command: &str, document: &str) -> io::Result<String> {
        debug!(command = %command, scratch = %self.scratch.display(), "running highlighter");
        let scratch = File::create(&self.scratch)?;
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(scratch)
            .spawn()?;

        // Reap the child even when it stops reading early
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(document.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait()?;
        written?;
        if !status.success() {
            return Err(io::Error::other(format!("highlighter exited with {status}")));
        }

        fs::read_to_string(&self.scratch)
    }
}
