use crate::error::{Result, XorshareError};
use crate::pipeline::{DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// What a run does, derived from how many roots sit on each side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One input, one output: plain copy
    Copy,
    /// One input, several outputs: plaintext into shares
    Split,
    /// Several inputs, one output: shares back into plaintext
    Combine,
    /// Several inputs, several outputs: fresh shares of the same secret
    Reshare,
}

impl Mode {
    pub fn for_roots(inputs: usize, outputs: usize) -> Self {
        match (inputs > 1, outputs > 1) {
            (false, false) => Self::Copy,
            (false, true) => Self::Split,
            (true, false) => Self::Combine,
            (true, true) => Self::Reshare,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Copy => "copy",
            Self::Split => "split",
            Self::Combine => "combine",
            Self::Reshare => "reshare",
        };
        f.write_str(name)
    }
}

/// Report format for plans and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = XorshareError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(XorshareError::Config(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                s
            ))),
        }
    }
}

/// Options for a transform run
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Input roots, read and XOR-combined
    pub inputs: Vec<PathBuf>,
    /// Output roots; the last one receives the remainder share
    pub outputs: Vec<PathBuf>,
    /// Bytes per block in the copy loop
    pub block_size: usize,
    /// Worker threads for file processing, 0 for one per CPU
    pub jobs: usize,
    /// Carry on with the remaining files after a file fails
    pub keep_going: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            block_size: DEFAULT_BLOCK_SIZE,
            jobs: 0,
            keep_going: false,
        }
    }
}

impl TransformOptions {
    pub fn new(inputs: Vec<PathBuf>, outputs: Vec<PathBuf>) -> Self {
        Self {
            inputs,
            outputs,
            ..Default::default()
        }
    }

    /// Reject malformed invocations before anything touches the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(XorshareError::Config("No input directories specified".into()));
        }
        if self.outputs.is_empty() {
            return Err(XorshareError::Config("No output directories specified".into()));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(XorshareError::Config(format!(
                "Invalid block size: {}. Must be between 1 and {} bytes",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        self.check_overlap()
    }

    /// Outputs must not alias each other or sit inside an input, however
    /// the paths are spelled. Creating an output truncates whatever is there.
    fn check_overlap(&self) -> Result<()> {
        let inputs = self
            .inputs
            .iter()
            .map(|p| root_identity(p))
            .collect::<Result<Vec<_>>>()?;
        let outputs = self
            .outputs
            .iter()
            .map(|p| root_identity(p))
            .collect::<Result<Vec<_>>>()?;

        for (i, output) in outputs.iter().enumerate() {
            let given = &self.outputs[i];
            if let Some(j) = outputs[..i].iter().position(|o| o == output) {
                return Err(XorshareError::Config(format!(
                    "Output {} is listed more than once (as {})",
                    given.display(),
                    self.outputs[j].display()
                )));
            }
            if let Some(j) = outputs[..i]
                .iter()
                .position(|o| o.starts_with(output) || output.starts_with(o))
            {
                return Err(XorshareError::Config(format!(
                    "Outputs {} and {} overlap",
                    self.outputs[j].display(),
                    given.display()
                )));
            }
            if let Some(j) = inputs
                .iter()
                .position(|input| output.starts_with(input) || input.starts_with(output))
            {
                return Err(XorshareError::Config(format!(
                    "Output {} overlaps input {}",
                    given.display(),
                    self.inputs[j].display()
                )));
            }
        }
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        Mode::for_roots(self.inputs.len(), self.outputs.len())
    }

    /// Number of worker threads to start
    pub fn worker_threads(&self) -> usize {
        if self.jobs > 0 {
            self.jobs
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

/// Absolute, symlink-free form of a root that may not exist yet.
///
/// The longest existing ancestor is canonicalized and the missing tail is
/// appended with `.` and `..` resolved lexically.
fn root_identity(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = fs::canonicalize(path) {
        return Ok(canonical);
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| XorshareError::io("resolve", path, e))?
            .join(path)
    };

    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other),
        }
    }

    let mut tail = Vec::new();
    let mut base = lexical.as_path();
    loop {
        if let Ok(canonical) = fs::canonicalize(base) {
            return Ok(tail.iter().rev().fold(canonical, |acc, name| acc.join(name)));
        }
        match (base.parent(), base.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                base = parent;
            }
            _ => break,
        }
    }
    Ok(lexical)
}
