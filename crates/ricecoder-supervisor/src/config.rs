//! Process configuration

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

/// Shell used to interpret the command line
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Standard stream endpoint handed to the child on every spawn
///
/// The supervisor never reads from or writes to an endpoint itself, it only
/// forwards it. File endpoints are duplicated per spawn so the same config
/// can drive several sequential runs.
#[derive(Debug, Clone, Default)]
pub enum Endpoint {
    /// Share the supervisor's own stream
    #[default]
    Inherit,
    /// Connect to the null device
    Null,
    /// Connect to an open file (or anything convertible into one, e.g. a pipe end)
    File(Arc<File>),
}

impl Endpoint {
    /// Wrap an open file as an endpoint
    pub fn file(file: File) -> Self {
        Self::File(Arc::new(file))
    }

    pub(crate) fn to_stdio(&self) -> io::Result<Stdio> {
        match self {
            Self::Inherit => Ok(Stdio::inherit()),
            Self::Null => Ok(Stdio::null()),
            Self::File(file) => Ok(Stdio::from(file.try_clone()?)),
        }
    }
}

impl From<File> for Endpoint {
    fn from(file: File) -> Self {
        Self::file(file)
    }
}

/// Configuration for a supervised shell command
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Shell command line, passed to the shell with `-c`
    pub command: String,
    /// Shell executable
    pub shell: PathBuf,
    /// Working directory (None = current dir)
    pub working_dir: Option<PathBuf>,
    /// Environment variables (added to the inherited env)
    pub env: HashMap<String, String>,
    /// Stdin endpoint
    pub stdin: Endpoint,
    /// Stdout endpoint
    pub stdout: Endpoint,
    /// Stderr endpoint
    pub stderr: Endpoint,
}

impl ProcessConfig {
    /// Create new process configuration
    ///
    /// Stdin defaults to the null device, stdout and stderr are inherited.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            shell: PathBuf::from(DEFAULT_SHELL),
            working_dir: None,
            env: HashMap::new(),
            stdin: Endpoint::Null,
            stdout: Endpoint::Inherit,
            stderr: Endpoint::Inherit,
        }
    }

    /// Set the shell executable
    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Set working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the stdin endpoint
    pub fn stdin(mut self, endpoint: impl Into<Endpoint>) -> Self {
        self.stdin = endpoint.into();
        self
    }

    /// Set the stdout endpoint
    pub fn stdout(mut self, endpoint: impl Into<Endpoint>) -> Self {
        self.stdout = endpoint.into();
        self
    }

    /// Set the stderr endpoint
    pub fn stderr(mut self, endpoint: impl Into<Endpoint>) -> Self {
        self.stderr = endpoint.into();
        self
    }
}
