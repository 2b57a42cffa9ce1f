//! # Host Runtime
//!
//! Loads the module, replays a script against one open file, unloads.

use crate::script::{Script, ScriptCommand};
use services_device_manager::{errno, DeviceManager, DeviceManagerError, FileError, OpenFile};
use services_logger::{KernelLog, LogEntry};
use services_scull::{ModuleError, ScullConfig, ScullModule};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Host runtime error types
#[derive(Debug, Error)]
pub enum HostRuntimeError {
    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    #[error("Script error: {0}")]
    Script(#[from] crate::script::ScriptError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Config(#[from] serde_json::Error),
}

/// Host runtime configuration
#[derive(Debug, Clone, Default)]
pub struct HostRuntimeConfig {
    /// Device settings
    pub scull: ScullConfig,
    /// Command script text
    pub script: Option<String>,
}

/// Reads a [`ScullConfig`] from a JSON file; missing keys take defaults
pub fn load_config(path: impl AsRef<Path>) -> Result<ScullConfig, HostRuntimeError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| HostRuntimeError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// What one command produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Opened,
    Closed,
    Wrote(usize),
    Read(Vec<u8>),
    Seeked(u64),
    Failed { errno: i32, reason: String },
}

impl From<FileError> for StepOutcome {
    fn from(err: FileError) -> Self {
        Self::Failed {
            errno: err.errno,
            reason: err.reason,
        }
    }
}

/// A command and its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub command: ScriptCommand,
    pub outcome: StepOutcome,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<20} -> ", self.command.to_string())?;
        match &self.outcome {
            StepOutcome::Opened => write!(f, "opened"),
            StepOutcome::Closed => write!(f, "closed"),
            StepOutcome::Wrote(count) => write!(f, "{}", count),
            StepOutcome::Read(bytes) => {
                write!(f, "{} bytes [", bytes.len())?;
                for (idx, byte) in bytes.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:02x}", byte)?;
                }
                write!(f, "]")
            }
            StepOutcome::Seeked(position) => write!(f, "position {}", position),
            StepOutcome::Failed { errno: code, reason } => {
                write!(f, "-{} {} ({})", code, errno::name(*code), reason)
            }
        }
    }
}

/// Host runtime
pub struct HostRuntime {
    manager: DeviceManager,
    module: Option<ScullModule>,
    log: KernelLog,
    script: Option<Script>,
    file: Option<OpenFile>,
}

impl HostRuntime {
    /// Loads the module with the configured settings
    pub fn new(config: HostRuntimeConfig) -> Result<Self, HostRuntimeError> {
        let script = config.script.as_deref().map(Script::from_text).transpose()?;

        let mut manager = DeviceManager::default();
        let log = KernelLog::new();
        let module = ScullModule::init(&mut manager, config.scull, log.clone())?;

        Ok(Self {
            manager,
            module: Some(module),
            log,
            script,
            file: None,
        })
    }

    pub fn module(&self) -> Option<&ScullModule> {
        self.module.as_ref()
    }

    /// Log entries recorded so far
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.log.entries()
    }

    /// Runs the whole script, then unloads the module
    pub fn run(&mut self) -> Result<Vec<StepReport>, HostRuntimeError> {
        let mut reports = Vec::new();
        while let Some(command) = self.script.as_mut().and_then(Script::next_command) {
            reports.push(self.step(command));
        }
        self.shutdown()?;
        Ok(reports)
    }

    /// Executes one command against the current file
    pub fn step(&mut self, command: ScriptCommand) -> StepReport {
        let outcome = self.execute(&command);
        StepReport { command, outcome }
    }

    fn execute(&mut self, command: &ScriptCommand) -> StepOutcome {
        match command {
            ScriptCommand::Open => self.open(),
            ScriptCommand::Close => match self.file.take() {
                Some(file) => {
                    file.close();
                    StepOutcome::Closed
                }
                None => Self::no_file(),
            },
            ScriptCommand::Write(bytes) => {
                self.with_file(|file| file.write(bytes).map(StepOutcome::Wrote))
            }
            ScriptCommand::Read(count) => {
                self.with_file(|file| file.read(*count).map(StepOutcome::Read))
            }
            ScriptCommand::Seek { offset, whence } => self.with_file(|file| {
                file.seek(*offset, whence.as_raw()).map(StepOutcome::Seeked)
            }),
        }
    }

    fn with_file(
        &mut self,
        op: impl FnOnce(&mut OpenFile) -> Result<StepOutcome, FileError>,
    ) -> StepOutcome {
        match self.file.as_mut() {
            Some(file) => op(file).unwrap_or_else(StepOutcome::from),
            None => Self::no_file(),
        }
    }

    fn no_file() -> StepOutcome {
        StepOutcome::Failed {
            errno: errno::EBADF,
            reason: "no open file".to_string(),
        }
    }

    fn open(&mut self) -> StepOutcome {
        let Some(module) = self.module.as_ref() else {
            return StepOutcome::Failed {
                errno: errno::ENODEV,
                reason: "module not loaded".to_string(),
            };
        };

        match self.manager.open(module.dev()) {
            Ok(file) => {
                // Opening again replaces (and releases) the previous file
                self.file = Some(file);
                StepOutcome::Opened
            }
            Err(DeviceManagerError::OpenFailed(err)) => StepOutcome::from(err),
            Err(err) => StepOutcome::Failed {
                errno: errno::ENODEV,
                reason: err.to_string(),
            },
        }
    }

    /// Closes any open file and unloads the module
    pub fn shutdown(&mut self) -> Result<(), HostRuntimeError> {
        if let Some(file) = self.file.take() {
            file.close();
        }
        if let Some(module) = self.module.take() {
            module.exit(&mut self.manager)?;
        }
        Ok(())
    }
}

impl Drop for HostRuntime {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
