//! compile_commands.json generation.
//!
//! The compilation database records the exact compiler invocation used for
//! each source file so that editors and indexers can reproduce it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A single entry of compile_commands.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommand {
    /// The working directory for compilation.
    pub directory: PathBuf,

    /// The source file path.
    pub file: PathBuf,

    /// The compilation arguments (array form).
    pub arguments: Vec<String>,
}

impl CompileCommand {
    pub fn new(directory: impl Into<PathBuf>, file: impl Into<PathBuf>, arguments: Vec<String>) -> Self {
        Self {
            directory: directory.into(),
            file: file.into(),
            arguments,
        }
    }
}

/// Ordered collection of compile commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileCommands {
    commands: Vec<CompileCommand>,
}

impl CompileCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load compile commands from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse compile commands from a JSON string.
    pub fn from_str(json: &str) -> crate::Result<Self> {
        let commands: Vec<CompileCommand> = serde_json::from_str(json)?;
        Ok(Self { commands })
    }

    /// Serialize to the JSON array written to disk.
    pub fn to_json(&self) -> crate::Result<String> {
        let mut json = serde_json::to_string_pretty(&self.commands)?;
        json.push('\n');
        Ok(json)
    }

    pub fn push(&mut self, command: CompileCommand) {
        self.commands.push(command);
    }

    /// Get all compile commands.
    pub fn commands(&self) -> &[CompileCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
