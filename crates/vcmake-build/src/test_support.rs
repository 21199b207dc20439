//! Scripted toolchain and in-memory projects for unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::ProjectLoader;
use crate::error::{BuildError, Result};
use crate::project::ProjectDescriptor;
use crate::toolchain::{ToolOutput, ToolRunner};

/// Answers commands from a script; unscripted `-MT` invocations get a
/// one-line `obj: src` rule, anything else succeeds silently.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, ToolOutput>,
    failures: Vec<(String, ToolOutput)>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, output: ToolOutput) -> Self {
        self.responses.insert(command.to_string(), output);
        self
    }

    /// Fail every command whose line contains `needle`.
    pub fn fail_on(mut self, needle: &str, status: i32, stderr: &str) -> Self {
        self.failures.push((
            needle.to_string(),
            ToolOutput {
                status: Some(status),
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        ));
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, argv: &[String], _cwd: &Path) -> Result<ToolOutput> {
        self.calls.borrow_mut().push(argv.to_vec());
        let line = argv.join(" ");

        if let Some(out) = self.responses.get(&line) {
            return Ok(out.clone());
        }
        if let Some((_, out)) = self.failures.iter().find(|(n, _)| line.contains(n.as_str())) {
            return Ok(out.clone());
        }

        let stdout = match argv.iter().position(|a| a == "-MT") {
            Some(i) if i + 1 < argv.len() => {
                let obj = &argv[i + 1];
                let src = argv.last().map(String::as_str).unwrap_or_default();
                format!("{obj}: {src}\n")
            }
            _ => String::new(),
        };
        Ok(ToolOutput {
            status: Some(0),
            stdout,
            stderr: String::new(),
        })
    }
}

/// Loader serving descriptors from memory, keyed by directory.
#[derive(Default)]
pub struct MemoryLoader {
    projects: HashMap<PathBuf, ProjectDescriptor>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, project: ProjectDescriptor) -> Self {
        self.projects.insert(project.working_dir.clone(), project);
        self
    }
}

impl ProjectLoader for MemoryLoader {
    fn load(&self, dir: &Path) -> Result<ProjectDescriptor> {
        let dir = normalize(dir);
        self.projects
            .get(&dir)
            .cloned()
            .ok_or(BuildError::ConfigNotFound(dir))
    }
}

/// Lexically fold `.` and `..` so `/w/app/../core` keys as `/w/core`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
