//! Per-file dependency rules and compile commands.
//!
//! Each source file is run through the compiler's dependency mode and the
//! emitted rule is followed by the file's compile action. Files are
//! processed one at a time in declaration order; the first failing
//! invocation aborts the whole run and nothing produced so far is kept.

use std::path::PathBuf;
use tracing::{debug, error};

use vcmake_common::{path_string, SourceFile};

use crate::compile_commands::{CompileCommand, CompileCommands};
use crate::error::{BuildError, Result};
use crate::project::ProjectDescriptor;
use crate::toolchain::ToolRunner;

/// Everything dependency generation produced for a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyOutput {
    /// Recipe text: one dependency rule plus compile action per file.
    pub rules: String,
    pub commands: CompileCommands,
}

/// Runs dependency generation for every source file of a project.
pub struct DependencyCompiler<'a, R> {
    project: &'a ProjectDescriptor,
    runner: R,
}

impl<'a, R: ToolRunner> DependencyCompiler<'a, R> {
    pub fn new(project: &'a ProjectDescriptor, runner: R) -> Self {
        Self { project, runner }
    }

    /// `cxx -I… <dependency flags> <compiler flags> -MT <obj> <src>`
    pub fn dependency_command(&self, file: &SourceFile) -> Vec<String> {
        let p = self.project;
        let mut cmd = vec![p.toolchain.cxx().to_string()];
        cmd.extend(p.include_args());
        cmd.extend(p.dependency_flags.iter().cloned());
        cmd.extend(p.compiler_flags.iter().cloned());
        cmd.push("-MT".to_string());
        cmd.push(path_string(p.object_file(file)));
        cmd.push(path_string(p.source_path(file)));
        cmd
    }

    /// `cxx -I… <compiler flags> -c <src> -o <obj>`
    pub fn compile_command(&self, file: &SourceFile) -> Vec<String> {
        let p = self.project;
        let mut cmd = vec![p.toolchain.cxx().to_string()];
        cmd.extend(p.include_args());
        cmd.extend(p.compiler_flags.iter().cloned());
        cmd.push("-c".to_string());
        cmd.push(path_string(p.source_path(file)));
        cmd.push("-o".to_string());
        cmd.push(path_string(p.object_file(file)));
        cmd
    }

    /// Generate rules and compile commands for all source files.
    pub fn generate(&self) -> Result<DependencyOutput> {
        self.project.toolchain.validate()?;

        let mut output = DependencyOutput::default();
        for file in &self.project.source_files {
            self.generate_file(file, &mut output)?;
        }
        Ok(output)
    }

    fn generate_file(&self, file: &SourceFile, output: &mut DependencyOutput) -> Result<()> {
        let p = self.project;
        let dep_cmd = self.dependency_command(file);
        debug!(file = %file, "generating dependencies");

        let result = self.runner.run(&dep_cmd, &p.working_dir)?;
        if !result.success() {
            let command = dep_cmd.join(" ");
            error!(%command, status = ?result.status, "dependency generation failed");
            return Err(BuildError::ToolchainInvocation {
                command,
                status: result.status,
                stderr: result.stderr,
            });
        }

        let compile = self.compile_command(file);

        output.rules.push('\n');
        output.rules.push_str(&result.stdout);
        if !result.stdout.is_empty() && !result.stdout.ends_with('\n') {
            output.rules.push('\n');
        }
        output.rules.push('\t');
        output.rules.push_str(&compile.join(" "));
        output.rules.push('\n');

        output.commands.push(CompileCommand::new(
            p.working_dir.clone(),
            self.absolute_source(file),
            compile,
        ));
        Ok(())
    }

    fn absolute_source(&self, file: &SourceFile) -> PathBuf {
        self.project.working_dir.join(self.project.source_path(file))
    }
}
