use miette::{miette, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use vcmake_build::{
    BuildError, CompileCommands, DependencyCompiler, ProcessRunner, ProjectComposer,
    ProjectDescriptor, ProjectLoader, RecipeEmitter, ToolRunner, ToolchainSelection,
    TomlProjectLoader,
};

/// File name of the compilation database.
pub const COMPILE_COMMANDS_FILE: &str = "compile_commands.json";

/// Everything one generation run produces, held in memory until written.
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// File name for the recipe, from the project configuration.
    pub makefile_name: String,
    pub recipe: String,
    pub compile_commands: CompileCommands,
    /// Object output directories, relative to `project_dir`.
    pub object_dirs: Vec<PathBuf>,
    /// Absolute directory of the root project.
    pub project_dir: PathBuf,
}

/// Generator driver: load → validate → compose → check sources → emit.
pub struct Driver<L, R> {
    loader: L,
    runner: R,
}

impl Driver<TomlProjectLoader<ProcessRunner>, ProcessRunner> {
    /// Driver over `vcmake.toml` files and real compiler processes.
    pub fn new(overrides: ToolchainSelection) -> Self {
        Self {
            loader: TomlProjectLoader::new(ProcessRunner).with_overrides(overrides),
            runner: ProcessRunner,
        }
    }
}

impl Default for Driver<TomlProjectLoader<ProcessRunner>, ProcessRunner> {
    fn default() -> Self {
        Self::new(ToolchainSelection::default())
    }
}

impl<L: ProjectLoader, R: ToolRunner> Driver<L, R> {
    pub fn with_parts(loader: L, runner: R) -> Self {
        Self { loader, runner }
    }

    /// Load the project in `dir`.
    pub fn load(&self, dir: impl AsRef<Path>) -> Result<ProjectDescriptor> {
        let dir = dir.as_ref();
        info!("Currently in: {}", dir.display());
        Ok(self.loader.load(dir)?)
    }

    /// Generate the recipe and compile commands for the project in `dir`.
    pub fn generate(&self, dir: impl AsRef<Path>) -> Result<Artifacts> {
        let timestamp = chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();
        self.generate_at(dir, &timestamp)
    }

    /// Like [`Driver::generate`], with a fixed timestamp for the header.
    pub fn generate_at(&self, dir: impl AsRef<Path>, timestamp: &str) -> Result<Artifacts> {
        let project = self.load(dir)?;
        self.generate_project(project, timestamp)
    }

    /// Run every stage after loading on an already-built descriptor.
    pub fn generate_project(&self, mut project: ProjectDescriptor, timestamp: &str) -> Result<Artifacts> {
        project.validate()?;

        ProjectComposer::new(&self.loader).compose(&mut project)?;

        let missing = project.missing_sources();
        if !missing.is_empty() {
            for path in &missing {
                error!("File not readable: {}", path.display());
            }
            return Err(BuildError::MissingSources(missing).into());
        }

        let deps = DependencyCompiler::new(&project, &self.runner).generate()?;
        let recipe = RecipeEmitter::new(&project).render(timestamp, &deps.rules)?;

        Ok(Artifacts {
            makefile_name: project.makefile.clone(),
            recipe,
            compile_commands: deps.commands,
            object_dirs: project.object_dirs().into_iter().collect(),
            project_dir: project.working_dir.clone(),
        })
    }

    /// Create the object directories and write the recipe (and the
    /// compilation database, unless disabled) into `out_dir`.
    ///
    /// Both files are staged next to their final names and only renamed
    /// into place once every write and directory has succeeded. Returns the
    /// paths written.
    pub fn write_artifacts(
        &self,
        artifacts: &Artifacts,
        out_dir: impl AsRef<Path>,
        with_compile_commands: bool,
    ) -> Result<Vec<PathBuf>> {
        let out_dir = out_dir.as_ref();

        let json = if with_compile_commands {
            Some(artifacts.compile_commands.to_json()?)
        } else {
            None
        };

        let mut files = vec![(out_dir.join(&artifacts.makefile_name), artifacts.recipe.as_str())];
        if let Some(json) = &json {
            files.push((out_dir.join(COMPILE_COMMANDS_FILE), json.as_str()));
        }

        let mut staged = Vec::with_capacity(files.len());
        for (path, content) in &files {
            let tmp = staging_path(path);
            if let Err(e) = std::fs::write(&tmp, content) {
                staged.push(tmp);
                discard(&staged);
                return Err(miette!("Failed to write {}: {}", path.display(), e));
            }
            staged.push(tmp);
        }

        for dir in &artifacts.object_dirs {
            let dir = artifacts.project_dir.join(dir);
            if let Err(e) = std::fs::create_dir_all(&dir) {
                discard(&staged);
                return Err(miette!("Failed to create {}: {}", dir.display(), e));
            }
        }

        let mut written = Vec::with_capacity(files.len());
        for (i, ((path, _), tmp)) in files.iter().zip(&staged).enumerate() {
            if let Err(e) = std::fs::rename(tmp, path) {
                discard(&staged[i..]);
                return Err(miette!("Failed to write {}: {}", path.display(), e));
            }
            info!("Wrote {}", path.display());
            written.push(path.clone());
        }

        Ok(written)
    }
}

/// `dir/.name.tmp` for `dir/name`.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

fn discard(staged: &[PathBuf]) {
    for tmp in staged {
        if tmp.is_file() {
            let _ = std::fs::remove_file(tmp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcmake_build::{ToolOutput, Toolchain};

    /// Echoes an `obj: src` rule for every dependency request.
    struct EchoRunner;

    impl ToolRunner for EchoRunner {
        fn run(&self, argv: &[String], _cwd: &Path) -> vcmake_build::Result<ToolOutput> {
            let i = argv.iter().position(|a| a == "-MT").unwrap_or(0);
            Ok(ToolOutput {
                status: Some(0),
                stdout: format!("{}: {}\n", argv[i + 1], argv[argv.len() - 1]),
                stderr: String::new(),
            })
        }
    }

    struct NoRelated;

    impl ProjectLoader for NoRelated {
        fn load(&self, dir: &Path) -> vcmake_build::Result<ProjectDescriptor> {
            Err(BuildError::ConfigNotFound(dir.to_path_buf()))
        }
    }

    fn project_on_disk(sources: &[&str]) -> (tempfile::TempDir, ProjectDescriptor) {
        let dir = tempfile::tempdir().unwrap();
        for s in sources {
            let path = dir.path().join("src").join(s);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "int x;\n").unwrap();
        }
        let project = ProjectDescriptor::new(dir.path(), Toolchain::gcc())
            .with_executable("bin/app")
            .with_sources(sources);
        (dir, project)
    }

    #[test]
    fn test_generate_project() {
        let (_dir, project) = project_on_disk(&["a.cpp", "b/c.cpp"]);
        let driver = Driver::with_parts(NoRelated, EchoRunner);

        let artifacts = driver.generate_project(project, "ts").unwrap();

        assert_eq!(artifacts.makefile_name, "Makefile");
        assert_eq!(artifacts.compile_commands.len(), 2);
        assert_eq!(
            artifacts.object_dirs,
            vec![PathBuf::from("bin"), PathBuf::from("bin/b")]
        );
        assert!(artifacts.recipe.contains("\nbin/b/c.o: src/b/c.cpp\n"));
    }

    #[test]
    fn test_missing_source_aborts() {
        let (_dir, project) = project_on_disk(&["a.cpp"]);
        let project = ProjectDescriptor {
            source_files: vec![
                vcmake_common::SourceFile::new("a.cpp"),
                vcmake_common::SourceFile::new("gone.cpp"),
            ],
            ..project
        };
        let driver = Driver::with_parts(NoRelated, EchoRunner);

        let err = driver.generate_project(project, "ts").unwrap_err();
        assert!(err.to_string().contains("src/gone.cpp"));
    }

    #[test]
    fn test_write_artifacts() {
        let (dir, project) = project_on_disk(&["a.cpp", "b/c.cpp"]);
        let driver = Driver::with_parts(NoRelated, EchoRunner);
        let artifacts = driver.generate_project(project, "ts").unwrap();

        let written = driver.write_artifacts(&artifacts, dir.path(), true).unwrap();

        assert_eq!(written.len(), 2);
        assert!(dir.path().join("bin/b").is_dir());
        let recipe = std::fs::read_to_string(dir.path().join("Makefile")).unwrap();
        assert_eq!(recipe, artifacts.recipe);
        let db = CompileCommands::from_file(&dir.path().join(COMPILE_COMMANDS_FILE)).unwrap();
        assert_eq!(db, artifacts.compile_commands);
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let (dir, project) = project_on_disk(&["a.cpp", "b/c.cpp"]);
        let driver = Driver::with_parts(NoRelated, EchoRunner);
        let artifacts = driver.generate_project(project, "ts").unwrap();

        // A directory in the way makes the database write fail.
        let blocked = staging_path(&dir.path().join(COMPILE_COMMANDS_FILE));
        std::fs::create_dir(&blocked).unwrap();

        let err = driver.write_artifacts(&artifacts, dir.path(), true).unwrap_err();

        assert!(err.to_string().contains(COMPILE_COMMANDS_FILE));
        assert!(!dir.path().join("Makefile").exists());
        assert!(!staging_path(&dir.path().join("Makefile")).exists());
        assert!(!dir.path().join(COMPILE_COMMANDS_FILE).exists());
        assert!(!dir.path().join("bin").exists());
        assert!(blocked.is_dir());
    }

    #[test]
    fn test_write_leaves_no_staging_files() {
        let (dir, project) = project_on_disk(&["a.cpp"]);
        let driver = Driver::with_parts(NoRelated, EchoRunner);
        let artifacts = driver.generate_project(project, "ts").unwrap();

        driver.write_artifacts(&artifacts, dir.path(), true).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_without_compile_commands() {
        let (dir, project) = project_on_disk(&["a.cpp"]);
        let driver = Driver::with_parts(NoRelated, EchoRunner);
        let artifacts = driver.generate_project(project, "ts").unwrap();

        driver.write_artifacts(&artifacts, dir.path(), false).unwrap();
        assert!(!dir.path().join(COMPILE_COMMANDS_FILE).exists());
    }
}
