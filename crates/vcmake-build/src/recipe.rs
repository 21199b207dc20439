//! Rendering a composed project into Makefile text.
//!
//! Target lines start at column 0 and every action line is indented with
//! exactly one tab. All generated target names carry the project's
//! namespace prefix so several composed projects can share one make run.

use std::path::PathBuf;

use vcmake_common::path_string;

use crate::error::Result;
use crate::project::{ProjectDescriptor, Target};

/// Renders the recipe for one composed project.
///
/// Rendering reads nothing but the descriptor; the generation timestamp is
/// passed in by the caller.
pub struct RecipeEmitter<'a> {
    project: &'a ProjectDescriptor,
}

impl<'a> RecipeEmitter<'a> {
    pub fn new(project: &'a ProjectDescriptor) -> Self {
        Self { project }
    }

    /// The full recipe: header, project targets, the per-file dependency
    /// rules produced by the toolchain, and the footer.
    pub fn render(&self, timestamp: &str, dependency_rules: &str) -> Result<String> {
        let mut out = String::new();
        self.write_header(&mut out, timestamp);
        self.write_targets(&mut out)?;
        out.push_str(dependency_rules);
        self.write_footer(&mut out);
        Ok(out)
    }

    pub fn write_header(&self, out: &mut String, timestamp: &str) {
        out.push_str("#\n");
        out.push_str("# This file is mechanically generated.  Any changes will most likely be lost.\n");
        out.push_str("#\n");
        out.push_str(&format!("# File generated on: {timestamp}\n"));
        out.push_str("#\n\n");
    }

    /// `all`/`clean` aggregates (root only), link, objects, clean and
    /// output-directory targets.
    pub fn write_targets(&self, out: &mut String) -> Result<()> {
        let p = self.project;
        let prefix = p.target_prefix();
        let objects = object_names(p);

        // With no prefix the namespaced targets already are `all`/`clean`.
        if p.is_root && !prefix.is_empty() {
            out.push_str("#\n# Top-level project targets\n#\n\n");
            out.push_str(&format!("all: {prefix}all\n\n"));
            out.push_str(&format!("clean: {prefix}clean\n\n"));
        }

        out.push_str(&format!("{prefix}all: {prefix}all_o\n"));
        action(out, &self.link_command()?);
        out.push('\n');

        let mut deps = vec![format!("{prefix}make_dirs")];
        deps.extend(objects.iter().cloned());
        out.push_str(&format!("{prefix}all_o: {}\n\n", deps.join(" ")));

        out.push_str(&format!("{prefix}clean:\n"));
        out.push_str("\t@echo Cleaning stuff.\n");
        let artifact = path_string(p.artifact_path()?);
        for file in objects.iter().chain(std::iter::once(&artifact)) {
            out.push_str(&format!("\t- @rm {file} 2> /dev/null || true\n"));
        }
        out.push('\n');

        out.push_str(&format!("{prefix}make_dirs:\n"));
        for dir in p.object_dirs() {
            out.push_str(&format!("\t- @mkdir -p {}\n", dir.display()));
        }

        Ok(())
    }

    pub fn write_footer(&self, out: &mut String) {
        out.push_str("\n#\n# EOF\n#\n");
    }

    /// The argv of the final link step.
    pub fn link_command(&self) -> Result<Vec<String>> {
        let p = self.project;
        let objects = object_names(p);
        let mut cmd = Vec::new();

        match p.target()? {
            Target::Library(name) => {
                let output: PathBuf = p.output_dir.join(p.library_file_name(&name));
                cmd.push(p.toolchain.cxx().to_string());
                cmd.extend(p.compiler_flags.iter().cloned());
                cmd.extend(p.library_link_flags.iter().cloned());
                cmd.push("-o".to_string());
                cmd.push(path_string(output));
                cmd.extend(objects);
            }
            Target::Executable(exe) => {
                cmd.push(p.toolchain.ld().to_string());
                cmd.extend(p.link_flags.iter().cloned());
                cmd.push("-o".to_string());
                cmd.push(exe);
                cmd.extend(objects);
                cmd.extend(p.lib_dirs.iter().map(|d| format!("-L{}", d.display())));
                cmd.extend(p.libraries.iter().map(|l| format!("-l{l}")));
                cmd.extend(p.executable_link_flags.iter().cloned());
                cmd.extend(p.system_link_libs.iter().cloned());
            }
        }

        Ok(cmd)
    }
}

fn object_names(p: &ProjectDescriptor) -> Vec<String> {
    p.object_files().into_iter().map(path_string).collect()
}

fn action(out: &mut String, argv: &[String]) {
    out.push('\t');
    out.push_str(&argv.join(" "));
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::toolchain::{Platform, Toolchain};

    const TS: &str = "2026-01-01T00:00:00";

    fn project() -> ProjectDescriptor {
        ProjectDescriptor::new("/w/app", Toolchain::gcc())
    }

    fn targets(p: &ProjectDescriptor) -> String {
        let mut out = String::new();
        RecipeEmitter::new(p).write_targets(&mut out).unwrap();
        out
    }

    #[test]
    fn test_library_link_step() {
        let p = project().with_library("mylib").with_sources(&["a.cpp"]);
        let text = targets(&p);

        let link = text
            .lines()
            .nth(1)
            .expect("link action follows the all target");
        assert!(link.starts_with("\tg++ "));
        assert!(link.contains(" -shared "));
        assert!(link.contains(" -o bin/libmylib.so "));
        assert!(link.ends_with(" bin/a.o"));
        assert!(text.starts_with("all: all_o\n"));
    }

    #[test]
    fn test_library_naming_follows_platform() {
        let p = ProjectDescriptor::new("/w/app", Toolchain::clang(Platform::MacOs))
            .with_library("libfoo")
            .with_sources(&["a.cpp"]);
        let cmd = RecipeEmitter::new(&p).link_command().unwrap();
        assert!(cmd.contains(&"bin/libfoo.dylib".to_string()));
        assert!(cmd.contains(&"-dynamiclib".to_string()));
    }

    #[test]
    fn test_executable_link_order() {
        let mut p = project()
            .with_executable("bin/app")
            .with_sources(&["a.cpp", "b/c.cpp"]);
        p.lib_dirs.push(PathBuf::from("../core/bin"));
        p.libraries.push("core".to_string());
        p.executable_link_flags.push("-rdynamic".to_string());
        p.system_link_libs.push("-ldl".to_string());

        let cmd = RecipeEmitter::new(&p).link_command().unwrap();
        assert_eq!(
            cmd,
            vec![
                "g++",
                "-fexceptions",
                "-o",
                "bin/app",
                "bin/a.o",
                "bin/b/c.o",
                "-L../core/bin",
                "-lcore",
                "-rdynamic",
                "-ldl",
            ]
        );
    }

    #[test]
    fn test_objects_and_make_dirs() {
        let p = project()
            .with_executable("bin/app")
            .with_sources(&["a.cpp", "b/c.cpp"]);
        let text = targets(&p);

        assert!(text.contains("all_o: make_dirs bin/a.o bin/b/c.o\n"));
        let make_dirs = text.split("make_dirs:\n").nth(1).unwrap();
        assert_eq!(make_dirs, "\t- @mkdir -p bin\n\t- @mkdir -p bin/b\n");
    }

    #[test]
    fn test_clean_removes_objects_and_artifact() {
        let p = project().with_library("mylib").with_sources(&["a.cpp"]);
        let text = targets(&p);
        assert!(text.contains("clean:\n\t@echo Cleaning stuff.\n"));
        assert!(text.contains("\t- @rm bin/a.o 2> /dev/null || true\n"));
        assert!(text.contains("\t- @rm bin/libmylib.so 2> /dev/null || true\n"));
    }

    #[test]
    fn test_prefixed_targets_with_root_aggregates() {
        let p = project()
            .with_executable("bin/app")
            .with_tag("app")
            .with_sources(&["a.cpp"]);
        let text = targets(&p);

        assert!(text.contains("all: app_all\n"));
        assert!(text.contains("clean: app_clean\n"));
        assert!(text.contains("app_all: app_all_o\n"));
        assert!(text.contains("app_all_o: app_make_dirs bin/a.o\n"));
        assert!(text.contains("app_clean:\n"));
        assert!(text.contains("app_make_dirs:\n"));
        // Aggregates come before the targets they dispatch to.
        assert!(text.find("all: app_all").unwrap() < text.find("app_all: app_all_o").unwrap());
    }

    #[test]
    fn test_non_root_has_no_aggregates() {
        let mut p = project().with_library("core").with_tag("core").with_sources(&["a.cpp"]);
        p.is_root = false;
        let text = targets(&p);
        assert!(!text.contains("\nall: "));
        assert!(text.starts_with("core_all: core_all_o\n"));
    }

    #[test]
    fn test_invalid_target_fails() {
        for p in [
            project().with_sources(&["a.cpp"]),
            project().with_library("x").with_executable("bin/x"),
        ] {
            let err = RecipeEmitter::new(&p).render(TS, "").unwrap_err();
            assert!(err.is_configuration(), "{err}");
        }
        assert!(matches!(
            RecipeEmitter::new(&project()).render(TS, ""),
            Err(BuildError::NoTarget(_))
        ));
    }

    #[test]
    fn test_render_layout() {
        let p = project().with_executable("bin/app").with_sources(&["a.cpp"]);
        let text = RecipeEmitter::new(&p)
            .render(TS, "\nbin/a.o: src/a.cpp\n\tg++ -c src/a.cpp -o bin/a.o\n")
            .unwrap();

        assert!(text.starts_with("#\n# This file is mechanically generated."));
        assert!(text.contains(&format!("# File generated on: {TS}\n")));
        assert!(text.ends_with("\n#\n# EOF\n#\n"));
        let rules_at = text.find("bin/a.o: src/a.cpp").unwrap();
        assert!(text.find("make_dirs:\n").unwrap() < rules_at);

        for line in text.lines() {
            let is_action = line.starts_with('\t');
            assert!(!line.starts_with(' '), "stray indentation: {line:?}");
            if is_action {
                assert!(!line[1..].starts_with('\t'), "double tab: {line:?}");
            }
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let p = project()
            .with_library("core")
            .with_tag("core")
            .with_sources(&["x/a.cpp", "b.cpp", "x/c.cpp"]);
        let first = RecipeEmitter::new(&p).render("one", "").unwrap();
        let second = RecipeEmitter::new(&p).render("two", "").unwrap();

        let strip = |s: &str| {
            s.lines()
                .filter(|l| !l.starts_with("# File generated on:"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_ne!(first, second);
        assert_eq!(strip(&first), strip(&second));
    }
}
