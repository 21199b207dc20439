use std::fs::File;
use std::path::{Path, PathBuf};

use crate::path::join_rel;

/// The language of a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Cpp,
}

impl Language {
    /// Only extensions that denote compilable translation units map to a
    /// language; headers return `None`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "c" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "c++" | "C" => Some(Language::Cpp),
            _ => None,
        }
    }
}

/// A single to-be-compiled source file, relative to the project source root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    full_path: PathBuf,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            full_path: path.into(),
        }
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Directory part of the path; empty for a bare file name.
    pub fn directory(&self) -> &Path {
        self.full_path.parent().unwrap_or(Path::new(""))
    }

    pub fn base_name(&self) -> String {
        self.full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn stem(&self) -> String {
        self.full_path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension including the leading dot, or empty.
    pub fn extension(&self) -> String {
        self.full_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default()
    }

    pub fn language(&self) -> Option<Language> {
        self.full_path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Language::from_extension)
    }

    /// Whether the file can be opened for reading, joined onto `base_dir`
    /// when one is given.
    pub fn exists_under(&self, base_dir: Option<&Path>) -> bool {
        let path = match base_dir {
            Some(dir) => join_rel(dir, &self.full_path),
            None => self.full_path.clone(),
        };
        path.is_file() && File::open(&path).is_ok()
    }

    /// The file name with `ext` substituted for the current extension.
    ///
    /// `ext` may be given with or without the leading dot.
    pub fn with_extension(&self, ext: &str, include_dir: bool) -> PathBuf {
        let name = if ext.starts_with('.') {
            format!("{}{}", self.stem(), ext)
        } else {
            format!("{}.{}", self.stem(), ext)
        };

        if include_dir {
            join_rel(self.directory(), name)
        } else {
            PathBuf::from(name)
        }
    }
}

impl std::fmt::Display for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_derived_parts() {
        let f = SourceFile::new("b/c.cpp");
        assert_eq!(f.directory(), Path::new("b"));
        assert_eq!(f.base_name(), "c.cpp");
        assert_eq!(f.stem(), "c");
        assert_eq!(f.extension(), ".cpp");
        assert_eq!(f.language(), Some(Language::Cpp));
    }

    #[test]
    fn test_no_extension() {
        let f = SourceFile::new("Makefile");
        assert_eq!(f.directory(), Path::new(""));
        assert_eq!(f.stem(), "Makefile");
        assert_eq!(f.extension(), "");
        assert_eq!(f.language(), None);
        assert_eq!(f.with_extension("o", true), PathBuf::from("Makefile.o"));
    }

    #[test]
    fn test_with_extension_keeps_directory_and_stem() {
        for path in ["a.cpp", "b/c.cc", "deep/er/x.y.cxx"] {
            let f = SourceFile::new(path);
            let changed = SourceFile::new(f.with_extension(".x", true));
            assert_eq!(changed.extension(), ".x");
            assert_eq!(changed.directory(), f.directory());
            assert_eq!(changed.stem(), f.stem());
        }
    }

    #[test]
    fn test_with_extension_normalizes_dot() {
        let f = SourceFile::new("b/c.cpp");
        assert_eq!(f.with_extension("o", true), PathBuf::from("b/c.o"));
        assert_eq!(f.with_extension(".o", true), PathBuf::from("b/c.o"));
        assert_eq!(f.with_extension(".d", false), PathBuf::from("c.d"));
        // The instance is untouched.
        assert_eq!(f.full_path(), Path::new("b/c.cpp"));
    }

    #[test]
    fn test_exists_under() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        let mut file = std::fs::File::create(dir.path().join("b/c.cpp")).unwrap();
        writeln!(file, "int main() {{ return 0; }}").unwrap();

        assert!(SourceFile::new("b/c.cpp").exists_under(Some(dir.path())));
        assert!(!SourceFile::new("b/missing.cpp").exists_under(Some(dir.path())));
        assert!(!SourceFile::new("b").exists_under(Some(dir.path())));

        let absolute = SourceFile::new(dir.path().join("b/c.cpp"));
        assert!(absolute.exists_under(None));
    }
}
