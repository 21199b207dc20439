use std::path::{Path, PathBuf};

/// Join `rel` onto `base`, treating an empty `rel` as `base` itself.
///
/// `Path::join` with an empty component leaves a trailing separator
/// (`bin/`), which would make `bin` and `bin/` distinct directories in the
/// generated recipe.
pub fn join_rel(base: impl AsRef<Path>, rel: impl AsRef<Path>) -> PathBuf {
    let base = base.as_ref();
    let rel = rel.as_ref();
    if rel.as_os_str().is_empty() {
        base.to_path_buf()
    } else if base.as_os_str().is_empty() {
        rel.to_path_buf()
    } else {
        base.join(rel)
    }
}

/// Lossy string form of a path, as written into recipes and JSON.
pub fn path_string(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().into_owned()
}
