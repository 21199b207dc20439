mod path;
mod source;

pub use path::{join_rel, path_string};
pub use source::{Language, SourceFile};
