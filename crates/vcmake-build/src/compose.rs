//! Folding related projects into the project that depends on them.
//!
//! Related projects are resolved depth-first: a related project's own
//! related projects are folded into it before its include directories and
//! library are read by the parent. After composition the root descriptor
//! carries every include directory, library directory, library name and
//! runtime search path needed to build and link it.

use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use vcmake_common::join_rel;

use crate::config::ProjectLoader;
use crate::error::{BuildError, Result};
use crate::project::{link_name, ProjectDescriptor, RelatedLink, Target};

/// Resolves `related_projects` through a [`ProjectLoader`].
pub struct ProjectComposer<L> {
    loader: L,
}

/// Bookkeeping for one composition run.
struct Resolution {
    /// Projects currently being resolved, outermost first.
    stack: Vec<PathBuf>,
    /// Tag owners across the whole tree.
    tags: FxHashMap<String, PathBuf>,
}

impl Resolution {
    fn claim_tag(&mut self, project: &ProjectDescriptor) -> Result<()> {
        let Some(tag) = project.tag() else {
            return Err(BuildError::UntaggedRelatedProject(project.working_dir.clone()));
        };
        match self.tags.get(tag) {
            Some(owner) if *owner != project.working_dir => Err(BuildError::DuplicateTag {
                tag: tag.to_string(),
                first: owner.clone(),
                second: project.working_dir.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                self.tags.insert(tag.to_string(), project.working_dir.clone());
                Ok(())
            }
        }
    }
}

impl<L: ProjectLoader> ProjectComposer<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Fold every related project of `root` into it, in declaration order.
    ///
    /// Fails without a partial result on the first project that cannot be
    /// loaded, on a cycle, or on a tag collision.
    pub fn compose(&self, root: &mut ProjectDescriptor) -> Result<()> {
        let mut resolution = Resolution {
            stack: vec![root.working_dir.clone()],
            tags: FxHashMap::default(),
        };
        if let Some(tag) = root.tag() {
            resolution
                .tags
                .insert(tag.to_string(), root.working_dir.clone());
        }

        let mut composed = root.clone();
        self.resolve(&mut composed, &mut resolution)?;
        *root = composed;
        Ok(())
    }

    fn resolve(&self, project: &mut ProjectDescriptor, resolution: &mut Resolution) -> Result<()> {
        let mut folded = FxHashSet::default();

        for entry in project.related_projects.clone() {
            let dir = project.working_dir.join(&entry);
            info!(dir = %entry.display(), "processing related project");

            let mut related = self
                .loader
                .load(&dir)
                .and_then(|p| p.validate().map(|_| p))
                .map_err(|source| BuildError::RelatedProjectLoad {
                    dir: dir.clone(),
                    source: Box::new(source),
                })?;
            related.is_root = false;

            let key = related.working_dir.clone();
            if resolution.stack.contains(&key) {
                let mut chain = resolution.stack.clone();
                chain.push(key);
                return Err(BuildError::RelatedProjectCycle(chain));
            }
            if !folded.insert(key.clone()) {
                debug!(dir = %key.display(), "related project listed twice, skipping");
                continue;
            }
            resolution.claim_tag(&related)?;

            resolution.stack.push(key);
            self.resolve(&mut related, resolution)?;
            resolution.stack.pop();

            fold_into(project, &entry, &related);
        }

        Ok(())
    }
}

/// Copy what `related` (found at `entry`, relative to `parent`) contributes
/// to the parent's build.
fn fold_into(parent: &mut ProjectDescriptor, entry: &Path, related: &ProjectDescriptor) {
    for dir in &related.include_dirs {
        parent.include_dirs.push(reroot(entry, dir));
    }

    if let Ok(Target::Library(name)) = related.target() {
        let ext = related.toolchain.shared_library_extension();
        add_link(
            parent,
            RelatedLink {
                name: link_name(&name, ext),
                lib_dir: join_rel(entry, &related.output_dir),
                runtime_dir: related.absolute_output_dir(),
            },
        );
    }

    // Libraries the related project itself links against.
    for link in &related.related_links {
        add_link(
            parent,
            RelatedLink {
                name: link.name.clone(),
                lib_dir: reroot(entry, &link.lib_dir),
                runtime_dir: link.runtime_dir.clone(),
            },
        );
    }
}

fn add_link(parent: &mut ProjectDescriptor, link: RelatedLink) {
    if parent
        .related_links
        .iter()
        .any(|l| l.runtime_dir == link.runtime_dir)
    {
        return;
    }

    parent.libraries.push(link.name.clone());
    parent.lib_dirs.push(link.lib_dir.clone());
    parent.link_flags.push("-Wl,-rpath".to_string());
    parent
        .link_flags
        .push(format!("-Wl,{}", link.runtime_dir.display()));
    parent.related_links.push(link);
}

fn reroot(entry: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        join_rel(entry, dir)
    }
}
