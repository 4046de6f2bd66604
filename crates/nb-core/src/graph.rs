//! Narrow interface onto the bundler's module dependency graph.
//!
//! The dev server keeps a live graph mapping file paths to in-memory module
//! records. The bridge only ever needs three operations from it: invalidate
//! the nodes backed by a file, look a node up by id, and ask connected
//! clients to fully reload. Everything else (edges, HMR propagation,
//! transform caching) stays on the bundler's side of the seam.

use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier of a module node in the dev server's graph.
///
/// Ids are the bundler's own notion of a module key, usually a
/// project-relative or absolute file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A module record as seen through the graph interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    /// Graph identifier for the module
    pub id: ModuleId,
    /// Absolute path of the backing file
    pub file: PathBuf,
}

impl ModuleNode {
    pub fn new(id: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            id: ModuleId::new(id),
            file: file.into(),
        }
    }
}

/// Consumed interface of the dev server's module graph.
///
/// Implementations are provided by the host bundler. All methods are
/// synchronous: graph mutation happens within one cooperative turn of the
/// dev server's event loop.
pub trait ModuleGraph: Send + Sync {
    /// Invalidate every module node backed by `path`.
    ///
    /// Returns the ids of the affected nodes, which may be empty when the
    /// file is not part of the graph.
    fn invalidate_by_file(&self, path: &Path) -> Vec<ModuleId>;

    /// Look up a module node by its graph id.
    fn module_by_id(&self, id: &str) -> Option<ModuleNode>;

    /// Ask all connected clients to perform a full page reload.
    fn broadcast_full_reload(&self);
}
