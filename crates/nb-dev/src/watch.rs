//! File system watcher for the dev server.
//!
//! Watches the project directory recursively and forwards relevant change
//! events through a channel. The shell's event loop fans each event out to
//! the SSR bridge and the router watcher. Build artifacts, dependency
//! directories, and hidden files are filtered here so downstream consumers
//! only ever see project sources.

use crate::error::Result;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// File change event type.
#[derive(Debug, Clone)]
pub enum FileChange {
    /// File was modified
    Modified(PathBuf),
    /// File was created
    Created(PathBuf),
    /// File was removed
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Recursive watcher with per-file debouncing and filtering.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Watch `root` recursively.
    ///
    /// `ignore_dirs` are directory names skipped anywhere in the tree
    /// (the build output directory belongs here). `debounce_ms` suppresses
    /// repeated events for the same file inside the window.
    pub fn new(
        root: PathBuf,
        ignore_dirs: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        let (tx, rx) = mpsc::channel(100);

        let debounce = Duration::from_millis(debounce_ms);
        let mut last_event: Option<(PathBuf, Instant)> = None;
        let ignore = ignore_dirs.clone();
        let watch_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                for path in &event.paths {
                    if Self::should_ignore(path, &watch_root, &ignore) {
                        continue;
                    }

                    let now = Instant::now();
                    if let Some((last_path, last_time)) = &last_event {
                        if last_path == path && now.duration_since(*last_time) < debounce {
                            continue;
                        }
                    }
                    last_event = Some((path.clone(), now));

                    let change = match event.kind {
                        notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                        notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                        notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                        _ => continue,
                    };

                    let _ = tx.blocking_send(change);
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    fn should_ignore(path: &Path, root: &Path, ignore_dirs: &[String]) -> bool {
        if !path.starts_with(root) {
            return true;
        }
        let rel = match path.strip_prefix(root) {
            Ok(p) => p,
            Err(_) => return true,
        };

        for component in rel.components() {
            let Some(name) = component.as_os_str().to_str() else {
                return true;
            };
            if name == "node_modules" || name == "vendor" {
                return true;
            }
            if ignore_dirs.iter().any(|d| d == name) {
                return true;
            }
            // Hidden files and directories
            if name.starts_with('.') && name != "." && name != ".." {
                return true;
            }
        }

        false
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
