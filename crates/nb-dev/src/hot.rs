//! Hot marker files.
//!
//! The backend framework decides whether to proxy asset requests to the dev
//! server by checking for a marker file whose content is the dev server's
//! reachable URL. The SSR bridge gets its own marker with the render
//! sub-path appended.
//!
//! Ownership is scoped: one [`HotFiles`] value is acquired per server start,
//! writes the markers when the server is listening, and guarantees removal
//! on every exit path: normal shutdown via `Drop`, termination signals via
//! [`HotFiles::install_signal_cleanup`]. Cleanup is best-effort; failures
//! are logged, never raised.

use crate::error::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct HotFileEntry {
    path: PathBuf,
    /// Appended to the origin in this marker's content
    sub_path: Option<String>,
}

/// Scoped owner of the dev server's marker files.
pub struct HotFiles {
    entries: Vec<HotFileEntry>,
    signal_installed: AtomicBool,
}

impl HotFiles {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            signal_installed: AtomicBool::new(false),
        }
    }

    /// Add a marker whose content is the bare origin.
    pub fn add(mut self, path: PathBuf) -> Self {
        self.entries.push(HotFileEntry {
            path,
            sub_path: None,
        });
        self
    }

    /// Add a marker whose content is the origin with `sub_path` appended.
    pub fn add_with_sub_path(mut self, path: PathBuf, sub_path: impl Into<String>) -> Self {
        self.entries.push(HotFileEntry {
            path,
            sub_path: Some(sub_path.into()),
        });
        self
    }

    /// Write every marker with the live origin. Called once the server is
    /// listening.
    pub fn write(&self, origin: &str) -> Result<()> {
        for entry in &self.entries {
            if let Some(parent) = entry.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = match &entry.sub_path {
                Some(sub) => format!("{origin}{sub}"),
                None => origin.to_string(),
            };
            std::fs::write(&entry.path, content)?;
            tracing::debug!("Wrote hot file {}", entry.path.display());
        }
        Ok(())
    }

    /// Remove every marker, best-effort.
    pub fn remove(&self) {
        for entry in &self.entries {
            if !entry.path.exists() {
                continue;
            }
            if let Err(e) = std::fs::remove_file(&entry.path) {
                tracing::warn!("Failed to remove hot file {}: {e}", entry.path.display());
            }
        }
    }

    /// Remove the markers when the process receives a termination signal.
    ///
    /// Installed at most once per acquisition; calling again is a no-op.
    pub fn install_signal_cleanup(self: &Arc<Self>) {
        if self.signal_installed.swap(true, Ordering::SeqCst) {
            return;
        }
        let hot = Arc::clone(self);
        tokio::spawn(async move {
            wait_for_termination().await;
            hot.remove();
        });
    }
}

impl Default for HotFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HotFiles {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_records_origin_and_sub_path() {
        let dir = tempfile::tempdir().unwrap();
        let hot = HotFiles::new()
            .add(dir.path().join("public/hot"))
            .add_with_sub_path(dir.path().join("storage/nb-ssr.hot"), "/ssr");

        hot.write("http://127.0.0.1:5173").unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("public/hot")).unwrap(),
            "http://127.0.0.1:5173"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("storage/nb-ssr.hot")).unwrap(),
            "http://127.0.0.1:5173/ssr"
        );
    }

    #[test]
    fn remove_deletes_written_markers() {
        let dir = tempfile::tempdir().unwrap();
        let hot = HotFiles::new().add(dir.path().join("hot"));
        hot.write("http://127.0.0.1:5173").unwrap();
        assert!(dir.path().join("hot").exists());

        hot.remove();
        assert!(!dir.path().join("hot").exists());

        // Removing again stays quiet.
        hot.remove();
    }

    #[test]
    fn drop_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("hot");
        {
            let hot = HotFiles::new().add(marker.clone());
            hot.write("http://127.0.0.1:5173").unwrap();
            assert!(marker.exists());
        }
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn signal_cleanup_installs_once() {
        let hot = Arc::new(HotFiles::new());
        hot.install_signal_cleanup();
        hot.install_signal_cleanup();
        assert!(hot.signal_installed.load(Ordering::SeqCst));
    }
}
