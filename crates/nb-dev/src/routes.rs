//! Router-change watcher.
//!
//! Backend route definitions feed a generated frontend routing helper
//! (`routes.js`). When a route file changes, the configured external command
//! regenerates that helper; afterwards the helper's module-graph node is
//! invalidated and connected clients are asked to fully reload.
//!
//! Triggers are debounced, and at most one regeneration command runs at a
//! time: a trigger firing while one is in flight is dropped, not queued, so
//! rapid edits cannot stack up external processes.

use crate::error::{DevError, Result};
use nb_core::ModuleGraph;
use nb_config::RoutesConfig;
use parking_lot::Mutex;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Relative forms the generated routes helper may appear under in the graph.
const ARTIFACT_CANDIDATES: [&str; 2] = ["js/routes.js", "routes.js"];

/// Debounced watcher over backend route-definition files.
pub struct RouterWatcher {
    patterns: Vec<Regex>,
    debounce: Duration,
    command: String,
    root: PathBuf,
    graph: Arc<dyn ModuleGraph>,
    timer: Mutex<Option<JoinHandle<()>>>,
    in_progress: AtomicBool,
}

impl RouterWatcher {
    /// Build a watcher from the resolved routes configuration.
    ///
    /// Returns `None` when no route patterns are configured. A missing
    /// command with patterns present is rejected earlier, at config
    /// resolution.
    pub fn new(
        config: &RoutesConfig,
        root: PathBuf,
        graph: Arc<dyn ModuleGraph>,
    ) -> Result<Option<Arc<Self>>> {
        if config.router_path.is_empty() {
            return Ok(None);
        }
        let command = config.command.clone().unwrap_or_default();

        let patterns = config
            .router_path
            .iter()
            .map(|p| compile_route_pattern(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Arc::new(Self {
            patterns,
            debounce: Duration::from_millis(config.debounce_ms),
            command,
            root,
            graph,
            timer: Mutex::new(None),
            in_progress: AtomicBool::new(false),
        })))
    }

    /// Does `path` match any configured route pattern?
    ///
    /// Patterns match against the project-relative path with forward
    /// slashes; a path outside the project never matches.
    pub fn matches(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        self.patterns.iter().any(|p| p.is_match(&rel))
    }

    /// Feed a file-change event; schedules a debounced regeneration when it
    /// matches. Every matching event resets the timer.
    pub fn handle_change(self: &Arc<Self>, path: &Path) {
        if !self.matches(path) {
            return;
        }
        tracing::debug!("Route file changed: {}", path.display());

        let watcher = Arc::clone(self);
        let mut timer = self.timer.lock();
        if let Some(pending) = timer.take() {
            pending.abort();
        }
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(watcher.debounce).await;
            watcher.regenerate().await;
        }));
    }

    /// Run the external regeneration command.
    ///
    /// Dropped with a log line when a command is already in flight. On exit
    /// code 0 the generated helper is invalidated (when present in the
    /// graph) and a full reload is broadcast regardless (fail open). On a
    /// nonzero exit or spawn error nothing is broadcast.
    pub async fn regenerate(&self) {
        if self.in_progress.swap(true, Ordering::SeqCst) {
            tracing::info!("Route regeneration already running, dropping trigger");
            return;
        }

        tracing::info!("Regenerating routes: {}", self.command);
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(&self.root)
            .status()
            .await;

        match status {
            Ok(status) if status.success() => {
                self.invalidate_generated_module();
                self.graph.broadcast_full_reload();
            }
            Ok(status) => {
                tracing::warn!("Route regeneration command failed with {status}");
            }
            Err(e) => {
                tracing::warn!("Failed to run route regeneration command: {e}");
            }
        }

        self.in_progress.store(false, Ordering::SeqCst);
    }

    fn invalidate_generated_module(&self) {
        for candidate in self.artifact_candidates() {
            if self.graph.module_by_id(&candidate).is_some() {
                self.graph.invalidate_by_file(Path::new(&candidate));
                return;
            }
        }
        tracing::debug!("Generated routes module not in graph, broadcasting reload anyway");
    }

    fn artifact_candidates(&self) -> Vec<String> {
        let mut candidates = Vec::with_capacity(ARTIFACT_CANDIDATES.len() * 2);
        for relative in ARTIFACT_CANDIDATES {
            candidates.push(relative.to_string());
            candidates.push(self.root.join(relative).to_string_lossy().into_owned());
        }
        candidates
    }
}

/// Compile a reduced glob: `*` matches within one path segment, `**` matches
/// across segments, anchored at both ends.
pub fn compile_route_pattern(pattern: &str) -> Result<Regex> {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                regex.push_str(".*");
            } else {
                regex.push_str("[^/]*");
            }
        } else {
            regex.push_str(&regex::escape(&c.to_string()));
        }
    }
    regex.push('$');

    Regex::new(&regex).map_err(|e| DevError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nb_core::{ModuleId, ModuleNode};
    use parking_lot::Mutex as PlMutex;

    struct RecordingGraph {
        invalidated: PlMutex<Vec<PathBuf>>,
        reload_count: PlMutex<usize>,
        known: Vec<String>,
    }

    impl RecordingGraph {
        fn new(known: Vec<String>) -> Self {
            Self {
                invalidated: PlMutex::new(Vec::new()),
                reload_count: PlMutex::new(0),
                known,
            }
        }

        fn reloaded(&self) -> bool {
            *self.reload_count.lock() > 0
        }
    }

    impl ModuleGraph for RecordingGraph {
        fn invalidate_by_file(&self, path: &Path) -> Vec<ModuleId> {
            self.invalidated.lock().push(path.to_path_buf());
            vec![ModuleId::new(path.to_string_lossy())]
        }

        fn module_by_id(&self, id: &str) -> Option<ModuleNode> {
            self.known
                .iter()
                .any(|k| k == id)
                .then(|| ModuleNode::new(id, id))
        }

        fn broadcast_full_reload(&self) {
            *self.reload_count.lock() += 1;
        }
    }

    fn watcher_with(
        command: &str,
        debounce_ms: u64,
        graph: Arc<RecordingGraph>,
        root: &Path,
    ) -> Arc<RouterWatcher> {
        let config = RoutesConfig {
            router_path: vec!["config/routes.rb".to_string(), "config/routes/**".to_string()],
            debounce_ms,
            command: Some(command.to_string()),
        };
        RouterWatcher::new(&config, root.to_path_buf(), graph)
            .unwrap()
            .expect("patterns configured")
    }

    #[test]
    fn reduced_glob_semantics() {
        let single = compile_route_pattern("config/routes/*.rb").unwrap();
        assert!(single.is_match("config/routes/admin.rb"));
        assert!(!single.is_match("config/routes/nested/admin.rb"));
        assert!(!single.is_match("prefix/config/routes/admin.rb"));

        let double = compile_route_pattern("config/**").unwrap();
        assert!(double.is_match("config/routes.rb"));
        assert!(double.is_match("config/routes/nested/deep.rb"));
        assert!(!double.is_match("app/config-like"));

        let literal = compile_route_pattern("config/routes.rb").unwrap();
        assert!(literal.is_match("config/routes.rb"));
        // The dot is literal, not a wildcard.
        assert!(!literal.is_match("config/routesXrb"));
    }

    #[test]
    fn empty_pattern_list_disables_the_watcher() {
        let config = RoutesConfig {
            router_path: vec![],
            debounce_ms: 300,
            command: None,
        };
        let graph = Arc::new(RecordingGraph::new(vec![]));
        assert!(RouterWatcher::new(&config, PathBuf::from("/srv/app"), graph)
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn five_changes_in_the_window_run_one_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("runs.log");
        let command = format!("echo run >> {}", marker.display());

        let graph = Arc::new(RecordingGraph::new(vec![]));
        let watcher = watcher_with(&command, 50, Arc::clone(&graph), dir.path());

        let route_file = dir.path().join("config/routes.rb");
        for _ in 0..5 {
            watcher.handle_change(&route_file);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        tokio::time::sleep(Duration::from_millis(300)).await;

        let runs = std::fs::read_to_string(&marker).unwrap_or_default();
        assert_eq!(runs.lines().count(), 1);
        assert_eq!(*graph.reload_count.lock(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn in_flight_regeneration_drops_new_triggers() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("runs.log");
        let command = format!("sleep 0.2 && echo run >> {}", marker.display());

        let graph = Arc::new(RecordingGraph::new(vec![]));
        let watcher = watcher_with(&command, 10, Arc::clone(&graph), dir.path());

        let first = {
            let watcher = Arc::clone(&watcher);
            tokio::spawn(async move { watcher.regenerate().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Arrives while the first command is still running: dropped.
        watcher.regenerate().await;
        first.await.unwrap();

        let runs = std::fs::read_to_string(&marker).unwrap_or_default();
        assert_eq!(runs.lines().count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn success_invalidates_known_artifact_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let graph = Arc::new(RecordingGraph::new(vec!["js/routes.js".to_string()]));
        let watcher = watcher_with("true", 10, Arc::clone(&graph), dir.path());

        watcher.regenerate().await;

        let invalidated = graph.invalidated.lock().clone();
        assert_eq!(invalidated, vec![PathBuf::from("js/routes.js")]);
        assert!(graph.reloaded());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_artifact_still_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let graph = Arc::new(RecordingGraph::new(vec![]));
        let watcher = watcher_with("true", 10, Arc::clone(&graph), dir.path());

        watcher.regenerate().await;

        assert!(graph.invalidated.lock().is_empty());
        assert!(graph.reloaded());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_commands_do_not_reload() {
        let dir = tempfile::tempdir().unwrap();
        let graph = Arc::new(RecordingGraph::new(vec![]));
        let watcher = watcher_with("false", 10, Arc::clone(&graph), dir.path());

        watcher.regenerate().await;

        assert!(!graph.reloaded());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_matching_paths_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("runs.log");
        let command = format!("echo run >> {}", marker.display());

        let graph = Arc::new(RecordingGraph::new(vec![]));
        let watcher = watcher_with(&command, 10, Arc::clone(&graph), dir.path());

        watcher.handle_change(&dir.path().join("app/models/user.rb"));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!marker.exists());
    }
}
