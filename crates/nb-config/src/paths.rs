//! Absolute paths derived from a resolved configuration.

use crate::config::PluginConfig;
use nb_core::ResolveContext;
use std::path::{Path, PathBuf};

/// Build input/output paths computed once per dev-server instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Project root everything below is anchored to
    pub root: PathBuf,
    /// Absolute entry-point inputs
    pub inputs: Vec<PathBuf>,
    /// Absolute public directory
    pub public_dir: PathBuf,
    /// Absolute build output directory (`public/<build>`)
    pub out_dir: PathBuf,
    /// Absolute dev-server hot marker file
    pub hot_file: PathBuf,
    /// Absolute SSR hot marker file
    pub ssr_hot_file: PathBuf,
    /// Absolute manifest path
    pub manifest: PathBuf,
    /// Absolute SSR entry point
    pub ssr_entry: PathBuf,
}

impl ResolvedPaths {
    pub fn compute(config: &PluginConfig, root: &Path) -> Self {
        let public_dir = root.join(&config.public_directory);
        let out_dir = public_dir.join(&config.build_directory);

        Self {
            root: root.to_path_buf(),
            inputs: config.input.iter().map(|i| absolutize(root, i)).collect(),
            public_dir,
            out_dir,
            hot_file: absolutize(root, &config.hot_file),
            ssr_hot_file: absolutize(root, &config.ssr_dev.hot_file),
            manifest: absolutize(root, &config.manifest),
            ssr_entry: absolutize(root, &config.ssr_dev.entry_point),
        }
    }

    pub fn resolve_context(&self) -> ResolveContext {
        ResolveContext {
            root: self.root.clone(),
            out_dir: self.out_dir.clone(),
        }
    }
}

fn absolutize(root: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        // Normalize a leading "./" so joined paths compare cleanly.
        let trimmed = path.strip_prefix(".").unwrap_or(path);
        root.join(trimmed)
    }
}
