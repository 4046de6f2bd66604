//! Dev-server URL placeholder rewriting.
//!
//! Code served in development refers to the dev server through a fixed
//! placeholder origin; once the server is listening the placeholder is
//! rewritten to the live origin. Until the origin is known the plugin
//! passes everything through.

use nb_core::{DevPlugin, ServerInfo, TransformOutput};
use parking_lot::RwLock;
use std::borrow::Cow;
use std::path::Path;

/// Placeholder origin baked into served code.
pub const DEV_SERVER_PLACEHOLDER: &str = "http://__nb_dev_server__";

/// Replace every placeholder occurrence with `origin`.
///
/// Returns `None` when the code contains no placeholder.
pub fn rewrite_dev_server_urls(code: &str, origin: &str) -> Option<String> {
    if !code.contains(DEV_SERVER_PLACEHOLDER) {
        return None;
    }
    Some(code.replace(DEV_SERVER_PLACEHOLDER, origin))
}

/// Transform plugin rewriting placeholder URLs in served code.
#[derive(Default)]
pub struct DevServerUrlPlugin {
    origin: RwLock<Option<String>>,
}

impl DevServerUrlPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DevPlugin for DevServerUrlPlugin {
    fn name(&self) -> Cow<'static, str> {
        "nb-dev-server-url".into()
    }

    fn on_server_start(&self, server: &ServerInfo) {
        *self.origin.write() = Some(server.origin.clone());
    }

    fn on_transform(&self, code: &str, _id: &Path) -> anyhow::Result<Option<TransformOutput>> {
        let origin = self.origin.read().clone();
        Ok(origin
            .and_then(|origin| rewrite_dev_server_urls(code, &origin))
            .map(TransformOutput::new))
    }
}
