//! # nb-annotate
//!
//! Injects a `data-nb-component` attribute carrying the file's
//! project-relative path into the root rendered element of a component, so
//! browser devtools can map DOM nodes back to source files.
//!
//! Two source formats are handled:
//!
//! - **Function components** (`.jsx`/`.tsx`): the file is parsed with OXC,
//!   the default-exported component function is located, and the attribute
//!   is inserted into the opening tag of the first returned element. Code
//!   and a source map are re-emitted.
//! - **Template components** (`.vue`): the `<template>` section is located
//!   textually and the attribute is spliced into the first top-level opening
//!   tag. No source map on this path.
//!
//! The transform is strictly best-effort: files that fail to parse, return
//! fragments, or have no recognizable component shape pass through
//! unchanged. A transform failure never breaks the build.

mod jsx;
mod template;

use nb_core::{DevPlugin, TransformOutput};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Name of the injected attribute.
pub const COMPONENT_PATH_ATTR: &str = "data-nb-component";

/// Path segments that disqualify a file from annotation.
const EXCLUDED_SEGMENTS: [&str; 2] = ["node_modules", "vendor"];

/// Extensions handled by the function-component path.
const FUNCTION_COMPONENT_EXTENSIONS: [&str; 2] = ["jsx", "tsx"];

/// Extension handled by the template-component path.
const TEMPLATE_COMPONENT_EXTENSION: &str = "vue";

/// Annotator options, taken from the resolved `componentPath` configuration.
#[derive(Debug, Clone)]
pub struct AnnotatorOptions {
    /// Root the injected path is computed relative to
    pub project_root: PathBuf,
    /// Keep the file extension in the injected value
    pub include_extension: bool,
    /// Log every annotated file
    pub verbose: bool,
}

impl AnnotatorOptions {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            include_extension: true,
            verbose: false,
        }
    }
}

/// The component path annotator.
#[derive(Debug, Clone)]
pub struct Annotator {
    options: AnnotatorOptions,
}

impl Annotator {
    pub fn new(options: AnnotatorOptions) -> Self {
        Self { options }
    }

    /// Check whether `file` is a candidate for annotation.
    ///
    /// Eligibility is purely path-based: a supported extension outside any
    /// dependency/vendor directory. File content never matters here.
    pub fn is_eligible(&self, file: &Path) -> bool {
        let Some(ext) = extension(file) else {
            return false;
        };
        if !FUNCTION_COMPONENT_EXTENSIONS.contains(&ext) && ext != TEMPLATE_COMPONENT_EXTENSION {
            return false;
        }
        !file.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|s| EXCLUDED_SEGMENTS.contains(&s))
        })
    }

    /// Annotate `source`, returning `None` when the file is left unchanged.
    pub fn annotate(&self, source: &str, file: &Path) -> Option<TransformOutput> {
        if !self.is_eligible(file) {
            return None;
        }

        let value = self.component_path_value(file);
        let result = match extension(file) {
            Some(TEMPLATE_COMPONENT_EXTENSION) => {
                template::annotate_template(source, &escape_attribute_value(&value))
                    .map(TransformOutput::new)
            }
            _ => jsx::annotate_function_component(source, file, &value),
        };

        if result.is_some() && self.options.verbose {
            tracing::info!("Annotated component {} -> {}", file.display(), value);
        }
        result
    }

    /// Compute the attribute value for `file`: project-relative, forward
    /// slashes, extension kept or stripped per configuration.
    pub fn component_path_value(&self, file: &Path) -> String {
        let relative = file
            .strip_prefix(&self.options.project_root)
            .unwrap_or(file);
        let relative = if self.options.include_extension {
            relative.to_path_buf()
        } else {
            relative.with_extension("")
        };
        relative.to_string_lossy().replace('\\', "/")
    }
}

impl DevPlugin for Annotator {
    fn name(&self) -> Cow<'static, str> {
        "nb-component-path".into()
    }

    fn on_transform(&self, code: &str, id: &Path) -> anyhow::Result<Option<TransformOutput>> {
        Ok(self.annotate(code, id))
    }
}

fn extension(file: &Path) -> Option<&str> {
    file.extension().and_then(|e| e.to_str())
}

/// HTML-entity-escape quotes so the value can sit inside a double-quoted
/// template attribute.
fn escape_attribute_value(value: &str) -> String {
    value.replace('"', "&quot;").replace('\'', "&#39;")
}
