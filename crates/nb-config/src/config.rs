//! Plugin configuration: partial user input, recognized defaults, and the
//! resolved immutable form.

use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};

/// The environment the dev server is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Detect the environment from `NB_ENV`, defaulting to development.
    pub fn detect() -> Self {
        match std::env::var("NB_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// TLS-detection mode for composing the dev-server origin.
///
/// Accepted config values: `false` (off), `true` (auto-detect from the local
/// certificate store), or a host name to always serve TLS for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TlsDetection {
    #[default]
    Off,
    Auto,
    Host(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TlsRepr {
    Flag(bool),
    Host(String),
}

impl Serialize for TlsDetection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let repr = match self {
            TlsDetection::Off => TlsRepr::Flag(false),
            TlsDetection::Auto => TlsRepr::Flag(true),
            TlsDetection::Host(h) => TlsRepr::Host(h.clone()),
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TlsDetection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match TlsRepr::deserialize(deserializer)? {
            TlsRepr::Flag(false) => TlsDetection::Off,
            TlsRepr::Flag(true) => TlsDetection::Auto,
            TlsRepr::Host(h) => TlsDetection::Host(h),
        })
    }
}

/// SSR development bridge settings (resolved).
///
/// When `enabled` is true all four remaining fields are populated, defaulted
/// where the user left them out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SsrDevConfig {
    pub enabled: bool,
    /// Render endpoint path
    pub path: String,
    /// Health endpoint path
    pub health_path: String,
    /// SSR entry point, relative to the project root
    pub entry_point: String,
    /// SSR-specific hot marker file
    pub hot_file: PathBuf,
}

impl Default for SsrDevConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "/ssr".to_string(),
            health_path: "/ssr-health".to_string(),
            entry_point: "./js/ssr_dev.ts".to_string(),
            hot_file: PathBuf::from("storage/nb-ssr.hot"),
        }
    }
}

/// Component path-annotation settings (resolved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentPathConfig {
    pub enabled: bool,
    /// Root the injected path is made relative to; defaults to the project root
    pub root: Option<PathBuf>,
    pub include_extension: bool,
    pub verbose: bool,
}

/// Router-watcher settings (resolved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutesConfig {
    /// Glob patterns for backend route-definition files; empty disables the
    /// watcher
    pub router_path: Vec<String>,
    /// Debounce window in milliseconds
    pub debounce_ms: u64,
    /// External regeneration command, run through the shell
    pub command: Option<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            router_path: Vec::new(),
            debounce_ms: 300,
            command: None,
        }
    }
}

/// Resolved plugin configuration. Immutable after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    /// Entry-point input paths, relative to the project root
    pub input: Vec<String>,
    pub public_directory: String,
    pub build_directory: String,
    /// Marker file signaling dev-server availability
    pub hot_file: PathBuf,
    pub manifest: PathBuf,
    pub ssr_dev: SsrDevConfig,
    pub component_path: ComponentPathConfig,
    pub nb_routes: RoutesConfig,
    /// Full-reload glob patterns, handed to the host's reload plugin
    pub refresh: Vec<String>,
    pub detect_tls: TlsDetection,
}

/// User-supplied partial configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialPluginConfig {
    pub input: Vec<String>,
    pub public_directory: Option<String>,
    pub build_directory: Option<String>,
    pub hot_file: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub ssr_dev: PartialSsrDevConfig,
    pub component_path: PartialComponentPathConfig,
    pub nb_routes: PartialRoutesConfig,
    pub refresh: Vec<String>,
    pub detect_tls: Option<TlsDetection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialSsrDevConfig {
    pub enabled: Option<bool>,
    pub path: Option<String>,
    pub health_path: Option<String>,
    pub entry_point: Option<String>,
    pub hot_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialComponentPathConfig {
    pub enabled: Option<bool>,
    pub root: Option<PathBuf>,
    pub include_extension: Option<bool>,
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialRoutesConfig {
    pub router_path: Vec<String>,
    pub debounce: Option<u64>,
    pub command: Option<String>,
}

impl PluginConfig {
    /// Resolve a partial configuration against the recognized defaults.
    ///
    /// # Errors
    ///
    /// Startup-fatal [`ConfigError`]s for a missing `input`, unusable
    /// directory values, or router patterns without a command.
    pub fn resolve(partial: PartialPluginConfig, environment: Environment) -> Result<Self> {
        if partial.input.is_empty() {
            return Err(ConfigError::MissingField {
                field: "input".to_string(),
                hint: "Provide at least one entry point, e.g. [\"js/app.tsx\"]".to_string(),
            });
        }

        let public_directory = partial
            .public_directory
            .unwrap_or_else(|| "public".to_string());
        validate_directory("publicDirectory", &public_directory)?;

        let build_directory = partial
            .build_directory
            .unwrap_or_else(|| "build".to_string());
        validate_directory("buildDirectory", &build_directory)?;

        let hot_file = partial
            .hot_file
            .unwrap_or_else(|| PathBuf::from(format!("{public_directory}/hot")));
        let manifest = partial.manifest.unwrap_or_else(|| {
            PathBuf::from(format!(
                "{public_directory}/{build_directory}/manifest.json"
            ))
        });

        let ssr = partial.ssr_dev;
        let ssr_defaults = SsrDevConfig::default();
        let ssr_dev = SsrDevConfig {
            enabled: ssr.enabled.unwrap_or(ssr_defaults.enabled),
            path: ssr.path.unwrap_or(ssr_defaults.path),
            health_path: ssr.health_path.unwrap_or(ssr_defaults.health_path),
            entry_point: ssr.entry_point.unwrap_or(ssr_defaults.entry_point),
            hot_file: ssr.hot_file.unwrap_or(ssr_defaults.hot_file),
        };
        validate_endpoint_path("ssrDev.path", &ssr_dev.path)?;
        validate_endpoint_path("ssrDev.healthPath", &ssr_dev.health_path)?;

        let cp = partial.component_path;
        let component_path = ComponentPathConfig {
            // On by default in development only; an explicit value always wins.
            enabled: cp.enabled.unwrap_or(environment.is_development()),
            root: cp.root,
            include_extension: cp.include_extension.unwrap_or(true),
            verbose: cp.verbose.unwrap_or(false),
        };

        let routes = partial.nb_routes;
        if !routes.router_path.is_empty() && routes.command.is_none() {
            return Err(ConfigError::MissingField {
                field: "nbRoutes.command".to_string(),
                hint: "Set the regeneration command to run when route files change".to_string(),
            });
        }
        let nb_routes = RoutesConfig {
            router_path: routes.router_path,
            debounce_ms: routes.debounce.unwrap_or(300),
            command: routes.command,
        };

        Ok(Self {
            input: partial.input,
            public_directory,
            build_directory,
            hot_file,
            manifest,
            ssr_dev,
            component_path,
            nb_routes,
            refresh: partial.refresh,
            detect_tls: partial.detect_tls.unwrap_or_default(),
        })
    }

    /// Load configuration from layered sources and resolve it.
    ///
    /// Priority: `NB_*` environment variables > `nb.config.json` under
    /// `root` > defaults.
    pub fn load(root: &Path, environment: Environment) -> Result<Self> {
        let mut figment =
            Figment::new().merge(Serialized::defaults(PartialPluginConfig::default()));

        let config_file = root.join("nb.config.json");
        if config_file.exists() {
            tracing::debug!("Merging configuration from {}", config_file.display());
            figment = figment.merge(Json::file(config_file));
        }

        figment = figment.merge(Env::prefixed("NB_").split("_"));

        let partial: PartialPluginConfig = figment.extract().map_err(|e| {
            ConfigError::InvalidValue {
                field: "configuration".to_string(),
                value: e.to_string(),
                hint: "Check nb.config.json syntax and field types".to_string(),
            }
        })?;

        Self::resolve(partial, environment)
    }
}

/// Endpoint paths are mounted into the dev server's router and must be
/// absolute.
fn validate_endpoint_path(field: &str, value: &str) -> Result<()> {
    if !value.starts_with('/') {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            hint: "Endpoint paths must start with '/'".to_string(),
        });
    }
    Ok(())
}

/// Directory names must stay relative and inside the project.
fn validate_directory(field: &str, value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value.starts_with('/')
        || value.starts_with('\\')
        || value.split(['/', '\\']).any(|seg| seg == "..");
    if invalid {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            hint: "Use a relative directory name without '..' segments".to_string(),
        });
    }
    Ok(())
}
