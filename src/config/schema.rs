//! Configuration schema and defaults.
//!
//! Defines the TOML-serializable configuration with all sections:
//! `[portal]`, `[credentials]`, `[query]`, `[layers.alerts]`,
//! `[layers.congestion]`, and `[logging]`.
//!
//! Every field has a built-in default pointing at the public observatory
//! deployment, so a fresh install only needs credentials to work.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::gis::query::{DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_MS};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration. Maps directly to the `~/.transito/config.toml`
/// and `.transito.toml` file schemas. All sections and fields are optional;
/// missing values fall back to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitoConfig {
    pub portal: PortalConfig,
    pub credentials: CredentialsConfig,
    pub query: QueryConfig,
    pub layers: LayersConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [portal]
// ---------------------------------------------------------------------------

/// Portal base URL and the referer sent with token requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Portal root, without the `/sharing/rest/...` suffix.
    pub url: String,
    /// Referer form field for `generateToken`. The portal binds the token
    /// to it, so it must match what query requests present.
    pub referer: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: "https://observatorio.infraestrutura.mg.gov.br/portal".to_string(),
            referer: "https://observatorio.infraestrutura.mg.gov.br/portal".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [credentials]
// ---------------------------------------------------------------------------

/// Portal credentials. Empty by default; set them here or, preferably for
/// secrets, via `TRANSITO_USER` / `TRANSITO_PASSWORD`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub user: String,
    pub password: String,
}

// ---------------------------------------------------------------------------
// [query]
// ---------------------------------------------------------------------------

/// Paging and timeout knobs shared by every layer fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Records per page request.
    pub page_size: u32,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
    /// Maximum page requests per fetch before the fetch is declared
    /// runaway and aborted.
    pub max_pages: u32,
    /// Ask the service for geometry alongside attributes.
    pub return_geometry: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_pages: DEFAULT_MAX_PAGES,
            return_geometry: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [layers.*]
// ---------------------------------------------------------------------------

/// One feature layer endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Layer URL ending in `/FeatureServer/<index>`.
    pub url: String,
}

/// The published layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayersConfig {
    pub alerts: LayerConfig,
    pub congestion: LayerConfig,
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            alerts: LayerConfig {
                url: "https://observatorio.infraestrutura.mg.gov.br/server/rest/services/00_PUBLICACOES/waze_alertas_transito/FeatureServer/0".to_string(),
            },
            congestion: LayerConfig {
                url: "https://observatorio.infraestrutura.mg.gov.br/server/rest/services/00_PUBLICACOES/waze_congestionamento/FeatureServer/0".to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Fetch log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether fetch logging is enabled.
    pub enabled: bool,
    /// Path to the fetch log file. `~` is expanded to the home directory.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.transito/fetch-log.jsonl".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A feature-layer URL: anything ending in `/FeatureServer/<index>`.
static LAYER_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/FeatureServer/\d+/?$").expect("layer URL regex must compile"));

/// Whether a URL points at a concrete feature layer (not the service root).
pub fn is_feature_layer_url(url: &str) -> bool {
    LAYER_URL_RE.is_match(url)
}

impl TransitoConfig {
    /// Collect configuration problems worth surfacing before a fetch.
    /// Empty means the config is usable (credentials are checked
    /// separately, since health wants to report them on their own line).
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.portal.url.trim().is_empty() {
            problems.push("portal.url is empty".to_string());
        }
        for (name, layer) in [
            ("layers.alerts", &self.layers.alerts),
            ("layers.congestion", &self.layers.congestion),
        ] {
            if layer.url.trim().is_empty() {
                problems.push(format!("{name}.url is empty"));
            } else if !is_feature_layer_url(&layer.url) {
                problems.push(format!(
                    "{name}.url does not end in /FeatureServer/<index>: {}",
                    layer.url
                ));
            }
        }
        if self.query.page_size == 0 {
            problems.push("query.page_size must be at least 1".to_string());
        }
        if self.query.max_pages == 0 {
            problems.push("query.max_pages must be at least 1".to_string());
        }

        problems
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl TransitoConfig {
    /// Generate the annotated default TOML config file content.
    ///
    /// Used by `transito config init` to create a starting config file with
    /// all settings documented.
    pub fn default_toml() -> String {
        r#"# transito Configuration
# Normalized Waze traffic feeds from the MG infrastructure observatory
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (TRANSITO_*)
#   2. Project config (.transito.toml in current directory)
#   3. User global config (~/.transito/config.toml)
#   4. Built-in defaults

[portal]
url = "https://observatorio.infraestrutura.mg.gov.br/portal"
referer = "https://observatorio.infraestrutura.mg.gov.br/portal"

[credentials]
user = ""          # Prefer TRANSITO_USER over storing the login here
password = ""      # Prefer TRANSITO_PASSWORD over storing the secret here

[query]
page_size = 2000   # Records per page request
timeout_ms = 30000
max_pages = 500    # Abort a fetch that never reaches an empty page
return_geometry = true

[layers.alerts]
url = "https://observatorio.infraestrutura.mg.gov.br/server/rest/services/00_PUBLICACOES/waze_alertas_transito/FeatureServer/0"

[layers.congestion]
url = "https://observatorio.infraestrutura.mg.gov.br/server/rest/services/00_PUBLICACOES/waze_congestionamento/FeatureServer/0"

[logging]
enabled = true
path = "~/.transito/fetch-log.jsonl"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = TransitoConfig::default();
        assert_eq!(
            config.portal.url,
            "https://observatorio.infraestrutura.mg.gov.br/portal"
        );
        assert_eq!(config.portal.referer, config.portal.url);
        assert!(config.credentials.user.is_empty());
        assert_eq!(config.query.page_size, 2000);
        assert_eq!(config.query.timeout_ms, 30_000);
        assert_eq!(config.query.max_pages, 500);
        assert!(config.query.return_geometry);
        assert!(config.layers.alerts.url.contains("waze_alertas_transito"));
        assert!(config.layers.congestion.url.contains("waze_congestionamento"));
        assert!(config.logging.enabled);
    }

    #[test]
    fn deserialize_minimal_toml() {
        let toml_str = r#"
[credentials]
user = "ana"
password = "s3cret"
"#;
        let config: TransitoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.credentials.user, "ana");
        // All other sections fall back to defaults
        assert_eq!(config.query.page_size, 2000);
        assert!(config.layers.alerts.url.contains("FeatureServer/0"));
    }

    #[test]
    fn empty_toml_produces_defaults() {
        let config: TransitoConfig = toml::from_str("").unwrap();
        assert_eq!(config.query.max_pages, 500);
        assert!(config.logging.enabled);
    }

    #[test]
    fn deserialize_full_toml() {
        let toml_str = r#"
[portal]
url = "https://gis.example.org/portal"
referer = "https://gis.example.org/portal"

[credentials]
user = "ops"
password = "hunter2"

[query]
page_size = 500
timeout_ms = 5000
max_pages = 20
return_geometry = false

[layers.alerts]
url = "https://gis.example.org/server/rest/services/alerts/FeatureServer/3"

[layers.congestion]
url = "https://gis.example.org/server/rest/services/jams/FeatureServer/1"

[logging]
enabled = false
path = "/tmp/fetch.jsonl"
"#;
        let config: TransitoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.portal.url, "https://gis.example.org/portal");
        assert_eq!(config.credentials.password, "hunter2");
        assert_eq!(config.query.page_size, 500);
        assert!(!config.query.return_geometry);
        assert!(config.layers.alerts.url.ends_with("FeatureServer/3"));
        assert!(!config.logging.enabled);
        assert_eq!(config.logging.path, "/tmp/fetch.jsonl");
    }

    #[test]
    fn default_toml_parses_back() {
        let toml_str = TransitoConfig::default_toml();
        let config: TransitoConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.query.page_size, 2000);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn feature_layer_url_shapes() {
        assert!(is_feature_layer_url(
            "https://h/server/rest/services/x/FeatureServer/0"
        ));
        assert!(is_feature_layer_url("https://h/x/FeatureServer/12/"));
        assert!(!is_feature_layer_url("https://h/x/FeatureServer"));
        assert!(!is_feature_layer_url("https://h/x/MapServer/0"));
    }

    #[test]
    fn validate_flags_broken_urls_and_paging() {
        let mut config = TransitoConfig::default();
        assert!(config.validate().is_empty());

        config.layers.alerts.url = "https://h/x/MapServer/0".to_string();
        config.layers.congestion.url = String::new();
        config.query.page_size = 0;
        let problems = config.validate();
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.contains("layers.alerts")));
        assert!(problems.iter().any(|p| p.contains("layers.congestion")));
        assert!(problems.iter().any(|p| p.contains("page_size")));
    }
}
