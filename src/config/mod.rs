//! Configuration system.
//!
//! Provides a layered configuration hierarchy:
//!
//! 1. **Built-in defaults** — hardcoded in [`schema::TransitoConfig::default()`]
//! 2. **User global config** — `~/.transito/config.toml`
//! 3. **Project local config** — `.transito.toml` in the current working directory
//! 4. **Environment variables** — `TRANSITO_*` overrides (highest precedence)
//!
//! Later layers override earlier ones. Missing sections in a TOML file fall
//! back to the previous layer's values; malformed files are silently
//! ignored so a stray edit never takes the fetch pipeline down with it.

pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::TransitoConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars. This is the primary entry point for everything that needs
/// configuration.
pub fn load() -> TransitoConfig {
    let mut config = TransitoConfig::default();

    // Layer 2: user global config (~/.transito/config.toml)
    if let Some(global) = load_toml_file(global_config_path()) {
        merge_config(&mut config, &global);
    }

    // Layer 3: project local config (.transito.toml)
    if let Some(project) = load_toml_file(project_config_path()) {
        merge_config(&mut config, &project);
    }

    // Layer 4: environment variable overrides
    apply_env_overrides(&mut config);

    config
}

/// Load a TOML config file from the given path (if it exists).
///
/// Returns `None` if the path is `None`, the file doesn't exist, or the
/// content is malformed.
fn load_toml_file(path: Option<PathBuf>) -> Option<TransitoConfig> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge a loaded config layer into the base config.
///
/// Each TOML file deserializes with `serde(default)`, so unset keys in the
/// overlay already carry the built-in defaults. Replacing the base wholesale
/// is therefore correct for the common case where a file only sets a handful
/// of keys: everything it didn't set matches the defaults the base started
/// from.
fn merge_config(base: &mut TransitoConfig, overlay: &TransitoConfig) {
    *base = overlay.clone();
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.transito/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".transito").join("config.toml"))
}

/// Path to the project local config: `.transito.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".transito.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

/// Expand a leading `~` to the home directory. Paths without one pass
/// through untouched.
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    if path == "~" {
        return dirs::home_dir();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    Some(PathBuf::from(path))
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `TRANSITO_USER` / `TRANSITO_PASSWORD` — portal credential
/// - `TRANSITO_PORTAL_URL` — portal base URL
/// - `TRANSITO_REFERER` — token request referer
/// - `TRANSITO_PAGE_SIZE` — records per page
/// - `TRANSITO_TIMEOUT_MS` — per-request timeout
/// - `TRANSITO_MAX_PAGES` — pagination safety cap
/// - `TRANSITO_LOG` — fetch logging (`1`/`true`/`yes`/`on`)
/// - `TRANSITO_LOG_PATH` — fetch log file path
fn apply_env_overrides(config: &mut TransitoConfig) {
    // Credentials
    if let Ok(val) = std::env::var("TRANSITO_USER")
        && !val.is_empty()
    {
        config.credentials.user = val;
    }
    if let Ok(val) = std::env::var("TRANSITO_PASSWORD")
        && !val.is_empty()
    {
        config.credentials.password = val;
    }

    // Portal
    if let Ok(val) = std::env::var("TRANSITO_PORTAL_URL")
        && !val.is_empty()
    {
        config.portal.url = val;
    }
    if let Ok(val) = std::env::var("TRANSITO_REFERER")
        && !val.is_empty()
    {
        config.portal.referer = val;
    }

    // Query
    if let Ok(val) = std::env::var("TRANSITO_PAGE_SIZE")
        && let Ok(n) = val.parse::<u32>()
    {
        config.query.page_size = n;
    }
    if let Ok(val) = std::env::var("TRANSITO_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.query.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("TRANSITO_MAX_PAGES")
        && let Ok(n) = val.parse::<u32>()
    {
        config.query.max_pages = n;
    }

    // Logging
    if let Ok(val) = std::env::var("TRANSITO_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("TRANSITO_LOG_PATH")
        && !val.is_empty()
    {
        config.logging.path = val;
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.transito/config.toml`.
///
/// Creates the `~/.transito/` directory if it doesn't exist. Returns an
/// error if the file already exists (use `force = true` to overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.transito/ directory")?;
    }

    fs::write(&path, TransitoConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Reads the current global config (or defaults), updates the specified key,
/// and writes the result back. Supports dotted keys like `query.page_size`
/// or `layers.alerts.url`.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        // No existing file: start from serialized defaults so the key's
        // current type is known for parsing.
        toml::to_string_pretty(&TransitoConfig::default())
            .context("failed to serialize default config")?
    };

    let mut value_table: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;

    set_toml_value(&mut value_table, key, value)?;

    let output = toml::to_string_pretty(&value_table).context("failed to serialize config")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.is_empty() {
        anyhow::bail!("empty config key");
    }

    // Navigate to the parent table
    let mut current = root;
    for &part in &parts[..parts.len() - 1] {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let leaf = parts[parts.len() - 1];

    // Determine the type of the existing value to parse correctly
    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let existing = table.get(leaf);
    let new_value = match existing {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        _ => toml::Value::String(raw_value.to_string()),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
