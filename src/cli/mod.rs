//! CLI command implementations.
//!
//! Provides subcommand handlers for:
//! - `transito fetch` — fetch a layer end to end, write JSON or CSV
//! - `transito stats` — fetch, filter, and print value counts for a field
//! - `transito health` — check config, credentials, portal and layer reachability
//! - `transito config show|init|set|reset` — configuration management

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::analytics::logger::{self, FetchLogEntry};
use crate::config::{self, TransitoConfig};
use crate::dataset::schema::label_columns;
use crate::dataset::{Dataset, canonical_highway, csv_escape};
use crate::gis::{self, LayerKind};

/// Output format for data-producing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Timeout for the quick reachability probes in `transito health`.
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// transito fetch
// ---------------------------------------------------------------------------

/// Fetch one layer and emit its records.
///
/// The normalized path translates categorical codes and projects onto the
/// layer's display schema; `--raw` skips both and emits the service fields
/// as fetched. Failures leave no output file behind.
pub fn run_fetch(
    layer_name: &str,
    format: OutputFormat,
    output: Option<&Path>,
    raw: bool,
) -> Result<()> {
    let cfg = config::load();
    let layer = parse_layer(layer_name)?;

    let mut dataset = fetch_logged(&cfg, layer)?;

    if !raw {
        layer.normalize(&mut dataset);
        dataset = dataset.select(layer.display_schema());
    }

    let body = match format {
        OutputFormat::Csv if raw => dataset.to_csv_raw(),
        OutputFormat::Csv => dataset.to_csv(&label_columns(layer.display_schema())),
        // fetch has no table renderer; Table falls back to JSON.
        OutputFormat::Json | OutputFormat::Table => dataset
            .to_json_string(true)
            .context("failed to serialize records as JSON")?,
    };

    match output {
        Some(path) => {
            fs::write(path, &body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "{} {} records from `{}` written to {}",
                "✓".green().bold(),
                format_number(dataset.len()),
                layer,
                path.display()
            );
        }
        None => println!("{body}"),
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// transito stats
// ---------------------------------------------------------------------------

/// Filters for `transito stats`, applied to the normalized dataset in
/// order. Each one is an equality test against the translated value.
#[derive(Debug, Default)]
pub struct StatsFilter {
    /// Alert type, e.g. `Acidente` (alerts layer).
    pub tipo: Option<String>,
    /// Alert subtype, e.g. `Buraco na Estrada` (alerts layer).
    pub subtipo: Option<String>,
    /// Administrative region, either layer.
    pub regional: Option<String>,
}

impl StatsFilter {
    fn apply(&self, mut dataset: Dataset) -> Dataset {
        for (field, value) in [
            ("type", &self.tipo),
            ("subtype", &self.subtipo),
            ("regional", &self.regional),
        ] {
            if let Some(value) = value {
                dataset = dataset.filter_eq(field, value);
            }
        }
        dataset
    }
}

/// Fetch a layer, apply filters, and print value counts for one field.
pub fn run_stats(
    layer_name: &str,
    filter: &StatsFilter,
    by: Option<&str>,
    top: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let cfg = config::load();
    let layer = parse_layer(layer_name)?;

    let mut dataset = fetch_logged(&cfg, layer)?;
    layer.normalize(&mut dataset);

    let total = dataset.len();
    let mut filtered = filter.apply(dataset);

    let field = by.unwrap_or_else(|| layer.headline_field());
    if field == "rodovia" {
        // Group the highway variants the operators type by hand
        // ("br 381", "BR381") under the official designation.
        filtered.rewrite_field("rodovia", canonical_highway);
    }

    let mut counts = filtered.value_counts(field);
    if let Some(top) = top {
        counts.truncate(top);
    }

    if counts.is_empty() {
        println!(
            "{}",
            format!("No records carry `{field}` after filtering ({total} fetched).").yellow()
        );
        return Ok(());
    }

    match format {
        OutputFormat::Json => print_counts_json(field, &counts, filtered.len(), total)?,
        OutputFormat::Csv => print_counts_csv(field, &counts),
        OutputFormat::Table => print_counts_table(layer, field, &counts, filtered.len(), total),
    }

    Ok(())
}

fn print_counts_table(
    layer: LayerKind,
    field: &str,
    counts: &[(String, usize)],
    filtered: usize,
    total: usize,
) {
    println!(
        "{}",
        format!("Occurrences by `{field}` — layer {layer}").bold().cyan()
    );
    println!("{}", "=".repeat(60));
    println!("  {:<38} {:>8} {:>9}", "Value", "Count", "Share");
    println!("  {}", "-".repeat(58));

    for (i, (value, count)) in counts.iter().enumerate() {
        let share = (*count as f64 / filtered as f64) * 100.0;
        let line = format!(
            "  {:<38} {:>8} {:>8.1}%",
            truncate(value, 38),
            format_number(*count),
            share
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }

    println!();
    println!(
        "  {} {} of {} records after filters",
        "Total:".bold(),
        format_number(filtered),
        format_number(total)
    );
    if let Some((value, count)) = counts.first() {
        println!(
            "  {} {} ({} occurrences)",
            "Top:  ".bold(),
            value,
            format_number(*count)
        );
    }
}

fn print_counts_json(
    field: &str,
    counts: &[(String, usize)],
    filtered: usize,
    total: usize,
) -> Result<()> {
    let value = serde_json::json!({
        "field": field,
        "records_fetched": total,
        "records_after_filters": filtered,
        "counts": counts.iter().map(|(value, count)| serde_json::json!({
            "value": value,
            "count": count,
        })).collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_counts_csv(field: &str, counts: &[(String, usize)]) {
    println!("{},count", csv_escape(field));
    for (value, count) in counts {
        println!("{},{}", csv_escape(value), count);
    }
}

// ---------------------------------------------------------------------------
// transito health
// ---------------------------------------------------------------------------

/// Check configuration, credentials, portal and layer reachability, and the
/// fetch log.
pub fn run_health() -> Result<()> {
    println!("{}", "transito Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    // 0. Config file status
    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let cfg = config::load();
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.transito/config.toml found"
        } else {
            "not found (run `transito config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".transito.toml found"
        } else {
            "none (optional)"
        },
    );

    // 1. Config sanity
    let problems = cfg.validate();
    if problems.is_empty() {
        print_health_item("Config values", true, "valid");
    } else {
        for problem in &problems {
            print_health_item("Config values", false, problem);
        }
    }

    // 2. Credentials
    let creds = gis::Credentials::new(&cfg.credentials.user, &cfg.credentials.password);
    print_health_item(
        "Credentials",
        creds.is_complete(),
        if creds.is_complete() {
            "configured"
        } else {
            "missing (set TRANSITO_USER and TRANSITO_PASSWORD)"
        },
    );

    // 3. Portal reachability (any HTTP response counts; auth comes later)
    let token_url = gis::token_endpoint(&cfg.portal.url);
    let portal_ok = gis::reachable(&token_url, HEALTH_PROBE_TIMEOUT);
    print_health_item(
        "Portal",
        portal_ok,
        &if portal_ok {
            format!("reachable at {}", cfg.portal.url)
        } else {
            format!("not reachable at {}", cfg.portal.url)
        },
    );

    // 4. Layer reachability
    for layer in LayerKind::ALL {
        let url = gis::layer_url(&cfg, layer);
        let ok = gis::reachable(url, HEALTH_PROBE_TIMEOUT);
        print_health_item(
            &format!("Layer `{layer}`"),
            ok,
            if ok { "reachable" } else { "not reachable" },
        );
    }

    // 5. Fetch log
    let log_path = logger::fetch_log_path(&cfg);
    let entries = log_path
        .as_deref()
        .map(logger::read_entries)
        .unwrap_or_default();
    let recent = log_path
        .as_deref()
        .map(|p| logger::read_entries_since_days(p, Some(7)).len())
        .unwrap_or(0);
    print_health_item(
        "Fetch log",
        !entries.is_empty(),
        &if entries.is_empty() {
            "no fetches recorded yet".to_string()
        } else {
            format!("{} entries, {} in the last 7 days", entries.len(), recent)
        },
    );
    for layer in LayerKind::ALL {
        if let Some(last) = logger::last_entry_for_layer(&entries, layer.as_str()) {
            let detail = if last.success {
                format!(
                    "{} records in {} pages at {}",
                    format_number(last.records),
                    last.pages,
                    last.timestamp
                )
            } else {
                format!(
                    "failed at {}: {}",
                    last.timestamp,
                    last.error.as_deref().unwrap_or("unknown error")
                )
            };
            print_health_item(&format!("Last fetch ({layer})"), last.success, &detail);
        }
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<22} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// transito config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective transito Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    // Show source info
    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    if global_exists {
        println!("  {} {}", "✓".green(), "~/.transito/config.toml".dimmed());
    } else {
        println!(
            "  {} {}",
            "·".dimmed(),
            "~/.transito/config.toml (not found)".dimmed()
        );
    }
    if project_exists {
        println!("  {} {}", "✓".green(), ".transito.toml".dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), ".transito.toml (not found)".dimmed());
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "TRANSITO_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.transito/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Set credentials.user/password (or TRANSITO_USER/TRANSITO_PASSWORD) before fetching."
            .dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared fetch plumbing
// ---------------------------------------------------------------------------

fn parse_layer(name: &str) -> Result<LayerKind> {
    LayerKind::from_str_opt(name)
        .with_context(|| format!("unknown layer `{name}` (expected: alerts, congestion)"))
}

/// Run the authenticated fetch for a layer and append a fetch-log entry,
/// success or failure. Returns the raw dataset.
fn fetch_logged(cfg: &TransitoConfig, layer: LayerKind) -> Result<Dataset> {
    let endpoint = gis::layer_url(cfg, layer).to_string();
    let started = Instant::now();

    match gis::load_layer(cfg, layer) {
        Ok(outcome) => {
            let entry = FetchLogEntry::success(
                layer.as_str(),
                &endpoint,
                outcome.pages,
                outcome.dataset.len(),
                started.elapsed().as_millis() as u64,
            );
            logger::log_fetch(cfg, &entry);
            Ok(outcome.dataset)
        }
        Err(err) => {
            let entry = FetchLogEntry::failure(
                layer.as_str(),
                &endpoint,
                started.elapsed().as_millis() as u64,
                format!("{}: {err}", err.kind()),
            );
            logger::log_fetch(cfg, &entry);
            Err(err).with_context(|| format!("fetching layer `{layer}` failed"))
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Format a number with comma separators for readability.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(42), "42");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(12345), "12,345");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("ab", 2), "ab");
        // counts characters, not bytes
        assert_eq!(truncate("Tráfego Intenso", 15), "Tráfego Intenso");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_str_opt(Some("unknown")),
            OutputFormat::Table
        );
    }

    #[test]
    fn stats_filter_applies_in_order() {
        let mut r1 = crate::dataset::Record::new();
        r1.set("type", json!("Acidente"));
        r1.set("regional", json!("Norte"));
        let mut r2 = crate::dataset::Record::new();
        r2.set("type", json!("Acidente"));
        r2.set("regional", json!("Sul"));
        let ds = Dataset::from_records(vec![r1, r2]);

        let filter = StatsFilter {
            tipo: Some("Acidente".to_string()),
            subtipo: None,
            regional: Some("Sul".to_string()),
        };
        let out = filter.apply(ds);
        assert_eq!(out.len(), 1);
        assert_eq!(out.records()[0].get_str("regional"), Some("Sul"));
    }

    #[test]
    fn empty_filter_is_identity() {
        let mut r = crate::dataset::Record::new();
        r.set("type", json!("Perigo"));
        let ds = Dataset::from_records(vec![r]);
        let out = StatsFilter::default().apply(ds.clone());
        assert_eq!(out, ds);
    }
}
