//! The remote dataset fetcher: authenticate against the portal, page
//! through a feature-service layer, and hand back one flat [`Dataset`].
//!
//! The flow per invocation is fixed: acquire a token ([`auth`]), run the
//! paginated query to completion ([`query`]), fold point geometry into
//! attributes ([`geometry`]). Every failure is a typed [`GisError`] and
//! aborts the whole fetch — callers never see partial data. Normalization
//! is a separate, local step ([`LayerKind::normalize`]) so raw and
//! translated views of the same fetch stay available.

pub mod auth;
pub mod error;
pub mod geometry;
pub mod query;

pub use auth::{Credentials, authenticate, token_endpoint};
pub use error::GisError;
pub use geometry::{Point, parse_line_field};
pub use query::{FeatureQuery, FetchOutcome, fetch_all};

use std::time::Duration;

use crate::config::TransitoConfig;
use crate::dataset::schema::{ALERTS_DISPLAY, CONGESTION_DISPLAY, DisplaySchema};
use crate::dataset::{Dataset, translate};

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// The two published feature layers this crate knows how to consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Waze traffic alerts: one point feature per alert.
    Alerts,
    /// Waze congestion segments: one polyline feature per jam.
    Congestion,
}

impl LayerKind {
    pub const ALL: [LayerKind; 2] = [LayerKind::Alerts, LayerKind::Congestion];

    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Alerts => "alerts",
            LayerKind::Congestion => "congestion",
        }
    }

    /// Parse a layer name, `None` for unknown input.
    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "alerts" | "alertas" => Some(LayerKind::Alerts),
            "congestion" | "congestionamento" => Some(LayerKind::Congestion),
            _ => None,
        }
    }

    /// The display projection for this layer.
    pub fn display_schema(self) -> DisplaySchema {
        match self {
            LayerKind::Alerts => ALERTS_DISPLAY,
            LayerKind::Congestion => CONGESTION_DISPLAY,
        }
    }

    /// Default grouping field for summaries, by raw field name.
    pub fn headline_field(self) -> &'static str {
        match self {
            LayerKind::Alerts => "subtype",
            LayerKind::Congestion => "level",
        }
    }

    /// Translate this layer's categorical fields in place (and, for
    /// congestion, derive the length band). Idempotent.
    pub fn normalize(self, dataset: &mut Dataset) {
        match self {
            LayerKind::Alerts => translate::normalize_alerts(dataset),
            LayerKind::Congestion => translate::normalize_congestion(dataset),
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Config-driven fetch
// ---------------------------------------------------------------------------

/// The configured endpoint URL for a layer.
pub fn layer_url(config: &TransitoConfig, layer: LayerKind) -> &str {
    match layer {
        LayerKind::Alerts => &config.layers.alerts.url,
        LayerKind::Congestion => &config.layers.congestion.url,
    }
}

/// Build the query descriptor for a layer from the resolved config.
/// The token is attached separately after authentication.
pub fn build_query(config: &TransitoConfig, layer: LayerKind) -> FeatureQuery {
    let mut query = FeatureQuery::new(layer_url(config, layer));
    query.page_size = config.query.page_size;
    query.max_pages = config.query.max_pages;
    query.return_geometry = config.query.return_geometry;
    query.timeout = Duration::from_millis(config.query.timeout_ms);
    query
}

/// Quick reachability probe for health checks. Any HTTP response counts,
/// error statuses included: an auth refusal still proves the host is up.
pub fn reachable(url: &str, timeout: Duration) -> bool {
    match ureq::get(url).timeout(timeout).query("f", "json").call() {
        Ok(_) => true,
        Err(ureq::Error::Status(_, _)) => true,
        Err(_) => false,
    }
}

/// Authenticate and fetch one layer end to end.
///
/// Missing credentials fail before any request is made, with the same
/// [`GisError::Authentication`] the portal's refusal would produce. The
/// returned outcome carries the raw dataset — callers decide whether to
/// normalize.
pub fn load_layer(config: &TransitoConfig, layer: LayerKind) -> Result<FetchOutcome, GisError> {
    let credentials = Credentials::new(&config.credentials.user, &config.credentials.password);
    if !credentials.is_complete() {
        return Err(GisError::Authentication(
            "credentials are not configured (set credentials.user/password or \
             TRANSITO_USER/TRANSITO_PASSWORD)"
                .to_string(),
        ));
    }

    let timeout = Duration::from_millis(config.query.timeout_ms);
    let token = authenticate(
        &config.portal.url,
        &config.portal.referer,
        &credentials,
        timeout,
    )?;

    let query = build_query(config, layer).with_token(token);
    fetch_all(&query)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_names_round_trip() {
        for layer in LayerKind::ALL {
            assert_eq!(LayerKind::from_str_opt(layer.as_str()), Some(layer));
        }
        assert_eq!(LayerKind::from_str_opt("ALERTS"), Some(LayerKind::Alerts));
        assert_eq!(
            LayerKind::from_str_opt("congestionamento"),
            Some(LayerKind::Congestion)
        );
        assert_eq!(LayerKind::from_str_opt("potholes"), None);
    }

    #[test]
    fn build_query_reflects_config() {
        let mut config = TransitoConfig::default();
        config.query.page_size = 100;
        config.query.max_pages = 7;
        config.query.return_geometry = false;
        config.layers.alerts.url = "http://127.0.0.1:9000/FeatureServer/0".to_string();

        let query = build_query(&config, LayerKind::Alerts);
        assert_eq!(query.endpoint, "http://127.0.0.1:9000/FeatureServer/0");
        assert_eq!(query.page_size, 100);
        assert_eq!(query.max_pages, 7);
        assert!(!query.return_geometry);
        assert_eq!(query.where_clause, "1=1");
        assert_eq!(query.token, None);
    }

    #[test]
    fn load_layer_requires_credentials() {
        let config = TransitoConfig::default();
        let err = load_layer(&config, LayerKind::Alerts).unwrap_err();
        assert!(matches!(err, GisError::Authentication(_)));
    }

    #[test]
    fn headline_fields_exist_in_display_schemas() {
        for layer in LayerKind::ALL {
            let field = layer.headline_field();
            assert!(
                layer
                    .display_schema()
                    .iter()
                    .any(|(source, _)| *source == field)
            );
        }
    }
}
