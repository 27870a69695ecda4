//! Paginated feature queries against a feature-service layer.
//!
//! One query descriptor, one token, one growing dataset. Pages are fetched
//! strictly one at a time in increasing offset order; the first page with
//! an empty `features` array ends the fetch. The service's
//! `exceededTransferLimit` flag is deliberately never consulted — some
//! deployments omit it, some set it on the final page, and the empty page
//! is the one signal every deployment agrees on.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::dataset::{Dataset, Record};

use super::error::GisError;
use super::geometry::merge_point_geometry;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Fetch everything; filtering is client-side.
pub const DEFAULT_WHERE: &str = "1=1";

/// Records per page. Matches the layer's transfer limit so a full page
/// costs exactly one round trip.
pub const DEFAULT_PAGE_SIZE: u32 = 2000;

/// Pagination safety cap. At the default page size this allows a million
/// records before the fetch is declared runaway.
pub const DEFAULT_MAX_PAGES: u32 = 500;

/// Per-request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

// ---------------------------------------------------------------------------
// Query descriptor
// ---------------------------------------------------------------------------

/// Everything one paginated fetch needs. Built per invocation, immutable
/// while the fetch runs; only the offset advances, and that lives in
/// [`fetch_all`]'s loop, not here.
#[derive(Debug, Clone)]
pub struct FeatureQuery {
    /// Layer endpoint, e.g. `https://host/server/rest/services/X/FeatureServer/0`.
    pub endpoint: String,
    pub where_clause: String,
    pub out_fields: String,
    pub return_geometry: bool,
    pub page_size: u32,
    pub max_pages: u32,
    pub timeout: Duration,
    /// Session token from [`super::auth::authenticate`]; `None` only makes
    /// sense against unsecured layers (and the test stub).
    pub token: Option<String>,
}

impl FeatureQuery {
    /// Descriptor with the standing defaults: fetch every field of every
    /// record, geometry included.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            where_clause: DEFAULT_WHERE.to_string(),
            out_fields: "*".to_string(),
            return_geometry: true,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// The service's error payload, delivered inside an HTTP 200 body.
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceError {
    pub(crate) code: Option<i64>,
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) details: Vec<String>,
}

impl ServiceError {
    /// One-line rendering for error messages and the fetch log.
    pub(crate) fn describe(&self) -> String {
        let mut out = match self.code {
            Some(code) => format!("service error {code}"),
            None => "service error".to_string(),
        };
        if let Some(message) = &self.message
            && !message.is_empty()
        {
            out.push_str(": ");
            out.push_str(message);
        }
        if !self.details.is_empty() {
            out.push_str(" (");
            out.push_str(&self.details.join("; "));
            out.push(')');
        }
        out
    }
}

/// One page of query results.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    features: Vec<Feature>,
    error: Option<ServiceError>,
    /// Present on some pages of some deployments. Ignored: the empty page
    /// is the only stop signal.
    #[serde(rename = "exceededTransferLimit")]
    #[allow(dead_code)]
    exceeded_transfer_limit: Option<bool>,
}

/// One feature: its attribute map plus an optional geometry object.
#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    attributes: Map<String, Value>,
    geometry: Option<Value>,
}

impl Feature {
    /// Flatten into a [`Record`], folding point geometry into `x`/`y`
    /// attributes when the service keeps them separate.
    fn into_record(self) -> Record {
        let mut record = Record::from(self.attributes);
        merge_point_geometry(&mut record, self.geometry.as_ref());
        record
    }
}

// ---------------------------------------------------------------------------
// Fetch loop
// ---------------------------------------------------------------------------

/// A completed fetch: the dataset plus how many page requests it took
/// (the terminating empty page included). The page count feeds the fetch
/// log; the dataset is the payload.
#[derive(Debug)]
pub struct FetchOutcome {
    pub dataset: Dataset,
    pub pages: u32,
}

/// Fetch every record of the layer, page by page.
///
/// The offset starts at 0 and advances by exactly `page_size` after each
/// non-empty page. Stops at the first empty page. Any page failure — bad
/// status, transport error, a body-level `error` object, an undecodable
/// body — aborts the whole fetch and discards everything accumulated so
/// far: callers get all pages or none. Hitting `max_pages` without an
/// empty page is [`GisError::PageLimit`], not a truncated result.
pub fn fetch_all(query: &FeatureQuery) -> Result<FetchOutcome, GisError> {
    let url = format!("{}/query", query.endpoint.trim_end_matches('/'));
    let mut dataset = Dataset::new();
    let mut offset: u64 = 0;
    let mut pages: u32 = 0;

    loop {
        if pages >= query.max_pages {
            return Err(GisError::PageLimit {
                limit: query.max_pages,
                offset,
            });
        }

        let features = fetch_page(query, &url, offset)?;
        pages += 1;

        if features.is_empty() {
            break;
        }
        for feature in features {
            dataset.push(feature.into_record());
        }
        offset += u64::from(query.page_size);
    }

    Ok(FetchOutcome { dataset, pages })
}

/// One page request. Offset only appears here and in the error it raises.
fn fetch_page(query: &FeatureQuery, url: &str, offset: u64) -> Result<Vec<Feature>, GisError> {
    let mut request = ureq::get(url)
        .timeout(query.timeout)
        .query("where", &query.where_clause)
        .query("outFields", &query.out_fields)
        .query(
            "returnGeometry",
            if query.return_geometry { "true" } else { "false" },
        )
        .query("f", "json")
        .query("resultRecordCount", &query.page_size.to_string())
        .query("resultOffset", &offset.to_string());
    if let Some(token) = &query.token {
        request = request.query("token", token);
    }

    let response = request.call().map_err(|err| match err {
        ureq::Error::Status(code, _) => GisError::Fetch {
            offset,
            reason: format!("service returned HTTP {code}"),
        },
        other => GisError::Fetch {
            offset,
            reason: format!("request failed: {other}"),
        },
    })?;

    let body: QueryResponse = response.into_json().map_err(|err| GisError::Fetch {
        offset,
        reason: format!("undecodable response body: {err}"),
    })?;

    // Feature services report query-level failures inside a 200 body.
    if let Some(error) = body.error {
        return Err(GisError::Fetch {
            offset,
            reason: error.describe(),
        });
    }

    Ok(body.features)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
