use thiserror::Error;

/// Error taxonomy for the feature-service fetch pipeline.
///
/// Every variant is fatal to the invocation that produced it: a failed
/// authentication or page request aborts the whole fetch and the caller
/// receives no partial data. Nothing here is retried automatically.
#[derive(Debug, Error)]
pub enum GisError {
    /// The token request failed, or the provider answered with an error
    /// payload instead of a `token` field.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A page request failed (HTTP status, transport, service error payload,
    /// or an undecodable body). Pages gathered before the failure are
    /// discarded by the caller.
    #[error("page request at offset {offset} failed: {reason}")]
    Fetch { offset: u64, reason: String },

    /// A field a consumer-side helper requires is absent or has an
    /// unusable type.
    #[error("schema error: {0}")]
    Schema(String),

    /// The pagination cap was reached before the service returned an empty
    /// page. The fetch fails rather than returning a truncated dataset.
    #[error("page limit of {limit} reached at offset {offset} without an empty page")]
    PageLimit { limit: u32, offset: u64 },
}

impl GisError {
    /// Short machine-readable tag for log entries.
    pub fn kind(&self) -> &'static str {
        match self {
            GisError::Authentication(_) => "authentication",
            GisError::Fetch { .. } => "fetch",
            GisError::Schema(_) => "schema",
            GisError::PageLimit { .. } => "page_limit",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_offset_and_reason() {
        let err = GisError::Fetch {
            offset: 4000,
            reason: "HTTP 503".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("4000"));
        assert!(msg.contains("HTTP 503"));
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(GisError::Authentication(String::new()).kind(), "authentication");
        assert_eq!(
            GisError::PageLimit {
                limit: 500,
                offset: 1_000_000
            }
            .kind(),
            "page_limit"
        );
    }
}
