//! Token acquisition against the portal's `generateToken` endpoint.
//!
//! One POST per fetch run; the returned token is reused for every page of
//! that run and never refreshed. The portal signals bad credentials with an
//! HTTP 200 whose body carries an `error` object instead of a `token`, so
//! success is decided by the body, not the status line.

use std::time::Duration;

use serde::Deserialize;

use super::error::GisError;
use super::query::ServiceError;

/// Portal credentials, read from configuration and borrowed per fetch.
/// Never persisted by this crate.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Both fields present; empty strings are never sent to the portal.
    pub fn is_complete(&self) -> bool {
        !self.user.is_empty() && !self.password.is_empty()
    }
}

/// Response body from `POST generateToken`. On failure the portal keeps the
/// 200 status and puts an `error` object in the body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    error: Option<ServiceError>,
}

/// The portal's token endpoint for a given portal base URL.
pub fn token_endpoint(portal_url: &str) -> String {
    format!(
        "{}/sharing/rest/generateToken",
        portal_url.trim_end_matches('/')
    )
}

/// Request a session token from the portal.
///
/// Sends the credential as an urlencoded form with `f=json`. Every failure
/// mode collapses into [`GisError::Authentication`]: transport failures,
/// non-success status codes, an undecodable body, and the portal's
/// 200-with-`error`-body refusal. Terminal for the calling fetch; nothing
/// is retried.
pub fn authenticate(
    portal_url: &str,
    referer: &str,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<String, GisError> {
    let url = token_endpoint(portal_url);

    let response = ureq::post(&url)
        .timeout(timeout)
        .send_form(&[
            ("username", &credentials.user),
            ("password", &credentials.password),
            ("referer", referer),
            ("f", "json"),
        ])
        .map_err(|err| match err {
            ureq::Error::Status(code, _) => {
                GisError::Authentication(format!("token endpoint returned HTTP {code}"))
            }
            other => GisError::Authentication(format!("token request failed: {other}")),
        })?;

    let body: TokenResponse = response
        .into_json()
        .map_err(|err| GisError::Authentication(format!("token response was not JSON: {err}")))?;

    if let Some(token) = body.token {
        return Ok(token);
    }

    let reason = match body.error {
        Some(error) => error.describe(),
        None => "token response carried no token".to_string(),
    };
    Err(GisError::Authentication(reason))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_endpoint_normalizes_trailing_slash() {
        assert_eq!(
            token_endpoint("https://example.org/portal/"),
            "https://example.org/portal/sharing/rest/generateToken"
        );
        assert_eq!(
            token_endpoint("https://example.org/portal"),
            "https://example.org/portal/sharing/rest/generateToken"
        );
    }

    #[test]
    fn credentials_completeness() {
        assert!(Credentials::new("ana", "s3cret").is_complete());
        assert!(!Credentials::new("", "s3cret").is_complete());
        assert!(!Credentials::new("ana", "").is_complete());
    }
}
