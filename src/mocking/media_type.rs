//! Response media-type resolution.
//!
//! A single, unweighted `Accept` value is matched against the declared
//! producible media types. Quality values and multi-candidate negotiation are
//! not supported: `"application/json, text/plain"` is one opaque value.

use thiserror::Error;

use crate::api::EndpointDescriptor;

/// The wildcard `Accept` value.
pub const ANY_MEDIA_TYPE: &str = "*/*";

/// Used for `*/*` when nothing else is declared.
pub const FALLBACK_MEDIA_TYPE: &str = "text/html";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("the \"{accept}\" media-type is not supported")]
pub struct UnsupportedMediaType {
    pub accept: String,
}

/// Pick the response media type for `accept`.
///
/// `*/*` resolves to the first of `produces`, else `declared_default`, else
/// [`FALLBACK_MEDIA_TYPE`], and never fails. Any other value must appear in
/// `produces` verbatim.
pub fn resolve(
    accept: &str,
    produces: &[String],
    declared_default: Option<&str>,
) -> Result<String, UnsupportedMediaType> {
    let accept = accept.trim();
    if accept == ANY_MEDIA_TYPE {
        let chosen = produces
            .first()
            .map(String::as_str)
            .or(declared_default)
            .unwrap_or(FALLBACK_MEDIA_TYPE);
        return Ok(chosen.to_string());
    }

    if produces.iter().any(|p| p == accept) {
        Ok(accept.to_string())
    } else {
        Err(UnsupportedMediaType {
            accept: accept.to_string(),
        })
    }
}

/// [`resolve`] against an endpoint's declarations. A missing `Accept` is `*/*`.
pub fn resolve_for(
    endpoint: &EndpointDescriptor,
    accept: Option<&str>,
) -> Result<String, UnsupportedMediaType> {
    resolve(
        accept.unwrap_or(ANY_MEDIA_TYPE),
        &endpoint.produces,
        endpoint.declared_content_type(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpMethod;

    fn produces(types: &[&str]) -> Vec<String> {
        types.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_wildcard_picks_first_declared() {
        let declared = produces(&["application/json", "text/plain"]);
        assert_eq!(resolve("*/*", &declared, None).unwrap(), "application/json");
    }

    #[test]
    fn test_wildcard_fallbacks() {
        assert_eq!(
            resolve("*/*", &[], Some("application/xml")).unwrap(),
            "application/xml"
        );
        assert_eq!(resolve("*/*", &[], None).unwrap(), FALLBACK_MEDIA_TYPE);
    }

    #[test]
    fn test_exact_match_returned_verbatim() {
        let declared = produces(&["application/json", "text/plain"]);
        assert_eq!(resolve("text/plain", &declared, None).unwrap(), "text/plain");
    }

    #[test]
    fn test_unlisted_type_is_unsupported() {
        let declared = produces(&["application/json"]);
        let err = resolve("application/xml", &declared, Some("application/xml")).unwrap_err();
        assert_eq!(err.accept, "application/xml");

        // no q-value parsing
        assert!(resolve("application/json;q=0.9", &declared, None).is_err());
        assert!(resolve("application/json", &[], None).is_err());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let declared = produces(&["text/csv", "application/json"]);
        for accept in ["*/*", "application/json", "image/png"] {
            assert_eq!(
                resolve(accept, &declared, None),
                resolve(accept, &declared, None)
            );
        }
    }

    #[test]
    fn test_missing_accept_means_wildcard() {
        let ep = EndpointDescriptor::new(HttpMethod::Get, "/x")
            .with_header("Content-Type", "application/vnd.api+json");
        assert_eq!(resolve_for(&ep, None).unwrap(), "application/vnd.api+json");
    }
}
