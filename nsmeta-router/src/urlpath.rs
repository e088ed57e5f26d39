//! A path segment paired with its percent-encoded form (spec §4.3).
//!
//! Encoding goes through an absolute `file://` URI rather than a bare
//! percent-encoder: some encoders refuse a colon in a path segment unless it
//! is anchored inside a URI with a scheme, so this builds `file:///<segment>`
//! and strips the `file:///` prefix back off, per the spec's construction.

use std::fmt;

use url::Url;

#[derive(Debug, thiserror::Error)]
#[error("path segment {0:?} could not be encoded as a file URI")]
pub struct UrlPathError(String);

/// An RFC 2396 path segment, carrying both its raw and percent-encoded
/// forms. Immutable after construction (spec §5 "Shared resources": "the
/// URL-path helper ... is immutable after construction").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPath {
    unencoded: String,
    encoded: String,
}

impl UrlPath {
    pub fn new(segment: &str) -> Result<Self, UrlPathError> {
        let absolute = format!("/{}", segment.trim_start_matches('/'));
        let url = Url::from_file_path(&absolute).map_err(|_| UrlPathError(segment.to_string()))?;
        let encoded = url
            .as_str()
            .strip_prefix("file:///")
            .ok_or_else(|| UrlPathError(segment.to_string()))?
            .to_string();

        Ok(Self {
            unencoded: segment.to_string(),
            encoded,
        })
    }

    pub fn unencoded(&self) -> &str {
        &self.unencoded
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for UrlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unencoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_segment_round_trips() {
        let p = UrlPath::new("plain").unwrap();
        assert_eq!(p.unencoded(), "plain");
        assert_eq!(p.encoded(), "plain");
    }

    #[test]
    fn space_is_percent_encoded() {
        let p = UrlPath::new("a b").unwrap();
        assert_eq!(p.unencoded(), "a b");
        assert!(p.encoded().contains("%20"));
    }

    #[test]
    fn colon_is_preserved() {
        let p = UrlPath::new("a:b").unwrap();
        assert_eq!(p.encoded(), "a:b");
    }
}
