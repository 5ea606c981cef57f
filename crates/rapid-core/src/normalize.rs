//! URL canonicalization for page and asset references.
//!
//! Every URL that enters the cache or the preload registry passes through
//! [`UrlNormalizer`], so identical resources always map to the same key.
//! Normalization never fails: a reference that cannot be resolved is returned
//! unchanged.
//!
//! ```rust
//! use rapid_core::normalize::UrlNormalizer;
//!
//! let norm = UrlNormalizer::new("https://example.com/blog/").unwrap();
//! assert_eq!(norm.normalize("post-2"), "https://example.com/post-2");
//! assert_eq!(norm.correct_asset_path("img/a.jpg", None), "https://example.com/img/a.jpg");
//! assert!(!norm.is_page_url("/img/a.JPG"));
//! ```

use url::Url;

use crate::Result;

/// Path extensions that mark a URL as a binary asset rather than a page.
pub const ASSET_EXTENSIONS: &[&str] = &["css", "js", "jpg", "jpeg", "png", "gif", "webp", "avif"];

/// Resolves references against a fixed document origin.
#[derive(Debug, Clone)]
pub struct UrlNormalizer {
    origin: Url,
}

impl UrlNormalizer {
    /// Create a normalizer for the document at `document_url`.
    ///
    /// Only the document URL's origin is kept; relative references resolve
    /// against the origin root, like root-relative links do.
    pub fn new(document_url: &str) -> Result<Self> {
        let parsed = Url::parse(document_url)?;
        let origin = parsed.join("/")?;
        Ok(Self { origin })
    }

    /// The origin every reference is resolved against.
    #[must_use]
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolve `raw` to an absolute URL.
    ///
    /// Returns `raw` unchanged when it cannot be parsed.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        Self::resolve(raw, &self.origin)
    }

    /// Resolve `raw` against an explicit base such as the page that linked it.
    #[must_use]
    pub fn normalize_with_base(&self, raw: &str, base: &Url) -> String {
        Self::resolve(raw, base)
    }

    /// Resolve an asset reference taken from markup.
    ///
    /// Bare paths (`img/a.png`) are root-prefixed before resolution, so asset
    /// references never resolve relative to the page directory. `base`
    /// defaults to the origin.
    #[must_use]
    pub fn correct_asset_path(&self, raw: &str, base: Option<&Url>) -> String {
        let trimmed = raw.trim();
        let base = base.unwrap_or(&self.origin);
        if is_bare_path(trimmed) {
            Self::resolve(&format!("/{trimmed}"), base)
        } else {
            Self::resolve(trimmed, base)
        }
    }

    /// Whether `url` is expected to return navigable markup.
    ///
    /// A URL whose path ends in one of [`ASSET_EXTENSIONS`] is an asset and is
    /// never fetched as a page.
    #[must_use]
    pub fn is_page_url(&self, url: &str) -> bool {
        let normalized = self.normalize(url);
        let path = Url::parse(&normalized).map_or_else(
            |_| {
                normalized
                    .split(['?', '#'])
                    .next()
                    .unwrap_or_default()
                    .to_string()
            },
            |parsed| parsed.path().to_string(),
        );
        extension_of(&path).is_none_or(|ext| {
            !ASSET_EXTENSIONS
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        })
    }

    /// Whether `url` shares scheme, host and port with the origin.
    #[must_use]
    pub fn is_same_origin(&self, url: &str) -> bool {
        Url::parse(&self.normalize(url))
            .is_ok_and(|parsed| parsed.origin() == self.origin.origin())
    }

    fn resolve(raw: &str, base: &Url) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return raw.to_string();
        }
        let resolved = match Url::parse(trimmed) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => base.join(trimmed),
            Err(e) => Err(e),
        };
        resolved.map_or_else(
            |e| {
                tracing::debug!(%raw, error = %e, "leaving unparsable reference unchanged");
                raw.to_string()
            },
            String::from,
        )
    }
}

/// A reference with no scheme that does not start at the root.
fn is_bare_path(reference: &str) -> bool {
    if reference.is_empty() || reference.starts_with('/') || reference.starts_with('#') {
        return false;
    }
    !matches!(Url::parse(reference), Ok(_) | Err(url::ParseError::EmptyHost))
}

fn extension_of(path: &str) -> Option<&str> {
    let file = path.rsplit('/').next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}
