//! Sub-resource discovery in page markup.
//!
//! [`AssetExtractor::extract`] walks retrieved HTML and lists every image,
//! stylesheet and script a page references, in document order, with image
//! references expanded into their likely modern-format siblings. The result
//! is what the preload scheduler warms when a visitor is about to navigate.
//!
//! ## Format variants
//!
//! - `name.jpg.webp` yields `name.jpg.webp`, `name.jpg` and `name.webp`
//! - `name.jpg` / `name.jpeg` / `name.png` additionally yield `name.webp`
//!
//! Variants are speculative; nothing checks that they exist.
//!
//! ```rust
//! use rapid_core::extract::AssetExtractor;
//! use rapid_core::normalize::UrlNormalizer;
//!
//! let extractor = AssetExtractor::new(UrlNormalizer::new("https://example.com/").unwrap());
//! let assets = extractor.extract(r#"<img src="a.jpg">"#, "https://example.com/post");
//! assert_eq!(assets, vec!["https://example.com/a.jpg", "https://example.com/a.webp"]);
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::normalize::UrlNormalizer;

/// Images with a primary or lazy-load source.
///
/// SAFETY: Selector is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src], img[data-src]").unwrap());

/// SAFETY: Selector is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static STYLESHEET_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[rel="stylesheet"][href]"#).unwrap());

/// SAFETY: Selector is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[src]").unwrap());

/// SAFETY: Selector is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Links that look like "next page" navigation.
///
/// SAFETY: Selector is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static PAGINATION_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="page-"], a[href*="?page="]"#).unwrap());

/// `base.<raster|vector>.<webp|avif>`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static DOUBLE_EXTENSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+)\.(jpe?g|png|gif|svg)\.(webp|avif)$").unwrap()
});

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static WEBP_CANDIDATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+)\.(jpe?g|png)$").unwrap());

/// Extracts preloadable sub-resources and navigable links from markup.
#[derive(Debug, Clone)]
pub struct AssetExtractor {
    normalizer: UrlNormalizer,
}

impl AssetExtractor {
    /// Create an extractor resolving references with `normalizer`.
    #[must_use]
    pub const fn new(normalizer: UrlNormalizer) -> Self {
        Self { normalizer }
    }

    /// The normalizer used for every emitted URL.
    #[must_use]
    pub const fn normalizer(&self) -> &UrlNormalizer {
        &self.normalizer
    }

    /// List the images, stylesheets and scripts referenced by `markup`.
    ///
    /// Images come first, then stylesheets, then scripts; each group is in
    /// document order. The result is deduplicated keeping first occurrences
    /// and never contains inline `data:` URIs or empty entries.
    #[must_use]
    pub fn extract(&self, markup: &str, base_url: &str) -> Vec<String> {
        let document = Html::parse_document(markup);
        let base = Url::parse(base_url).ok();
        let base = base.as_ref();

        let images = document.select(&IMAGE_SELECTOR).flat_map(|img| {
            let element = img.value();
            image_reference(element.attr("src"), element.attr("data-src"))
                .map(|reference| {
                    self.image_variants(&self.normalizer.correct_asset_path(reference, base))
                })
                .unwrap_or_default()
        });

        let stylesheets = document
            .select(&STYLESHEET_SELECTOR)
            .filter_map(|link| link.value().attr("href"))
            .map(|href| self.normalizer.correct_asset_path(href, base));

        let scripts = document
            .select(&SCRIPT_SELECTOR)
            .filter_map(|script| script.value().attr("src"))
            .map(|src| self.normalizer.correct_asset_path(src, base));

        dedup_preserving_order(images.chain(stylesheets).chain(scripts))
    }

    /// Same-origin page links found in `markup`, fragments removed.
    #[must_use]
    pub fn extract_links(&self, markup: &str, base_url: &str) -> Vec<String> {
        let document = Html::parse_document(markup);
        let links = document
            .select(&ANCHOR_SELECTOR)
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| self.resolve_link(href, base_url))
            .filter(|url| {
                self.normalizer.is_same_origin(url) && self.normalizer.is_page_url(url)
            });
        dedup_preserving_order(links)
    }

    /// Pagination links (`page-N` paths and `?page=N` queries) in document order.
    #[must_use]
    pub fn find_pagination_links(&self, markup: &str, base_url: &str) -> Vec<String> {
        let document = Html::parse_document(markup);
        let links = document
            .select(&PAGINATION_SELECTOR)
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| self.resolve_link(href, base_url));
        dedup_preserving_order(links)
    }

    fn resolve_link(&self, href: &str, base_url: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        let resolved = match Url::parse(base_url) {
            Ok(base) => self.normalizer.normalize_with_base(href, &base),
            Err(_) => self.normalizer.normalize(href),
        };
        let mut parsed = Url::parse(&resolved).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        parsed.set_fragment(None);
        Some(parsed.into())
    }

    fn image_variants(&self, url: &str) -> Vec<String> {
        let candidates = if let Some(caps) = DOUBLE_EXTENSION_RE.captures(url) {
            vec![
                url.to_string(),
                format!("{}.{}", &caps[1], &caps[2]),
                format!("{}.{}", &caps[1], &caps[3]),
            ]
        } else if let Some(caps) = WEBP_CANDIDATE_RE.captures(url) {
            vec![url.to_string(), format!("{}.webp", &caps[1])]
        } else {
            vec![url.to_string()]
        };

        dedup_preserving_order(candidates.iter().map(|c| self.normalizer.normalize(c)))
    }
}

/// Pick the reference to preload for an `<img>`, skipping inline data.
fn image_reference<'a>(src: Option<&'a str>, data_src: Option<&'a str>) -> Option<&'a str> {
    let usable = |value: &&str| {
        let trimmed = value.trim();
        !trimmed.is_empty() && !is_data_uri(trimmed)
    };
    match src {
        Some(primary) if usable(&primary) => Some(primary),
        _ => data_src.filter(usable),
    }
}

fn is_data_uri(reference: &str) -> bool {
    reference
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

fn dedup_preserving_order(urls: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| !url.trim().is_empty())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PAGE: &str = "https://example.com/blog/post";

    fn extractor() -> AssetExtractor {
        AssetExtractor::new(UrlNormalizer::new("https://example.com/").unwrap())
    }

    #[test]
    fn test_jpg_gets_webp_sibling() {
        let assets = extractor().extract(r#"<img src="a.jpg">"#, PAGE);
        assert_eq!(
            assets,
            vec!["https://example.com/a.jpg", "https://example.com/a.webp"]
        );
    }

    #[test]
    fn test_double_extension_expands_both_ways() {
        let assets = extractor().extract(r#"<img src="a.jpg.webp">"#, PAGE);
        assert_eq!(
            assets,
            vec![
                "https://example.com/a.jpg.webp",
                "https://example.com/a.jpg",
                "https://example.com/a.webp",
            ]
        );
    }

    #[test]
    fn test_double_extension_avif() {
        let assets = extractor().extract(r#"<img src="/img/hero.png.avif">"#, PAGE);
        assert_eq!(
            assets,
            vec![
                "https://example.com/img/hero.png.avif",
                "https://example.com/img/hero.png",
                "https://example.com/img/hero.avif",
            ]
        );
    }

    #[test]
    fn test_inline_data_falls_back_to_data_src() {
        let markup = r#"<img src="data:image/png;base64,iVBORw0KGgo=" data-src="b.png">"#;
        let assets = extractor().extract(markup, PAGE);
        assert_eq!(
            assets,
            vec!["https://example.com/b.png", "https://example.com/b.webp"]
        );
        assert!(assets.iter().all(|a| !a.contains("data:")));
    }

    #[test]
    fn test_inline_data_without_fallback_is_dropped() {
        let markup = r#"<img src="data:image/gif;base64,R0lGOD"><img src="">"#;
        assert!(extractor().extract(markup, PAGE).is_empty());
    }

    #[test]
    fn test_lazy_image_without_src() {
        let assets = extractor().extract(r#"<img data-src="/lazy.gif">"#, PAGE);
        assert_eq!(assets, vec!["https://example.com/lazy.gif"]);
    }

    #[test]
    fn test_groups_are_ordered_images_styles_scripts() {
        let markup = r#"
            <html><head>
              <script src="/app.js"></script>
              <link rel="stylesheet" href="css/site.css">
              <link rel="icon" href="/favicon.ico">
            </head><body>
              <img src="/logo.svg">
              <script>inline()</script>
            </body></html>
        "#;
        let assets = extractor().extract(markup, PAGE);
        assert_eq!(
            assets,
            vec![
                "https://example.com/logo.svg",
                "https://example.com/css/site.css",
                "https://example.com/app.js",
            ]
        );
    }

    #[test]
    fn test_deduplicates_across_groups() {
        let markup = r#"
            <img src="/a.png"><img src="/a.png"><img src="/a.webp">
            <script src="/x.js"></script><script src="x.js"></script>
        "#;
        let assets = extractor().extract(markup, PAGE);
        assert_eq!(
            assets,
            vec![
                "https://example.com/a.png",
                "https://example.com/a.webp",
                "https://example.com/x.js",
            ]
        );
    }

    #[test]
    fn test_absolute_cdn_references_are_kept() {
        let markup = r#"<script src="https://cdn.example.net/lib.js"></script>"#;
        assert_eq!(
            extractor().extract(markup, PAGE),
            vec!["https://cdn.example.net/lib.js"]
        );
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let markup = r#"<img src="a.jpg"><link rel="stylesheet" href="b.css"><script src="c.js"></script>"#;
        let ex = extractor();
        assert_eq!(ex.extract(markup, PAGE), ex.extract(markup, PAGE));
    }

    #[test]
    fn test_empty_markup() {
        assert!(extractor().extract("", PAGE).is_empty());
    }

    #[test]
    fn test_extract_links_same_origin_pages_only() {
        let markup = r##"
            <a href="/about">About</a>
            <a href="next#comments">Next</a>
            <a href="https://elsewhere.test/x">Out</a>
            <a href="/photo.jpg">Photo</a>
            <a href="#top">Top</a>
            <a href="mailto:me@example.com">Mail</a>
            <a href="/about">Again</a>
        "##;
        let links = extractor().extract_links(markup, PAGE);
        assert_eq!(
            links,
            vec!["https://example.com/about", "https://example.com/blog/next"]
        );
    }

    #[test]
    fn test_find_pagination_links() {
        let markup = r#"
            <a href="/list/page-2">2</a>
            <a href="/list?page=3">3</a>
            <a href="/list/other">other</a>
            <a href="/list/page-2">2 again</a>
        "#;
        let links = extractor().find_pagination_links(markup, "https://example.com/list");
        assert_eq!(
            links,
            vec![
                "https://example.com/list/page-2",
                "https://example.com/list?page=3",
            ]
        );
    }
}
