//! Download-control location strategies.
//!
//! Given the anchors collected from a rendered page (and the result of
//! an optional caller-supplied selector hint), an ordered list of
//! strategies is evaluated until one produces a candidate:
//!
//! 1. [`SelectorHint`] - the hinted element's resolved link attribute
//! 2. [`ExtensionScan`] - first anchor whose resolved URL carries a
//!    known downloadable file extension
//! 3. [`MarkerScan`] - first anchor whose href/class/rel attributes
//!    contain the literal marker `download`
//!
//! The strategies are pure over already-collected attribute data so
//! the priority order is unit-testable without a browser.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use url::Url;

/// Attributes of one anchor element, in document order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnchorInfo {
    /// Raw href attribute (possibly relative).
    #[serde(default)]
    pub href: String,

    /// Raw class attribute.
    #[serde(default, rename = "class")]
    pub class_attr: String,

    /// Raw rel attribute.
    #[serde(default)]
    pub rel: String,
}

/// A located download candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// The caller-supplied selector hint matched and resolved.
    Hint { href: Url },

    /// An anchor was selected by scan; `index` addresses the element
    /// within the page's `a[href]` node list for later clicking.
    Anchor { index: usize, href: Url },
}

impl Candidate {
    /// The candidate's resolved absolute URL.
    pub fn href(&self) -> &Url {
        match self {
            Candidate::Hint { href } => href,
            Candidate::Anchor { href, .. } => href,
        }
    }
}

/// Inputs shared by every strategy.
#[derive(Debug)]
pub struct LocateContext<'a> {
    /// Raw href of the hinted element, when the selector hint matched
    /// an element that carries a link attribute.
    pub hint_href: Option<&'a str>,

    /// All anchors on the page, in document order.
    pub anchors: &'a [AnchorInfo],

    /// The page's own final URL; base for relative resolution.
    pub page_url: &'a Url,
}

/// One way of locating a download control.
pub trait LocateStrategy {
    /// Strategy name for tracing.
    fn name(&self) -> &'static str;

    /// Produce a candidate, or `None` to fall through to the next
    /// strategy.
    fn locate(&self, ctx: &LocateContext<'_>) -> Option<Candidate>;
}

/// Caller-supplied selector hint with a resolvable link attribute.
pub struct SelectorHint;

impl LocateStrategy for SelectorHint {
    fn name(&self) -> &'static str {
        "selector_hint"
    }

    fn locate(&self, ctx: &LocateContext<'_>) -> Option<Candidate> {
        let href = ctx.hint_href?;
        let resolved = ctx.page_url.join(href).ok()?;
        Some(Candidate::Hint { href: resolved })
    }
}

/// Archive, video, audio, document, and executable/package formats.
static DOWNLOAD_EXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\.(zip|rar|7z|tar|gz|tgz|bz2|xz|iso|mp4|mkv|avi|mov|webm|mp3|flac|pdf|docx?|xlsx?|pptx?|epub|csv|exe|msi|dmg|apk|deb|rpm|appimage)([?#]|$)",
    )
    .expect("invalid extension regex")
});

/// Does this URL look like a direct file download?
pub fn is_downloadable_url(url: &str) -> bool {
    DOWNLOAD_EXT_RE.is_match(url)
}

/// First anchor whose resolved URL matches a downloadable extension.
pub struct ExtensionScan;

impl LocateStrategy for ExtensionScan {
    fn name(&self) -> &'static str {
        "extension_scan"
    }

    fn locate(&self, ctx: &LocateContext<'_>) -> Option<Candidate> {
        for (index, anchor) in ctx.anchors.iter().enumerate() {
            let Ok(resolved) = ctx.page_url.join(&anchor.href) else {
                continue;
            };
            if is_downloadable_url(resolved.as_str()) {
                return Some(Candidate::Anchor { index, href: resolved });
            }
        }
        None
    }
}

/// First anchor whose href, class, or rel attributes contain the
/// literal marker `download` (case-insensitive).
pub struct MarkerScan;

impl LocateStrategy for MarkerScan {
    fn name(&self) -> &'static str {
        "marker_scan"
    }

    fn locate(&self, ctx: &LocateContext<'_>) -> Option<Candidate> {
        for (index, anchor) in ctx.anchors.iter().enumerate() {
            let haystack =
                format!("{} {} {}", anchor.href, anchor.class_attr, anchor.rel).to_lowercase();
            if !haystack.contains("download") {
                continue;
            }
            let Ok(resolved) = ctx.page_url.join(&anchor.href) else {
                continue;
            };
            return Some(Candidate::Anchor { index, href: resolved });
        }
        None
    }
}

/// Evaluate the strategies in priority order, stopping at the first
/// match. `None` means nothing on the page looked like a download
/// control; the caller applies its mode-specific fallback policy.
pub fn locate_control(ctx: &LocateContext<'_>) -> Option<Candidate> {
    let strategies: [&dyn LocateStrategy; 3] = [&SelectorHint, &ExtensionScan, &MarkerScan];

    for strategy in strategies {
        if let Some(candidate) = strategy.locate(ctx) {
            tracing::debug!(strategy = strategy.name(), href = %candidate.href(), "located download control");
            return Some(candidate);
        }
    }
    None
}
