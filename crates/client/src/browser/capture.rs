//! Byte capture for clicked download controls.
//!
//! When the pipeline runs in capture mode it clicks the located
//! control and intercepts the resulting network response over CDP.
//! The matching predicate and filename derivation are pure functions
//! so they can be tested without a browser; the in-page fetch fallback
//! reuses the browsing session's cookies by running `fetch` inside the
//! page instead of opening an independent connection.

use std::sync::LazyLock;

use base64::Engine;
use chromiumoxide::Page;
use linkmirror_core::Error;
use regex::Regex;
use serde::Deserialize;
use url::Url;

/// A fully captured resource.
#[derive(Debug, Clone)]
pub struct CapturedFile {
    /// Filename to publish under.
    pub filename: String,

    /// Complete response body.
    pub bytes: Vec<u8>,
}

/// Does this response look like the file the click was meant to
/// produce? Matches a content-disposition containing `attachment`, or
/// any content-type that is not HTML/script/style page furniture.
pub fn is_download_response(content_disposition: Option<&str>, content_type: Option<&str>) -> bool {
    if let Some(disposition) = content_disposition
        && disposition.to_lowercase().contains("attachment")
    {
        return true;
    }

    match content_type {
        Some(ct) => {
            let ct = ct.to_lowercase();
            !(ct.contains("text/html") || ct.contains("javascript") || ct.contains("text/css"))
        }
        None => false,
    }
}

static FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)filename\*?="?([^";]+)"?"#).expect("invalid filename regex"));

/// Pull a filename out of a content-disposition header value.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let raw = FILENAME_RE.captures(value)?.get(1)?.as_str().trim();
    // strip any path components a hostile header might carry
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    if name.is_empty() { None } else { Some(name.to_string()) }
}

/// Derive the filename for a captured resource: content-disposition,
/// then the response URL's last path segment, then a synthetic
/// identifier-plus-timestamp name.
pub fn derive_filename(id: &str, content_disposition: Option<&str>, response_url: &str) -> String {
    if let Some(name) = content_disposition.and_then(filename_from_disposition) {
        return name;
    }

    if let Ok(url) = Url::parse(response_url)
        && let Some(segment) = url.path_segments().and_then(|mut s| s.next_back())
        && !segment.is_empty()
    {
        return segment.to_string();
    }

    format!("{id}-{}", chrono::Utc::now().timestamp())
}

/// Case-insensitive lookup in a CDP header map.
pub fn header_lookup(headers: &serde_json::Value, name: &str) -> Option<String> {
    headers
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.as_str())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct InPageFetchResult {
    ok: bool,
    status: u16,
    filename: Option<String>,
    base64: Option<String>,
}

/// Build the in-page fetch expression for `url`.
///
/// The URL goes in as a JSON string literal; quotes or backslashes in
/// a page-controlled href must not be able to break out of the
/// evaluated source.
fn in_page_fetch_script(url: &Url) -> String {
    let url_literal = serde_json::to_string(url.as_str()).expect("string serialization is infallible");
    format!(
        r#"
        (async () => {{
            try {{
                const r = await fetch({url_literal}, {{ method: 'GET', credentials: 'same-origin' }});
                if (!r.ok) {{
                    return {{ ok: false, status: r.status, filename: null, base64: null }};
                }}
                const blob = await r.blob();
                const bytes = new Uint8Array(await blob.arrayBuffer());
                let binary = '';
                for (let i = 0; i < bytes.length; i++) binary += String.fromCharCode(bytes[i]);
                return {{
                    ok: true,
                    status: r.status,
                    filename: r.headers.get('content-disposition'),
                    base64: btoa(binary)
                }};
            }} catch (e) {{
                return {{ ok: false, status: 0, filename: String(e), base64: null }};
            }}
        }})()
        "#
    )
}

/// Fetch `url` from inside the browsing context so the session's
/// cookies apply, returning the body and any filename the server
/// suggested via content-disposition.
pub(crate) async fn fetch_in_page(page: &Page, url: &Url) -> Result<(Option<String>, Vec<u8>), Error> {
    let result: InPageFetchResult = page
        .evaluate(in_page_fetch_script(url))
        .await
        .map_err(|e| Error::Extraction(format!("in-page fetch failed: {e}")))?
        .into_value()
        .map_err(|e| Error::Extraction(format!("in-page fetch returned malformed result: {e}")))?;

    if !result.ok {
        return Err(Error::Extraction(format!("in-page fetch failed with status {}", result.status)));
    }

    let encoded = result
        .base64
        .ok_or_else(|| Error::Extraction("in-page fetch returned no body".into()))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| Error::Extraction(format!("in-page fetch body was not valid base64: {e}")))?;

    Ok((result.filename, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_disposition_matches() {
        assert!(is_download_response(Some("attachment; filename=\"x.zip\""), Some("text/html")));
        assert!(is_download_response(Some("Attachment"), None));
    }

    #[test]
    fn test_page_furniture_content_types_rejected() {
        assert!(!is_download_response(None, Some("text/html; charset=utf-8")));
        assert!(!is_download_response(None, Some("application/javascript")));
        assert!(!is_download_response(None, Some("text/css")));
        assert!(!is_download_response(None, None));
    }

    #[test]
    fn test_binary_content_type_matches() {
        assert!(is_download_response(None, Some("application/octet-stream")));
        assert!(is_download_response(None, Some("application/zip")));
        assert!(is_download_response(Some("inline"), Some("video/mp4")));
    }

    #[test]
    fn test_filename_from_disposition() {
        assert_eq!(filename_from_disposition("attachment; filename=\"x.zip\"").as_deref(), Some("x.zip"));
        assert_eq!(filename_from_disposition("attachment; filename=x.zip").as_deref(), Some("x.zip"));
        assert_eq!(filename_from_disposition("inline").as_deref(), None);
    }

    #[test]
    fn test_filename_from_disposition_strips_paths() {
        assert_eq!(
            filename_from_disposition("attachment; filename=\"../../etc/passwd\"").as_deref(),
            Some("passwd")
        );
    }

    #[test]
    fn test_derive_filename_prefers_disposition() {
        let name = derive_filename("12345", Some("attachment; filename=\"report.pdf\""), "https://example.test/f/x.zip");
        assert_eq!(name, "report.pdf");
    }

    #[test]
    fn test_derive_filename_falls_back_to_url_path() {
        let name = derive_filename("12345", None, "https://example.test/f/x.zip?token=abc");
        assert_eq!(name, "x.zip");
    }

    #[test]
    fn test_derive_filename_synthesizes_when_nothing_usable() {
        let name = derive_filename("12345", None, "https://example.test/");
        assert!(name.starts_with("12345-"));
    }

    #[test]
    fn test_fetch_script_quotes_url_as_json_literal() {
        let url = Url::parse("https://example.test/f/x.zip?token=abc").unwrap();
        let script = in_page_fetch_script(&url);
        assert!(script.contains(r#"fetch("https://example.test/f/x.zip?token=abc","#));
    }

    #[test]
    fn test_fetch_script_survives_single_quote_in_url() {
        // the url crate leaves apostrophes unencoded in paths; the
        // generated expression must still be well-formed
        let url = Url::parse("https://example.test/f/x'.zip").unwrap();
        let script = in_page_fetch_script(&url);
        assert!(script.contains(r#"fetch("https://example.test/f/x'.zip","#));
        assert!(!script.contains("fetch('"));
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let headers = serde_json::json!({
            "Content-Disposition": "attachment; filename=\"x.zip\"",
            "Content-Type": "application/zip"
        });
        assert_eq!(
            header_lookup(&headers, "content-disposition").as_deref(),
            Some("attachment; filename=\"x.zip\"")
        );
        assert_eq!(header_lookup(&headers, "x-missing"), None);
    }
}
