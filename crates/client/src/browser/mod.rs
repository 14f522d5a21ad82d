//! Headless-browser session management and download extraction.
//!
//! One isolated browser instance is launched per request, navigated to
//! the target page, and torn down on every exit path. After the page
//! settles, anchors are harvested in document order and the locate
//! strategies pick a download candidate; depending on the configured
//! mode the candidate is either returned as a resolved URL or clicked
//! and its response body captured over CDP.

pub mod capture;
pub mod locate;

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EventResponseReceived, GetResponseBodyParams};
use chromiumoxide::{Element, Page};
use futures_util::StreamExt;
use linkmirror_core::{Error, ExtractionMode};
use tokio::task::JoinHandle;
use url::Url;

pub use capture::CapturedFile;
pub use locate::{AnchorInfo, Candidate, LocateContext, locate_control};

/// Browser launch and per-page timing options.
#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    /// Optional Chromium executable override; when unset the library
    /// auto-detects an installation.
    pub executable: Option<PathBuf>,

    /// Fixed delay after load for client-side rendering to settle.
    pub settle_delay: Duration,

    /// Bound for each sub-operation (navigation, quiescence wait,
    /// response interception).
    pub step_timeout: Duration,
}

/// What extraction produced.
#[derive(Debug, Clone)]
pub enum Extracted {
    /// A resolved absolute URL; the caller performs the fetch.
    Link(Url),

    /// Captured bytes ready to mirror.
    File(CapturedFile),
}

/// One headless browser instance plus the task draining its CDP event
/// stream. Callers must invoke [`BrowserSession::close`] on every exit
/// path; the resolver guarantees this even when the overall deadline
/// cancels in-flight work.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch a fresh isolated browser instance.
    pub async fn launch(options: &BrowserOptions) -> Result<Self, Error> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu");

        if let Some(executable) = &options.executable {
            builder = builder.chrome_executable(executable);
        }

        let config = builder.build().map_err(Error::Navigation)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::Navigation(format!("browser launch failed: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        Ok(Self { browser, handler_task })
    }

    /// Navigate to `url` and wait for the page to settle.
    ///
    /// Navigation failure (including timeout) is fatal. The follow-up
    /// quiescence wait is best-effort: pages with long-polling or
    /// background activity never go quiet, so on timeout we proceed.
    pub async fn open(&self, url: &Url, options: &BrowserOptions) -> Result<Page, Error> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::Navigation(format!("failed to open page: {e}")))?;

        match tokio::time::timeout(options.step_timeout, page.goto(url.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(Error::Navigation(format!("navigation to {url} failed: {e}"))),
            Err(_) => {
                return Err(Error::Navigation(format!(
                    "navigation to {url} timed out after {}ms",
                    options.step_timeout.as_millis()
                )));
            }
        }

        match tokio::time::timeout(options.step_timeout, page.wait_for_navigation()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::debug!("quiescence wait errored, proceeding: {e}"),
            Err(_) => tracing::debug!("page did not reach quiescence, proceeding"),
        }

        tokio::time::sleep(options.settle_delay).await;

        Ok(page)
    }

    /// Tear down the browser instance and its event-handler task.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("browser close returned error: {e}");
        }
        self.handler_task.abort();
        tracing::debug!("browser session torn down");
    }
}

const ANCHOR_SCRIPT: &str = r#"
Array.from(document.querySelectorAll('a[href]')).map(a => ({
    href: a.getAttribute('href') || '',
    class: a.getAttribute('class') || '',
    rel: a.getAttribute('rel') || ''
}))
"#;

/// Extract a download candidate from an opened page.
///
/// In [`ExtractionMode::Resolve`] a page with no locatable control
/// degrades to its own URL as the last-resort candidate; in
/// [`ExtractionMode::Capture`] the same situation is a hard
/// [`Error::ControlNotFound`], since there is nothing to click.
pub async fn extract(
    page: &Page,
    mode: ExtractionMode,
    selector_hint: Option<&str>,
    id: &str,
    options: &BrowserOptions,
) -> Result<Extracted, Error> {
    let page_url = current_url(page).await?;

    // query the hint once; keep the element around for clicking
    let hint_element = match selector_hint {
        Some(selector) => page.find_element(selector).await.ok(),
        None => None,
    };
    let hint_href = match &hint_element {
        Some(element) => element.attribute("href").await.unwrap_or(None),
        None => None,
    };

    let anchors: Vec<AnchorInfo> = page
        .evaluate(ANCHOR_SCRIPT)
        .await
        .map_err(|e| Error::Extraction(format!("anchor harvest failed: {e}")))?
        .into_value()
        .map_err(|e| Error::Extraction(format!("anchor harvest returned malformed result: {e}")))?;

    let ctx = LocateContext { hint_href: hint_href.as_deref(), anchors: &anchors, page_url: &page_url };
    let candidate = match locate_control(&ctx) {
        Some(candidate) => candidate,
        None => {
            let fallback = missing_control_fallback(mode, &page_url)?;
            tracing::info!(%fallback, "no download control found, returning page URL");
            return Ok(Extracted::Link(fallback));
        }
    };

    match mode {
        ExtractionMode::Resolve => Ok(Extracted::Link(candidate.href().clone())),
        ExtractionMode::Capture => {
            let file = capture_candidate(page, &candidate, hint_element, id, options).await?;
            Ok(Extracted::File(file))
        }
    }
}

/// Policy for a page with no locatable download control: resolve mode
/// degrades to the page's own final URL as the last-resort candidate,
/// capture mode fails hard because there is nothing to click and
/// nothing to mirror.
fn missing_control_fallback(mode: ExtractionMode, page_url: &Url) -> Result<Url, Error> {
    match mode {
        ExtractionMode::Resolve => Ok(page_url.clone()),
        ExtractionMode::Capture => {
            Err(Error::ControlNotFound(format!("no download control found on {page_url}")))
        }
    }
}

async fn current_url(page: &Page) -> Result<Url, Error> {
    let raw = page
        .url()
        .await
        .map_err(|e| Error::Extraction(format!("failed to read page URL: {e}")))?
        .ok_or_else(|| Error::Extraction("page has no URL".into()))?;
    Url::parse(&raw).map_err(|e| Error::Extraction(format!("page URL is unparseable: {e}")))
}

/// Click the candidate and capture the resulting response body.
///
/// If no interceptable response shows up within the step timeout but
/// the candidate carries a direct link, fall back to fetching that
/// link from inside the browsing context so session cookies apply.
async fn capture_candidate(
    page: &Page,
    candidate: &Candidate,
    hint_element: Option<Element>,
    id: &str,
    options: &BrowserOptions,
) -> Result<CapturedFile, Error> {
    let element = match candidate {
        Candidate::Hint { .. } => {
            hint_element.ok_or_else(|| Error::Extraction("hinted element disappeared before click".into()))?
        }
        Candidate::Anchor { index, .. } => page
            .find_elements("a[href]")
            .await
            .map_err(|e| Error::Extraction(format!("anchor re-query failed: {e}")))?
            .into_iter()
            .nth(*index)
            .ok_or_else(|| Error::Extraction("located anchor disappeared before click".into()))?,
    };

    let mut responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(|e| Error::Extraction(format!("failed to subscribe to network events: {e}")))?;

    element
        .click()
        .await
        .map_err(|e| Error::Extraction(format!("click failed: {e}")))?;

    let matched = tokio::time::timeout(options.step_timeout, async {
        while let Some(event) = responses.next().await {
            let headers = serde_json::to_value(&event.response.headers).unwrap_or_default();
            let disposition = capture::header_lookup(&headers, "content-disposition");
            let content_type = capture::header_lookup(&headers, "content-type")
                .unwrap_or_else(|| event.response.mime_type.clone());
            if capture::is_download_response(disposition.as_deref(), Some(&content_type)) {
                return Some((event, disposition));
            }
        }
        None
    })
    .await;

    match matched {
        Ok(Some((event, disposition))) => {
            // give the body a moment to finish loading before asking for it
            tokio::time::sleep(Duration::from_millis(250)).await;
            let bytes = response_body(page, &event).await?;
            let filename = capture::derive_filename(id, disposition.as_deref(), &event.response.url);
            Ok(CapturedFile { filename, bytes })
        }
        Ok(None) | Err(_) => {
            tracing::debug!("click produced no interceptable response, trying direct link fetch");
            let href = candidate.href();
            let (disposition, bytes) = capture::fetch_in_page(page, href).await?;
            let filename = capture::derive_filename(id, disposition.as_deref(), href.as_str());
            Ok(CapturedFile { filename, bytes })
        }
    }
}

async fn response_body(page: &Page, event: &EventResponseReceived) -> Result<Vec<u8>, Error> {
    let body = page
        .execute(GetResponseBodyParams::new(event.request_id.clone()))
        .await
        .map_err(|e| Error::Extraction(format!("failed to read response body: {e}")))?;

    if body.base64_encoded {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(body.body.as_bytes())
            .map_err(|e| Error::Extraction(format!("response body was not valid base64: {e}")))
    } else {
        Ok(body.body.clone().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_control_in_resolve_mode_degrades_to_page_url() {
        let page_url = Url::parse("https://example.test/item/12345").unwrap();
        let fallback = missing_control_fallback(ExtractionMode::Resolve, &page_url).unwrap();
        assert_eq!(fallback, page_url);
    }

    #[test]
    fn test_no_control_in_capture_mode_is_not_found() {
        let page_url = Url::parse("https://example.test/item/12345").unwrap();
        let result = missing_control_fallback(ExtractionMode::Capture, &page_url);
        assert!(matches!(result, Err(Error::ControlNotFound(_))));
    }

    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_session_launch_and_teardown() {
        let options = BrowserOptions {
            settle_delay: Duration::from_millis(100),
            step_timeout: Duration::from_secs(10),
            ..Default::default()
        };
        let session = BrowserSession::launch(&options).await.unwrap();
        session.close().await;
    }

    #[tokio::test]
    #[ignore = "requires network and Chrome/Chromium"]
    async fn test_extract_resolve_mode_on_real_page() {
        let options = BrowserOptions {
            settle_delay: Duration::from_millis(500),
            step_timeout: Duration::from_secs(15),
            ..Default::default()
        };
        let session = BrowserSession::launch(&options).await.unwrap();
        let url = Url::parse("https://example.com").unwrap();
        let page = session.open(&url, &options).await.unwrap();

        // example.com has no download control; resolve mode degrades
        // to the page's own URL
        let extracted = extract(&page, ExtractionMode::Resolve, None, "test", &options).await.unwrap();
        match extracted {
            Extracted::Link(link) => assert_eq!(link.host_str(), Some("example.com")),
            Extracted::File(_) => panic!("unexpected capture"),
        }

        session.close().await;
    }
}
