//! Request-scoped link resolution.
//!
//! [`BrowserResolver`] runs the whole launch-extract-publish sequence
//! for one identifier under the overall deadline. Session teardown
//! happens after each timeout race settles, never inside it, so a
//! cancelled request can never leak a browser process.

use std::sync::Arc;
use std::time::{Duration, Instant};

use linkmirror_core::{Error, ExtractionMode};
use url::Url;

use crate::browser::{BrowserOptions, BrowserSession, Extracted, extract};
use crate::publish::Publisher;

/// Resolves an item identifier's target page to a public link.
#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    /// Produce the public link for `id`, whose rendered page lives at
    /// `target`.
    async fn resolve(&self, id: &str, target: &Url, selector_hint: Option<&str>) -> Result<String, Error>;
}

/// The production resolver: headless browser extraction plus, in
/// capture mode, an rclone publish.
pub struct BrowserResolver {
    options: BrowserOptions,
    mode: ExtractionMode,
    request_timeout: Duration,
    publisher: Arc<dyn Publisher>,
}

impl BrowserResolver {
    pub fn new(
        options: BrowserOptions,
        mode: ExtractionMode,
        request_timeout: Duration,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self { options, mode, request_timeout, publisher }
    }
}

impl BrowserResolver {
    fn deadline_exceeded(&self) -> Error {
        Error::DeadlineExceeded(self.request_timeout.as_millis() as u64)
    }
}

#[async_trait::async_trait]
impl Resolver for BrowserResolver {
    async fn resolve(&self, id: &str, target: &Url, selector_hint: Option<&str>) -> Result<String, Error> {
        let started = Instant::now();

        // launch counts against the deadline too; it runs on its own
        // task so a lost race can still finish and tear down the
        // instance instead of leaving a half-started browser behind
        let options = self.options.clone();
        let mut launch_task = tokio::spawn(async move { BrowserSession::launch(&options).await });
        let session = match tokio::time::timeout(self.request_timeout, &mut launch_task).await {
            Ok(Ok(Ok(session))) => session,
            Ok(Ok(Err(e))) => return Err(e),
            Ok(Err(e)) => return Err(Error::Navigation(format!("browser launch task failed: {e}"))),
            Err(_) => {
                tokio::spawn(async move {
                    if let Ok(Ok(session)) = launch_task.await {
                        session.close().await;
                    }
                });
                return Err(self.deadline_exceeded());
            }
        };

        let work = async {
            let page = session.open(target, &self.options).await?;
            match extract(&page, self.mode, selector_hint, id, &self.options).await? {
                Extracted::Link(link) => Ok(link.to_string()),
                Extracted::File(file) => self.publisher.publish(&file.filename, file.bytes).await,
            }
        };

        let remaining = self.request_timeout.saturating_sub(started.elapsed());
        let result = tokio::time::timeout(remaining, work).await;

        // teardown runs on success, failure, and deadline alike
        session.close().await;

        match result {
            Ok(outcome) => outcome,
            Err(_) => Err(self.deadline_exceeded()),
        }
    }
}
