//! Per-job browser context: navigation, readiness wait, and the renderer
//! contract (`waitForReady`/`setTime`) from §4.5.3. Closed on every exit
//! path — success, error, or timeout.

use std::time::Duration;

use fantoccini::wd::Capabilities;
use fantoccini::{ClientBuilder, Locator};
use serde_json::json;
use tracing::{debug, warn};

use crate::browser::BrowserHandle;
use crate::error::{BrowserError, BrowserResult};
use crate::viewport::RenderPlan;

const STAGE_SELECTOR: &str = "[data-export-stage]";
const MIN_SCREENSHOT_BYTES: usize = 100;

pub struct JobContext {
    client: fantoccini::Client,
}

impl JobContext {
    /// Open a new WebDriver session (the per-job "context/page") against the
    /// shared browser handle, sized per `plan`.
    pub async fn open(handle: &BrowserHandle, plan: &RenderPlan) -> BrowserResult<Self> {
        let mut capabilities = Capabilities::new();
        capabilities.insert("pageLoadStrategy".to_string(), json!("eager"));

        let client = ClientBuilder::native().capabilities(capabilities).connect(&handle.webdriver_url).await?;

        client.set_window_size(plan.viewport.width, plan.viewport.height).await?;

        Ok(Self { client })
    }

    /// Navigate to `url` and wait for the renderer's readiness contract to
    /// resolve, each step under its own deadline.
    pub async fn navigate_and_wait_ready(&self, url: &str, navigation_timeout: Duration, ready_timeout: Duration) -> BrowserResult<()> {
        tokio::time::timeout(navigation_timeout, self.client.goto(url)).await.map_err(|_| BrowserError::timeout("navigation", navigation_timeout.as_secs()))??;

        tokio::time::timeout(ready_timeout, self.poll_for_api()).await.map_err(|_| BrowserError::timeout("waitForReady", ready_timeout.as_secs()))??;

        Ok(())
    }

    async fn poll_for_api(&self) -> BrowserResult<()> {
        loop {
            let api_present = self
                .client
                .execute("return !!(window.__EDITOR_EXPORT_API__ && typeof window.__EDITOR_EXPORT_API__.waitForReady === 'function');", vec![])
                .await?;
            if api_present.as_bool().unwrap_or(false) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        self.client
            .execute_async(
                "const done = arguments[arguments.length - 1]; window.__EDITOR_EXPORT_API__.waitForReady().then(() => done(true)).catch((e) => done(false));",
                vec![],
            )
            .await?;

        Ok(())
    }

    /// Deterministically advance the renderer's timeline to `seconds`.
    pub async fn set_time(&self, seconds: f64, deadline: Duration) -> BrowserResult<()> {
        let result = tokio::time::timeout(
            deadline,
            self.client.execute_async(
                "const done = arguments[arguments.length - 1]; window.__EDITOR_EXPORT_API__.setTime(arguments[0]).then(() => done(true)).catch((e) => done(String(e)));",
                vec![json!(seconds)],
            ),
        )
        .await
        .map_err(|_| BrowserError::timeout("setTime", deadline.as_secs()))??;

        if result.as_bool() != Some(true) {
            return Err(BrowserError::RendererClosed(result.to_string()));
        }
        Ok(())
    }

    /// Capture the `data-export-stage` element as an image buffer.
    pub async fn capture_stage_screenshot(&self, deadline: Duration) -> BrowserResult<Vec<u8>> {
        let element = tokio::time::timeout(deadline, self.client.find(Locator::Css(STAGE_SELECTOR)))
            .await
            .map_err(|_| BrowserError::timeout("locate stage element", deadline.as_secs()))?
            .map_err(|_| BrowserError::ElementNotFound(STAGE_SELECTOR.to_string()))?;

        let bytes = tokio::time::timeout(deadline, element.screenshot()).await.map_err(|_| BrowserError::timeout("screenshot", deadline.as_secs()))??;

        if bytes.len() < MIN_SCREENSHOT_BYTES {
            return Err(BrowserError::ScreenshotTooSmall(bytes.len()));
        }

        Ok(bytes)
    }

    /// Close the session. Safe to call on every exit path; errors are logged
    /// but not propagated since the job has already concluded.
    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            warn!("error closing browser context: {e}");
        } else {
            debug!("browser context closed");
        }
    }
}
