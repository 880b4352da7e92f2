//! Shared headless-browser lifecycle (§4.5.1, §9 "Shared browser as
//! process-wide state"). The WebDriver binary is spawned once; concurrent
//! export jobs arriving during startup dedupe onto the same launch via
//! `tokio::sync::OnceCell::get_or_try_init`. On disconnect the slot is
//! replaced with a fresh, unpopulated cell so the next job re-launches.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use crate::config::BrowserConfig;
use crate::error::{BrowserError, BrowserResult};

/// A running WebDriver server process and the URL fantoccini sessions
/// connect to. Held behind an `Arc` so every job sees the same handle.
pub struct BrowserHandle {
    child: Mutex<Child>,
    pub webdriver_url: String,
}

impl BrowserHandle {
    /// True once the process has disconnected on its own (crashed, killed).
    pub async fn is_disconnected(&self) -> bool {
        matches!(self.child.lock().await.try_wait(), Ok(Some(_)))
    }
}

impl Drop for BrowserHandle {
    fn drop(&mut self) {
        if let Ok(mut child) = self.child.try_lock() {
            let _ = child.start_kill();
        }
    }
}

pub struct SharedBrowser {
    config: BrowserConfig,
    slot: Mutex<Arc<OnceCell<Arc<BrowserHandle>>>>,
}

impl SharedBrowser {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config, slot: Mutex::new(Arc::new(OnceCell::new())) }
    }

    /// Return the shared browser handle, launching it on first use.
    /// Concurrent callers during launch all await the same future.
    pub async fn get_or_launch(&self) -> BrowserResult<Arc<BrowserHandle>> {
        loop {
            let cell = { self.slot.lock().await.clone() };

            if let Some(handle) = cell.get() {
                if handle.is_disconnected().await {
                    warn!("shared browser process disconnected; re-launching on next request");
                    self.on_disconnected().await;
                    continue;
                }
                return Ok(handle.clone());
            }

            let handle = cell.get_or_try_init(|| self.launch()).await?;
            return Ok(handle.clone());
        }
    }

    /// Clear the launch slot so the next call to `get_or_launch` starts a
    /// fresh process (§4.5.1's "on disconnected, clear the singleton slot").
    pub async fn on_disconnected(&self) {
        let mut slot = self.slot.lock().await;
        *slot = Arc::new(OnceCell::new());
    }

    async fn launch(&self) -> BrowserResult<Arc<BrowserHandle>> {
        info!("launching shared webdriver process ({})", self.config.webdriver_binary);

        let child = Command::new(&self.config.webdriver_binary)
            .arg(format!("--port={}", self.config.webdriver_port))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BrowserError::SpawnFailed { binary: self.config.webdriver_binary.clone(), source })?;

        let webdriver_url = self.config.webdriver_url();
        wait_for_port(self.config.webdriver_port, self.config.launch_timeout).await?;

        info!("webdriver process ready at {webdriver_url}");
        Ok(Arc::new(BrowserHandle { child: Mutex::new(child), webdriver_url }))
    }
}

async fn wait_for_port(port: u16, deadline: Duration) -> BrowserResult<()> {
    let start = tokio::time::Instant::now();
    loop {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return Ok(());
        }
        if start.elapsed() >= deadline {
            return Err(BrowserError::LaunchTimeout(deadline.as_secs()));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
