//! Configuration for the shared browser lifecycle (§4.5.1), sourced from
//! `AUTOCLIP_BROWSER_*` env vars (§6).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Path or name of the WebDriver binary to spawn (chromedriver by default).
    pub webdriver_binary: String,
    pub webdriver_port: u16,
    pub launch_timeout: Duration,
    pub navigation_timeout: Duration,
    pub ready_timeout: Duration,
    pub frame_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_binary: "chromedriver".to_string(),
            webdriver_port: 9515,
            launch_timeout: Duration::from_secs(15),
            navigation_timeout: Duration::from_secs(30),
            ready_timeout: Duration::from_secs(30),
            frame_timeout: Duration::from_secs(10),
        }
    }
}

impl BrowserConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            webdriver_binary: std::env::var("AUTOCLIP_BROWSER_WEBDRIVER_BINARY").unwrap_or(defaults.webdriver_binary),
            webdriver_port: env_u16("AUTOCLIP_BROWSER_WEBDRIVER_PORT", defaults.webdriver_port),
            launch_timeout: Duration::from_millis(env_u64("AUTOCLIP_BROWSER_LAUNCH_TIMEOUT_MS", defaults.launch_timeout.as_millis() as u64)),
            navigation_timeout: Duration::from_millis(env_u64("AUTOCLIP_BROWSER_NAVIGATION_TIMEOUT_MS", defaults.navigation_timeout.as_millis() as u64)),
            ready_timeout: Duration::from_millis(env_u64("AUTOCLIP_BROWSER_READY_TIMEOUT_MS", defaults.ready_timeout.as_millis() as u64)),
            frame_timeout: Duration::from_millis(env_u64("AUTOCLIP_BROWSER_FRAME_TIMEOUT_MS", defaults.frame_timeout.as_millis() as u64)),
        }
    }

    /// Sandbox/shared-memory flags appropriate for a container (§4.5.1).
    pub fn chrome_args(&self) -> Vec<&'static str> {
        vec!["--headless=new", "--no-sandbox", "--disable-dev-shm-usage", "--disable-gpu"]
    }

    pub fn webdriver_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.webdriver_port)
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}
