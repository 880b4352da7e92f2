//! Application state: the schedulers, their bound executors, the shared
//! browser, and the clients every handler needs.

use std::sync::Arc;

use autoclip_browser::{BrowserConfig, SharedBrowser};
use autoclip_scheduler::{ExportScheduler, RenderAdmission, SchedulerConfig, TranscribeScheduler};
use autoclip_storage::StorageClient;
use autoclip_stt::SttClient;
use autoclip_worker::{ExportConfig, ExportExecutor, RenderConfig, TranscribeConfig, TranscribeExecutor};
use tracing::{error, info};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<StorageClient>,
    pub stt: Arc<SttClient>,
    pub browser: Arc<SharedBrowser>,
    pub export_scheduler: Arc<ExportScheduler>,
    pub transcribe_scheduler: Arc<TranscribeScheduler>,
    pub render_admission: Arc<RenderAdmission>,
    pub render_config: RenderConfig,
    pub export_config: ExportConfig,
    pub transcribe_config: TranscribeConfig,
    pub worker_secret: Option<String>,
}

impl AppState {
    /// Create new application state, wiring each scheduler to the executor
    /// it dispatches onto (the two are mutually dependent at construction
    /// time: the executor needs a weak back-reference to the scheduler it
    /// reports progress to, and the scheduler needs the executor to dispatch
    /// onto, so the executor is built first and bound after).
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let worker_secret = std::env::var("WORKER_SECRET").ok().filter(|s| !s.is_empty());
        if worker_secret.is_none() && !config.is_development() {
            error!("WORKER_SECRET is required outside ENVIRONMENT=development");
            std::process::exit(1);
        }

        let storage = Arc::new(StorageClient::from_env().await?);
        let stt = Arc::new(SttClient::from_env()?);
        let browser = Arc::new(SharedBrowser::new(BrowserConfig::from_env()));

        let scheduler_config = SchedulerConfig::from_env();
        let render_config = RenderConfig::from_env();
        let export_config = ExportConfig::from_env();
        let transcribe_config = TranscribeConfig::from_env();

        let export_executor = ExportExecutor::new(Arc::clone(&browser), Arc::clone(&storage), export_config.clone(), scheduler_config.export_concurrency);
        let export_scheduler = Arc::new(ExportScheduler::new(scheduler_config.export_concurrency, export_executor.clone()));
        export_executor.bind_scheduler(&export_scheduler);

        let transcribe_executor = TranscribeExecutor::new(Arc::clone(&stt), Arc::clone(&storage), transcribe_config.clone());
        let transcribe_scheduler = Arc::new(TranscribeScheduler::new(scheduler_config, transcribe_executor.clone()));
        transcribe_executor.bind_scheduler(&transcribe_scheduler);

        let render_admission = Arc::new(RenderAdmission::new(scheduler_config.render_concurrency));

        info!(
            "admission limits: export={} transcribe={} render={}",
            scheduler_config.export_concurrency, scheduler_config.transcribe_concurrency, scheduler_config.render_concurrency
        );

        Ok(Self {
            config,
            storage,
            stt,
            browser,
            export_scheduler,
            transcribe_scheduler,
            render_admission,
            render_config,
            export_config,
            transcribe_config,
            worker_secret,
        })
    }
}
