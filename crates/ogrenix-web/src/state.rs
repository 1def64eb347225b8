//! Shared application state for the lesson server.

use std::sync::Arc;
use std::time::Duration;

use ogrenix_config::Config;
use ogrenix_llm::{LlmBackend, OpenAiCompatibleBackend};
use ogrenix_render::{ChartExecutor, PythonChartEngine};

use crate::activity::ActivityLog;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: Config,
    pub llm: Arc<dyn LlmBackend>,
    /// Process-wide chart gate; every generation renders through it.
    pub executor: Arc<ChartExecutor>,
    pub activity: ActivityLog,
}

impl AppState {
    /// Wires the default backend and chart engine from configuration.
    pub fn from_config(config: Config) -> Self {
        let llm: Arc<dyn LlmBackend> = Arc::new(OpenAiCompatibleBackend::new(
            config.llm.base_url.clone(),
            config.llm.model.clone(),
            config.llm.api_key.clone(),
        ));
        Self::with_backend(config, llm)
    }

    /// State with a caller-supplied backend. Tests inject fakes here.
    pub fn with_backend(config: Config, llm: Arc<dyn LlmBackend>) -> Self {
        let engine = PythonChartEngine::new(
            config.render.python_bin.clone(),
            Duration::from_secs(config.render.chart_timeout_secs),
        );
        Self {
            config,
            llm,
            executor: Arc::new(ChartExecutor::new(Arc::new(engine))),
            activity: ActivityLog::new(),
        }
    }
}

pub type SharedState = Arc<AppState>;
