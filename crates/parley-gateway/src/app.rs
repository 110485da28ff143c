use parley_agent::pipeline::{RelayContext, RelayObserver, TracingObserver};
use parley_agent::AgentRuntime;
use parley_core::config::ParleyConfig;
use parley_format::ResponseFormatter;

/// Central shared state, passed as `Arc<AppState>` to the Discord adapter.
pub struct AppState {
    pub config: ParleyConfig,
    pub agent: AgentRuntime,
    pub formatter: ResponseFormatter,
    observer: TracingObserver,
}

impl AppState {
    pub fn new(config: ParleyConfig, agent: AgentRuntime) -> Self {
        let formatter = ResponseFormatter::new(config.format.clone());
        Self {
            config,
            agent,
            formatter,
            observer: TracingObserver,
        }
    }
}

impl RelayContext for AppState {
    fn agent(&self) -> &AgentRuntime {
        &self.agent
    }

    fn formatter(&self) -> &ResponseFormatter {
        &self.formatter
    }

    fn config(&self) -> &ParleyConfig {
        &self.config
    }

    fn observer(&self) -> &dyn RelayObserver {
        &self.observer
    }
}
