use aseguradora_store::PolicyStore;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Storage engine; the only long-lived resource
    pub store: Arc<dyn PolicyStore>,

    /// Prometheus metrics handle for rendering, when a recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self {
            store,
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
