//! Shared application state for the coordinator

use std::sync::Arc;

use orchestrator::PaymentFlows;

use crate::records::RecordStore;

/// Shared application state passed to all handlers.
///
/// Flows hold no session between requests; each request connects on its own.
#[derive(Clone)]
pub struct AppState {
    pub flows: Arc<PaymentFlows>,
    pub records: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(flows: PaymentFlows, records: Arc<dyn RecordStore>) -> Self {
        Self {
            flows: Arc::new(flows),
            records,
        }
    }
}
