use crate::application::services::CalculationService;
use std::sync::Arc;
use std::time::Duration;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub calculation_service: Arc<CalculationService>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(calculation_service: Arc<CalculationService>, request_timeout: Duration) -> Self {
        Self {
            calculation_service,
            request_timeout,
        }
    }
}
