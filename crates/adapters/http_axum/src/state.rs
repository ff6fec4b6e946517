//! Shared application state for axum handlers.

use std::sync::Arc;

use gridcharge_app::automation_engine::AutomationEngine;
use gridcharge_app::ports::{DeviceConnector, JobStore};

/// Application state shared across all axum handlers.
///
/// Generic over the job store and device connector to avoid dynamic
/// dispatch. `Clone` is implemented manually so the underlying types do not
/// need to be `Clone`; only the `Arc` is cloned.
pub struct AppState<S, C> {
    pub engine: Arc<AutomationEngine<S, C>>,
}

impl<S, C> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<S, C> AppState<S, C>
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    /// Wrap an engine that is shared with background tasks.
    pub fn new(engine: Arc<AutomationEngine<S, C>>) -> Self {
        Self { engine }
    }
}
