use business::domain::logger::Logger;
use tracing::{debug, error, info, warn};

const TARGET: &str = "storefront";

/// Forwards business log lines to `tracing`, tagged with the component
/// that emitted them.
#[derive(Debug, Clone, Copy)]
pub struct TracingLogger {
    component: &'static str,
}

impl TracingLogger {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("core")
    }
}

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        info!(target: TARGET, component = self.component, "{}", message);
    }
    fn warn(&self, message: &str) {
        warn!(target: TARGET, component = self.component, "{}", message);
    }
    fn error(&self, message: &str) {
        error!(target: TARGET, component = self.component, "{}", message);
    }
    fn debug(&self, message: &str) {
        debug!(target: TARGET, component = self.component, "{}", message);
    }
}
