/// Logging port used by every service in the checkout core.
///
/// Adapters decide where messages go; the core only formats them.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn debug(&self, message: &str);
}
