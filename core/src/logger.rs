//! Logging capability handed to the validator and the loader.
//!
//! The validator only ever calls [`Logger::warn`]; `debug` and `error` exist
//! for the loader side of the pipeline.

use std::sync::{Mutex, MutexGuard};

use tracing::Level;

/// Severity-levelled message sink.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards every message to the matching `tracing` macro.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "pkg_manifest", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "pkg_manifest", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "pkg_manifest", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "pkg_manifest", "{message}");
    }
}

/// Records messages in memory, in call order.
///
/// # Examples
///
/// ```
/// use pkg_manifest_core::{Logger, MemoryLogger};
///
/// let logger = MemoryLogger::new();
/// logger.warn("Warning: something");
/// logger.debug("details");
/// assert_eq!(logger.warnings(), vec!["Warning: something".to_string()]);
/// assert_eq!(logger.entries().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded messages with their level.
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.lock().clone()
    }

    /// Messages recorded at `level`.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages(Level::WARN)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn record(&self, level: Level, message: &str) {
        self.lock().push((level, message.to_string()));
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(Level, String)>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Logger for MemoryLogger {
    fn debug(&self, message: &str) {
        self.record(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.record(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.record(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.record(Level::ERROR, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_keeps_levels_apart() {
        let logger = MemoryLogger::new();
        logger.info("a");
        logger.error("b");
        logger.warn("c");

        assert_eq!(logger.messages(Level::INFO), vec!["a".to_string()]);
        assert_eq!(logger.messages(Level::ERROR), vec!["b".to_string()]);
        assert_eq!(logger.warnings(), vec!["c".to_string()]);

        logger.clear();
        assert!(logger.entries().is_empty());
    }

    #[test]
    fn test_loggers_are_object_safe() {
        let loggers: Vec<Box<dyn Logger>> = vec![Box::new(TracingLogger), Box::new(MemoryLogger::new())];
        for logger in &loggers {
            logger.warn("shared");
        }
    }
}
