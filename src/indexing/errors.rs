use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};

/// One recorded error: when, what kind, and the message with its context
#[derive(Debug, Clone)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub message: String,
}

/// Append-only concurrent log of errors observed during a run
///
/// Page-level failures land here instead of failing the run; the sink is
/// cleared when a new run starts.
#[derive(Debug, Default)]
pub struct ErrorsSink {
    entries: Mutex<Vec<ErrorEntry>>,
}

impl ErrorsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(kind = %kind, message = %message, "indexing error recorded");
        self.lock().push(ErrorEntry {
            timestamp: Utc::now(),
            kind: kind.to_string(),
            message,
        });
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn entries(&self) -> Vec<ErrorEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ErrorEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_read() {
        let sink = ErrorsSink::new();
        assert!(sink.is_empty());

        sink.record("IO_ERROR", "fetch https://example.com/a: timed out");
        sink.record("DB_ERROR", "index https://example.com/b: locked");

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, "IO_ERROR");
        assert!(entries[1].message.contains("/b"));
    }

    #[test]
    fn test_clear() {
        let sink = ErrorsSink::new();
        sink.record("IO_ERROR", "x");
        sink.clear();
        assert!(sink.is_empty());
    }
}
