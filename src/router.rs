//! Client-side navigation seam.

use std::sync::Mutex;

/// Fire-and-forget route change.
pub trait Navigator: Send + Sync {
    fn push(&self, path: &str);
}

/// Navigator that records every pushed path in order.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.history().pop()
    }
}

impl Navigator for HistoryNavigator {
    fn push(&self, path: &str) {
        tracing::debug!(%path, "navigate");
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(path.to_owned());
    }
}
