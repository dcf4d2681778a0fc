//! State shared by everything that happens for one document.

use std::sync::Arc;

use crate::log;

/// Shared by the load of a document, the trees built for its external references,
/// and every render of it.  Clones are cheap and see the same settings.
#[derive(Clone)]
pub struct Session {
    settings: Arc<Settings>,
}

struct Settings {
    log_enabled: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::with_logging(log::log_enabled())
    }

    fn with_logging(log_enabled: bool) -> Self {
        Session {
            settings: Arc::new(Settings { log_enabled }),
        }
    }

    /// A silent session, whatever the environment says.
    #[cfg(test)]
    pub fn new_for_test_suite() -> Self {
        Self::with_logging(false)
    }

    pub fn log_enabled(&self) -> bool {
        self.settings.log_enabled
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}
