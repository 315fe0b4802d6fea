use std::sync::{Arc, Mutex, PoisonError};

/// Navigation side effect, owned by the rendering layer
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

#[derive(Debug, Default, Clone)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, path: &str) {
        tracing::info!("Navigating to {}", path);
    }
}

/// Records navigation history
#[derive(Debug, Default, Clone)]
pub struct MemoryNavigator {
    history: Arc<Mutex<Vec<String>>>,
}

impl MemoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn current(&self) -> Option<String> {
        self.history().last().cloned()
    }
}

impl Navigator for MemoryNavigator {
    fn navigate(&self, path: &str) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
