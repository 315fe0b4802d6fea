use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub query: QueryConfig,
    pub notifications: NotificationConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub debounce_ms: u64,
    pub refetch_interval_ms: u64,
    pub fast_refetch_interval_ms: u64,
    pub slow_refetch_interval_ms: u64,
    pub page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub session_dir: Option<PathBuf>,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: 10_000,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl QueryConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn refetch_interval(&self) -> Duration {
        Duration::from_millis(self.refetch_interval_ms)
    }

    /// Single-record views that change quickly
    pub fn fast_refetch_interval(&self) -> Duration {
        Duration::from_millis(self.fast_refetch_interval_ms)
    }

    /// Aggregates that change slowly
    pub fn slow_refetch_interval(&self) -> Duration {
        Duration::from_millis(self.slow_refetch_interval_ms)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            refetch_interval_ms: 30_000,
            fast_refetch_interval_ms: 10_000,
            slow_refetch_interval_ms: 60_000,
            page_size: 10,
            max_page_size: 100,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("RAPIDO_API_URL") {
            self.api.base_url = v;
        }
        if let Ok(v) = env::var("RAPIDO_API_TIMEOUT") {
            self.api.timeout_ms = v.parse().unwrap_or(self.api.timeout_ms);
        }

        // Query overrides
        if let Ok(v) = env::var("RAPIDO_QUERY_DEBOUNCE_MS") {
            self.query.debounce_ms = v.parse().unwrap_or(self.query.debounce_ms);
        }
        if let Ok(v) = env::var("RAPIDO_QUERY_REFETCH_INTERVAL") {
            self.query.refetch_interval_ms = positive(&v).unwrap_or(self.query.refetch_interval_ms);
        }
        if let Ok(v) = env::var("RAPIDO_QUERY_FAST_REFETCH_INTERVAL") {
            self.query.fast_refetch_interval_ms = positive(&v).unwrap_or(self.query.fast_refetch_interval_ms);
        }
        if let Ok(v) = env::var("RAPIDO_QUERY_SLOW_REFETCH_INTERVAL") {
            self.query.slow_refetch_interval_ms = positive(&v).unwrap_or(self.query.slow_refetch_interval_ms);
        }
        if let Ok(v) = env::var("RAPIDO_QUERY_PAGE_SIZE") {
            self.query.page_size = v.parse().unwrap_or(self.query.page_size);
        }

        // Notification overrides
        if let Ok(v) = env::var("RAPIDO_ENABLE_NOTIFICATIONS") {
            self.notifications.enabled = v.parse().unwrap_or(self.notifications.enabled);
        }
        if let Ok(v) = env::var("RAPIDO_NOTIFICATION_TIMEOUT") {
            self.notifications.timeout_ms = v.parse().unwrap_or(self.notifications.timeout_ms);
        }

        // Storage overrides
        if let Ok(v) = env::var("RAPIDO_CONFIG_DIR") {
            self.storage.session_dir = Some(PathBuf::from(v));
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://localhost:5000/api".to_string(),
                timeout_ms: 10_000,
            },
            query: QueryConfig::default(),
            notifications: NotificationConfig {
                enabled: true,
                timeout_ms: 5_000,
            },
            storage: StorageConfig { session_dir: None },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://staging-api.rapido.example.com/api".to_string(),
                timeout_ms: 10_000,
            },
            query: QueryConfig::default(),
            notifications: NotificationConfig {
                enabled: true,
                timeout_ms: 5_000,
            },
            storage: StorageConfig { session_dir: None },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://api.rapido.example.com/api".to_string(),
                timeout_ms: 8_000,
            },
            query: QueryConfig {
                // Production backs off polling to keep load predictable
                refetch_interval_ms: 60_000,
                ..QueryConfig::default()
            },
            notifications: NotificationConfig {
                enabled: true,
                timeout_ms: 4_000,
            },
            storage: StorageConfig { session_dir: None },
        }
    }
}

// Intervals of zero would make tokio's interval panic
fn positive(v: &str) -> Option<u64> {
    v.parse().ok().filter(|v| *v > 0)
}

// Global read-only config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
