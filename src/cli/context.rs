use std::sync::Arc;

use anyhow::Context as _;
use tracing::debug;

use super::utils::{ConsoleNotifier, StdinConfirm};
use super::{Cli, OutputFormat};
use crate::config::{self, AppConfig, ApiConfig};
use crate::error::ApiError;
use crate::guard::{self, GuardDecision, TracingNavigator, LOGIN_ROUTE};
use crate::rides::{AutoConfirm, Confirm};
use crate::session::SessionStore;
use crate::storage::FileCredentialStore;

/// Everything a command needs: the restored session and the user-facing sinks
pub struct Context {
    pub config: &'static AppConfig,
    pub output: OutputFormat,
    pub session: SessionStore,
    pub notifier: Arc<ConsoleNotifier>,
    pub confirm: Arc<dyn Confirm>,
}

impl Context {
    pub async fn open(cli: &Cli, output: OutputFormat) -> anyhow::Result<Self> {
        let config = config::config();

        let api = match &cli.api_url {
            Some(url) => ApiConfig {
                base_url: url.clone(),
                ..config.api.clone()
            },
            None => config.api.clone(),
        };

        let credentials = FileCredentialStore::in_config_dir(config.storage.session_dir.as_deref())
            .context("Unable to locate the session directory")?;
        debug!("Session file: {}", credentials.path().display());

        let notifier = Arc::new(ConsoleNotifier::new(output, config.notifications.enabled));
        let confirm: Arc<dyn Confirm> = if cli.yes {
            Arc::new(AutoConfirm)
        } else {
            Arc::new(StdinConfirm)
        };

        let session = SessionStore::new(&api, Arc::new(credentials), notifier.clone(), Arc::new(TracingNavigator))?;
        session.initialize().await;

        Ok(Self {
            config,
            output,
            session,
            notifier,
            confirm,
        })
    }

    /// Apply the route guard for the page a command stands in for
    pub fn require(&self, route: &str) -> Result<(), ApiError> {
        match guard::check(&self.session.snapshot(), route) {
            GuardDecision::Allow => Ok(()),
            GuardDecision::Redirect(LOGIN_ROUTE) | GuardDecision::Wait => Err(ApiError::validation(
                "Not logged in. Run `rapido auth login` first.",
            )),
            GuardDecision::Redirect(_) => Err(ApiError::forbidden(format!(
                "Your account does not have access to {}",
                route
            ))),
        }
    }
}
