use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use reqwest::Method;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::gateway::{json_body, Gateway, RequestOptions, SessionExpiry};
use crate::guard::{Navigator, LOGIN_ROUTE};
use crate::notify::{Notification, Notifier};
use crate::storage::{CredentialStore, PersistedSession, StorageError};
use crate::types::{Credentials, PasswordChange, ProfileUpdate, Registration, Role, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionStatus {
    #[default]
    Uninitialized,
    Loading,
    Authenticated,
    Unauthenticated,
}

/// The single record of who is signed in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    pub status: SessionStatus,
    pub last_error: Option<ApiError>,
}

impl Session {
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

#[derive(Debug, Deserialize)]
struct AuthPayload {
    token: String,
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    user: UserProfile,
}

/// State shared with the gateway so a forced sign-out still goes through
/// the session store's own writer.
struct SessionCore {
    state: RwLock<Session>,
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    status_tx: watch::Sender<SessionStatus>,
}

impl SessionCore {
    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let (result, status) = {
            let mut session = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let before = session.status;
            let result = f(&mut session);
            if before != session.status {
                debug!("Session {:?} -> {:?}", before, session.status);
            }
            (result, session.status)
        };
        self.status_tx.send_replace(status);
        result
    }

    /// Clear the persisted pair and reset to signed-out.
    ///
    /// Storage is touched under the state lock so a late commit elsewhere
    /// cannot slip between the clear and the status change.
    fn sign_out(&self, reason: Option<ApiError>) {
        self.update(|s| {
            if let Err(e) = self.credentials.clear() {
                error!("Failed to clear persisted session: {}", e);
            }
            s.user = None;
            s.token = None;
            s.status = SessionStatus::Unauthenticated;
            s.last_error = reason;
        });
    }
}

impl SessionExpiry for SessionCore {
    fn session_expired(&self) {
        self.sign_out(Some(ApiError::session_expired()));
        self.navigator.navigate(LOGIN_ROUTE);
    }
}

/// Owns the authentication state machine and the persisted credentials.
///
/// Cloning shares the same session; there is exactly one per client.
#[derive(Clone)]
pub struct SessionStore {
    core: Arc<SessionCore>,
    gateway: Gateway,
    notifier: Arc<dyn Notifier>,
    initialized: Arc<AtomicBool>,
}

impl SessionStore {
    pub fn new(
        api: &ApiConfig,
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let (status_tx, _) = watch::channel(SessionStatus::Uninitialized);
        let core = Arc::new(SessionCore {
            state: RwLock::new(Session::default()),
            credentials: credentials.clone(),
            navigator,
            status_tx,
        });
        let gateway = Gateway::new(api, credentials, notifier.clone(), core.clone())?;

        Ok(Self {
            core,
            gateway,
            notifier,
            initialized: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Gateway bound to this session, for the resource layers
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn snapshot(&self) -> Session {
        self.core.read().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.core.read().status
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.core.read().user.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.core.read().role()
    }

    pub fn is_authenticated(&self) -> bool {
        self.core.read().is_authenticated()
    }

    pub fn last_error(&self) -> Option<ApiError> {
        self.core.read().last_error.clone()
    }

    /// Status changes, for re-rendering
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.core.status_tx.subscribe()
    }

    /// Resolve the persisted session. Only the first call does any work.
    pub async fn initialize(&self) -> SessionStatus {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return self.status();
        }

        let persisted = match self.core.credentials.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("Discarding unreadable persisted session: {}", e);
                None
            }
        };

        let Some(persisted) = persisted else {
            // No token, no network call
            self.core.sign_out(None);
            return SessionStatus::Unauthenticated;
        };

        self.core.update(|s| s.status = SessionStatus::Loading);

        match self.gateway.get::<UserPayload>("/auth/me", Vec::new()).await {
            Ok(UserPayload { user }) => {
                let refreshed = PersistedSession {
                    token: persisted.token,
                    user,
                };
                let committed = self.core.update(|s| {
                    // A sign-out while the profile was loading wins
                    if s.status != SessionStatus::Loading {
                        return false;
                    }
                    if let Err(e) = self.core.credentials.save(&refreshed) {
                        warn!("Failed to refresh persisted profile: {}", e);
                    }
                    s.user = Some(refreshed.user.clone());
                    s.token = Some(refreshed.token.clone());
                    s.status = SessionStatus::Authenticated;
                    s.last_error = None;
                    true
                });
                if committed {
                    info!(user = %refreshed.user.email, "Restored session");
                } else {
                    debug!("Dropping restored session; signed out meanwhile");
                }
            }
            Err(e) => {
                info!("Persisted session rejected: {}", e);
                self.core.sign_out(None);
            }
        }

        self.status()
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, ApiError> {
        let body = json_body(credentials)?;
        self.begin_authentication()?;

        let result = self.gateway.post::<AuthPayload>("/auth/login", Some(body)).await;
        self.complete_authentication(result, |user| format!("Welcome back, {}!", user.first_name))
    }

    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, ApiError> {
        let body = json_body(registration)?;
        self.begin_authentication()?;

        let result = self.gateway.post::<AuthPayload>("/auth/register", Some(body)).await;
        self.complete_authentication(result, |user| format!("Welcome to Rapido, {}!", user.first_name))
    }

    /// Always succeeds locally; the server notification is best-effort
    pub async fn logout(&self) {
        if self.core.read().token.is_some() {
            let result = self
                .gateway
                .fetch::<IgnoredAny>(Method::POST, "/auth/logout", None, RequestOptions::silent())
                .await;
            if let Err(e) = result {
                debug!("Ignoring logout failure: {}", e);
            }
        }

        self.core.sign_out(None);
        info!("Signed out");
        self.notifier.notify(Notification::success("Logged out successfully"));
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let body = json_body(update)?;
        let token = self.require_token()?;

        let UserPayload { user } = self.gateway.put("/auth/profile", Some(body)).await?;

        let persisted = PersistedSession {
            token,
            user: user.clone(),
        };
        let committed = self.core.update(|s| {
            // Only the session that issued the request may take the result
            if s.status != SessionStatus::Authenticated || s.token.as_deref() != Some(persisted.token.as_str()) {
                return false;
            }
            if let Err(e) = self.core.credentials.save(&persisted) {
                warn!("Failed to persist updated profile: {}", e);
            }
            s.user = Some(persisted.user.clone());
            true
        });
        if !committed {
            debug!("Dropping profile update; session changed while it was in flight");
            return Err(ApiError::session_expired());
        }

        self.notifier.notify(Notification::success("Profile updated successfully"));
        Ok(user)
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        let body = json_body(change)?;
        self.require_token()?;

        self.gateway
            .put::<IgnoredAny>("/auth/change-password", Some(body))
            .await?;
        self.notifier.notify(Notification::success("Password changed successfully"));
        Ok(())
    }

    /// Delete the signed-in account and destroy the session
    pub async fn delete_account(&self) -> Result<(), ApiError> {
        self.require_token()?;

        self.gateway
            .delete::<IgnoredAny>("/users/delete-account", None)
            .await?;

        self.core.sign_out(None);
        self.notifier.notify(Notification::success("Account deleted successfully"));
        self.core.navigator.navigate(LOGIN_ROUTE);
        Ok(())
    }

    /// Unauthenticated -> Loading, atomically
    fn begin_authentication(&self) -> Result<(), ApiError> {
        self.core.update(|s| match s.status {
            SessionStatus::Unauthenticated => {
                s.status = SessionStatus::Loading;
                s.last_error = None;
                Ok(())
            }
            SessionStatus::Loading => Err(ApiError::validation("Sign-in already in progress")),
            SessionStatus::Authenticated => Err(ApiError::validation("Already signed in")),
            SessionStatus::Uninitialized => Err(ApiError::validation("Session has not been initialized")),
        })
    }

    fn complete_authentication(
        &self,
        result: Result<AuthPayload, ApiError>,
        welcome: impl FnOnce(&UserProfile) -> String,
    ) -> Result<UserProfile, ApiError> {
        let AuthPayload { token, user } = match result {
            Ok(payload) => payload,
            Err(err) => {
                // Gateway has already notified; keep the message for inline display
                self.fail_authentication(err.clone());
                return Err(err);
            }
        };

        let persisted = PersistedSession {
            token,
            user,
        };
        let committed: Result<bool, StorageError> = self.core.update(|s| {
            // Signed out while the request was in flight
            if s.status != SessionStatus::Loading {
                return Ok(false);
            }
            self.core.credentials.save(&persisted)?;
            s.user = Some(persisted.user.clone());
            s.token = Some(persisted.token.clone());
            s.status = SessionStatus::Authenticated;
            s.last_error = None;
            Ok(true)
        });

        match committed {
            Ok(true) => {}
            Ok(false) => {
                debug!("Dropping sign-in result; session changed while it was in flight");
                return Err(ApiError::session_expired());
            }
            Err(e) => {
                error!("Failed to persist session: {}", e);
                let err = ApiError::unknown("Unable to save your session");
                self.notifier.notify(Notification::error(err.message()));
                self.fail_authentication(err.clone());
                return Err(err);
            }
        }

        info!(user = %persisted.user.email, role = persisted.user.role.as_str(), "Signed in");
        self.notifier.notify(Notification::success(welcome(&persisted.user)));
        Ok(persisted.user)
    }

    fn fail_authentication(&self, err: ApiError) {
        self.core.sign_out(Some(err));
    }

    fn require_token(&self) -> Result<String, ApiError> {
        self.core
            .read()
            .token
            .clone()
            .ok_or_else(|| ApiError::validation("You are not signed in"))
    }
}
