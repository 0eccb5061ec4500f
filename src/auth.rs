//! Login, registration and logout

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::client::DirectoryApi;
use crate::config::ClientOptions;
use crate::error::Error;
use crate::model::NurseRecord;
use crate::session::SessionStore;
use crate::validation::{validate_password_confirmation, validate_registration};

const EMPTY_CREDENTIALS: &str = "Username and password cannot be empty";
const EMPTY_REGISTRATION: &str = "Username, password and name cannot be empty";
const USERNAME_TAKEN: &str = "Username is already taken";

/// Result of a login or registration attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthResult {
    /// Nothing to report
    #[default]
    Idle,
    /// A request is in flight
    InProgress,
    /// The backend accepted the request
    Succeeded(NurseRecord),
    /// The attempt failed; carries a user-facing reason
    Failed(String),
}

impl AuthResult {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, AuthResult::InProgress)
    }

    /// Whether the attempt is over (succeeded or failed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthResult::Succeeded(_) | AuthResult::Failed(_))
    }
}

#[derive(Default)]
struct Credentials {
    username: String,
    password: String,
}

/// Drives login, registration and logout against the directory backend.
///
/// Each operation publishes its progress through a watch channel. At most one
/// login and one registration are in flight at a time; calls made while one is
/// running are ignored.
pub struct AuthWorkflow {
    api: Arc<dyn DirectoryApi>,
    session: SessionStore,
    options: ClientOptions,
    credentials: Mutex<Credentials>,
    login_result: watch::Sender<AuthResult>,
    register_result: Arc<watch::Sender<AuthResult>>,
    // Bumped by logout so an in-flight login cannot re-open the session
    login_epoch: AtomicU64,
    register_epoch: Arc<AtomicU64>,
}

impl AuthWorkflow {
    pub fn new(api: Arc<dyn DirectoryApi>, session: SessionStore, options: &ClientOptions) -> Self {
        let (login_result, _) = watch::channel(AuthResult::Idle);
        let (register_result, _) = watch::channel(AuthResult::Idle);

        Self {
            api,
            session,
            options: options.clone(),
            credentials: Mutex::new(Credentials::default()),
            login_result,
            register_result: Arc::new(register_result),
            login_epoch: AtomicU64::new(0),
            register_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    fn with_credentials<R>(&self, f: impl FnOnce(&mut Credentials) -> R) -> R {
        let mut credentials = self
            .credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut credentials)
    }

    pub fn set_username(&self, username: &str) {
        self.with_credentials(|c| c.username = username.to_string());
    }

    pub fn set_password(&self, password: &str) {
        self.with_credentials(|c| c.password = password.to_string());
    }

    pub fn username(&self) -> String {
        self.with_credentials(|c| c.username.clone())
    }

    pub fn password(&self) -> String {
        self.with_credentials(|c| c.password.clone())
    }

    fn clear_credentials(&self) {
        self.with_credentials(|c| *c = Credentials::default());
    }

    /// Current login result
    pub fn login_result(&self) -> AuthResult {
        self.login_result.borrow().clone()
    }

    /// Current registration result
    pub fn register_result(&self) -> AuthResult {
        self.register_result.borrow().clone()
    }

    /// Watch login results
    pub fn subscribe_login(&self) -> watch::Receiver<AuthResult> {
        self.login_result.subscribe()
    }

    /// Watch registration results
    pub fn subscribe_register(&self) -> watch::Receiver<AuthResult> {
        self.register_result.subscribe()
    }

    /// Drop a consumed terminal login result back to idle
    pub fn reset_login_state(&self) {
        reset_terminal(&self.login_result);
    }

    /// Drop a consumed terminal registration result back to idle
    pub fn reset_register_state(&self) {
        reset_terminal(&self.register_result);
    }

    /// Sign in with the buffered username and password.
    ///
    /// Blank credentials fail without a request. On success the nurse id is
    /// persisted to the session store.
    pub async fn login(&self) {
        let (username, password) = self.with_credentials(|c| (c.username.clone(), c.password.clone()));
        let blank = username.trim().is_empty() || password.trim().is_empty();

        let started = self.login_result.send_if_modified(|result| {
            if result.is_in_progress() {
                return false;
            }
            *result = if blank {
                AuthResult::Failed(EMPTY_CREDENTIALS.to_string())
            } else {
                AuthResult::InProgress
            };
            true
        });
        if !started {
            debug!("login already in progress, ignoring");
            return;
        }
        if blank {
            return;
        }

        let epoch = self.login_epoch.load(Ordering::SeqCst);
        let response = self.api.authenticate(&username, &password).await;

        if self.login_epoch.load(Ordering::SeqCst) != epoch {
            debug!("discarding login response after logout");
            return;
        }

        let outcome = match response {
            Ok(record) => self.open_session(record),
            Err(err) => {
                warn!("login failed for {}: {}", username, err);
                AuthResult::Failed(login_failure_message(&err))
            }
        };
        self.login_result.send_replace(outcome);
    }

    fn open_session(&self, record: NurseRecord) -> AuthResult {
        let Some(id) = record.id else {
            warn!("login response for {} carries no id", record.username);
            return AuthResult::Failed("Login failed: response is missing the nurse id".to_string());
        };

        match self.session.set_logged_nurse_id(id) {
            Ok(()) => {
                info!("nurse {} signed in", id);
                AuthResult::Succeeded(record)
            }
            Err(err) => {
                warn!("could not persist session for nurse {}: {}", id, err);
                AuthResult::Failed(format!("Error: {}", err))
            }
        }
    }

    /// Create an account after checking that the username is free.
    ///
    /// The availability probe and the create call are not atomic; a name taken
    /// in between surfaces as a registration failure. A success resets to
    /// idle after `register_reset_delay`.
    pub async fn register(&self, username: &str, password: &str, display_name: &str) {
        let rejection = if [username, password, display_name]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            Some(EMPTY_REGISTRATION.to_string())
        } else {
            validate_registration(username, password)
                .err()
                .map(|err| err.to_string())
        };

        if !self.begin_registration(rejection.clone()) || rejection.is_some() {
            return;
        }

        let outcome = self.create_account(username, password, display_name).await;
        let succeeded = matches!(outcome, AuthResult::Succeeded(_));
        self.register_result.send_replace(outcome);

        if succeeded {
            self.clear_credentials();
            self.schedule_register_reset();
        }
    }

    /// [`register`](Self::register) preceded by the confirm-password check
    pub async fn register_with_confirmation(
        &self,
        username: &str,
        password: &str,
        confirmation: &str,
        display_name: &str,
    ) {
        if let Err(err) = validate_password_confirmation(password, confirmation) {
            self.begin_registration(Some(err.to_string()));
            return;
        }
        self.register(username, password, display_name).await;
    }

    /// Move the registration result to `InProgress`, or to `Failed` when the
    /// form was rejected locally. Returns false if a registration is running.
    fn begin_registration(&self, rejection: Option<String>) -> bool {
        let started = self.register_result.send_if_modified(|result| {
            if result.is_in_progress() {
                return false;
            }
            *result = match &rejection {
                Some(reason) => AuthResult::Failed(reason.clone()),
                None => AuthResult::InProgress,
            };
            true
        });
        if !started {
            debug!("registration already in progress, ignoring");
        }
        started
    }

    async fn create_account(&self, username: &str, password: &str, display_name: &str) -> AuthResult {
        match self.api.check_username_availability(username).await {
            Ok(true) => {}
            Ok(false) => {
                info!("username {} is already taken", username);
                return AuthResult::Failed(USERNAME_TAKEN.to_string());
            }
            Err(err) => {
                warn!("availability check for {} failed: {}", username, err);
                return AuthResult::Failed(format!(
                    "Error checking username availability: {}",
                    err.summary()
                ));
            }
        }

        let record = NurseRecord::new(username, password, display_name);
        match self.api.register(&record).await {
            Ok(created) => {
                info!("registered nurse {} with id {:?}", created.username, created.id);
                AuthResult::Succeeded(created)
            }
            Err(err) => {
                warn!("registration of {} failed: {}", username, err);
                AuthResult::Failed(format!("Registration failed: {}", err.summary()))
            }
        }
    }

    fn schedule_register_reset(&self) {
        let epoch = self.register_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime, registration result will not reset itself");
            return;
        };

        let result = Arc::clone(&self.register_result);
        let current_epoch = Arc::clone(&self.register_epoch);
        let delay = self.options.register_reset_delay;

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if current_epoch.load(Ordering::SeqCst) == epoch {
                result.send_if_modified(|r| {
                    if matches!(r, AuthResult::Succeeded(_)) {
                        *r = AuthResult::Idle;
                        true
                    } else {
                        false
                    }
                });
            }
        });
    }

    /// Forget the signed-in nurse and reset the login form
    pub fn logout(&self) {
        self.login_epoch.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = self.session.clear() {
            warn!("could not clear session: {}", err);
        }
        self.login_result.send_replace(AuthResult::Idle);
        self.clear_credentials();
        info!("signed out");
    }
}

fn reset_terminal(result: &watch::Sender<AuthResult>) {
    result.send_if_modified(|r| {
        if r.is_terminal() {
            *r = AuthResult::Idle;
            true
        } else {
            false
        }
    });
}

fn login_failure_message(err: &Error) -> String {
    match err {
        Error::Status { status, .. } | Error::EmptyBody { status } => {
            format!("Login failed: {}", status)
        }
        other => format!("Error: {}", other),
    }
}
