//! The signed-in nurse's own profile

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::client::DirectoryApi;
use crate::config::ClientOptions;
use crate::error::Error;
use crate::loading::LoadingGuard;
use crate::model::NurseRecord;
use crate::session::SessionStore;
use crate::validation::validate_password;

const NO_LOGGED_NURSE: &str = "No logged nurse found";
const PROFILE_UPDATED: &str = "Profile updated successfully";
const PASSWORD_UPDATED: &str = "Password updated successfully";

/// Short-lived notification about the last profile or password update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProfileUpdateOutcome {
    #[default]
    Idle,
    Succeeded(String),
    Failed(String),
}

/// Everything a profile screen renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileState {
    pub record: Option<NurseRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub update_outcome: ProfileUpdateOutcome,
}

/// Loads, edits and deletes the profile of the nurse held in the session.
///
/// Update outcomes clear themselves after `update_outcome_ttl`; starting a new
/// update clears a pending outcome at once.
pub struct ProfileWorkflow {
    api: Arc<dyn DirectoryApi>,
    session: SessionStore,
    options: ClientOptions,
    state: Arc<watch::Sender<ProfileState>>,
    in_flight: AtomicUsize,
    outcome_generation: Arc<AtomicU64>,
}

impl ProfileWorkflow {
    /// Create the workflow without touching the session or the network
    pub fn new(api: Arc<dyn DirectoryApi>, session: SessionStore, options: &ClientOptions) -> Self {
        let (state, _) = watch::channel(ProfileState::default());

        Self {
            api,
            session,
            options: options.clone(),
            state: Arc::new(state),
            in_flight: AtomicUsize::new(0),
            outcome_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create the workflow and load the signed-in nurse's profile
    pub async fn open(api: Arc<dyn DirectoryApi>, session: SessionStore, options: &ClientOptions) -> Self {
        let workflow = Self::new(api, session, options);
        workflow.reload().await;
        workflow
    }

    pub fn state(&self) -> ProfileState {
        self.state.borrow().clone()
    }

    pub fn record(&self) -> Option<NurseRecord> {
        self.state.borrow().record.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn update_outcome(&self) -> ProfileUpdateOutcome {
        self.state.borrow().update_outcome.clone()
    }

    /// Watch the profile state
    pub fn subscribe(&self) -> watch::Receiver<ProfileState> {
        self.state.subscribe()
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Dismiss the current update outcome and cancel its pending expiry
    pub fn clear_update_outcome(&self) {
        self.outcome_generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_if_modified(|s| {
            let changed = s.update_outcome != ProfileUpdateOutcome::Idle;
            s.update_outcome = ProfileUpdateOutcome::Idle;
            changed
        });
    }

    fn loading(&self) -> LoadingGuard<'_, ProfileState> {
        LoadingGuard::start(&self.state, &self.in_flight, |s, loading| s.is_loading = loading)
    }

    fn set_error(&self, message: String) {
        self.state.send_modify(|s| s.error = Some(message));
    }

    fn current_id(&self) -> Option<i64> {
        self.state.borrow().record.as_ref().and_then(|r| r.id)
    }

    /// Fetch the profile of the nurse stored in the session
    pub async fn reload(&self) {
        let id = match self.session.logged_nurse_id() {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!("no nurse in session, skipping profile load");
                self.state.send_modify(|s| {
                    s.record = None;
                    s.error = Some(NO_LOGGED_NURSE.to_string());
                });
                return;
            }
            Err(err) => {
                warn!("could not read session: {}", err);
                self.set_error(format!("Error reading session: {}", err));
                return;
            }
        };

        let _loading = self.loading();
        self.clear_error();

        match self.api.fetch_by_id(id).await {
            Ok(record) => {
                debug!("loaded profile {}", id);
                self.state.send_modify(|s| s.record = Some(record));
            }
            Err(err) => {
                warn!("loading profile {} failed: {}", id, err);
                self.set_error(format!("Error loading profile: {}", err.summary()));
            }
        }
    }

    /// Replace the profile with `updated`. Does nothing until a persisted
    /// record has been loaded.
    pub async fn update_profile(&self, updated: NurseRecord) {
        let Some(id) = self.current_id() else {
            debug!("no persisted profile, ignoring update");
            return;
        };

        self.clear_update_outcome();
        let _loading = self.loading();
        let result = self.api.update_profile(id, &updated).await;
        self.finish_update(result, PROFILE_UPDATED);
    }

    /// Change only the password of the current profile.
    ///
    /// The new password must satisfy the same rules as at registration.
    pub async fn update_password(&self, new_password: &str) {
        let Some((id, current)) = self.record().and_then(|r| r.id.map(|id| (id, r))) else {
            debug!("no persisted profile, ignoring password change");
            return;
        };

        self.clear_update_outcome();
        if let Err(err) = validate_password(new_password) {
            self.publish_outcome(ProfileUpdateOutcome::Failed(err.to_string()));
            return;
        }

        let updated = NurseRecord {
            password: new_password.to_string(),
            ..current
        };

        let _loading = self.loading();
        let result = self.api.update_profile(id, &updated).await;
        self.finish_update(result, PASSWORD_UPDATED);
    }

    fn finish_update(&self, result: Result<NurseRecord, Error>, success: &str) {
        match result {
            Ok(mut record) => {
                info!("profile {:?} updated", record.id);
                self.state.send_modify(|s| {
                    // The update response does not carry the photo.
                    if let Some(previous) = s.record.take() {
                        if record.profile_image_pixels.is_none() && previous.id == record.id {
                            record.profile_image_pixels = previous.profile_image_pixels;
                        }
                    }
                    s.record = Some(record);
                });
                self.publish_outcome(ProfileUpdateOutcome::Succeeded(success.to_string()));
            }
            Err(err) => {
                warn!("profile update failed: {}", err);
                self.publish_outcome(ProfileUpdateOutcome::Failed(update_failure_message(&err)));
            }
        }
    }

    fn publish_outcome(&self, outcome: ProfileUpdateOutcome) {
        let generation = self.outcome_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| s.update_outcome = outcome);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime, update outcome will not expire");
            return;
        };

        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.outcome_generation);
        let ttl = self.options.update_outcome_ttl;

        runtime.spawn(async move {
            tokio::time::sleep(ttl).await;
            if current.load(Ordering::SeqCst) == generation {
                state.send_modify(|s| s.update_outcome = ProfileUpdateOutcome::Idle);
            }
        });
    }

    /// Delete the account and end the session.
    ///
    /// Callers confirm with the user first; nothing here asks again.
    pub async fn delete_profile(&self) {
        let Some(id) = self.current_id() else {
            debug!("no persisted profile, ignoring delete");
            return;
        };

        let _loading = self.loading();
        self.clear_error();

        match self.api.delete(id).await {
            Ok(_) => {
                self.state.send_modify(|s| s.record = None);
                if let Err(err) = self.session.clear() {
                    warn!("profile {} deleted but session not cleared: {}", id, err);
                    self.set_error(format!("Error clearing session: {}", err));
                }
                info!("profile {} deleted", id);
            }
            Err(err) => {
                warn!("deleting profile {} failed: {}", id, err);
                self.set_error(format!("Error deleting profile: {}", err.summary()));
            }
        }
    }

    /// Fetch the profile photo into `record.profile_image_pixels`
    pub async fn load_photo(&self) {
        let Some(id) = self.current_id() else {
            return;
        };

        let _loading = self.loading();
        match self.api.fetch_image(id).await {
            Ok(bytes) => {
                debug!("loaded {} byte photo for profile {}", bytes.len(), id);
                self.state.send_modify(|s| {
                    if let Some(record) = s.record.as_mut().filter(|r| r.id == Some(id)) {
                        record.profile_image_pixels = Some(bytes);
                    }
                });
            }
            Err(err) => {
                warn!("loading photo {} failed: {}", id, err);
                self.set_error(format!("Error loading photo: {}", err.summary()));
            }
        }
    }
}

fn update_failure_message(err: &Error) -> String {
    match err {
        Error::Status { status: 400, .. } => {
            "Username is already taken or fields are empty".to_string()
        }
        _ if err.is_transport() => "Network error: check your connection".to_string(),
        other => format!("Error updating profile: {}", other.summary()),
    }
}
