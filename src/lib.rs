//! Nurse Directory Client Library
//!
//! A Rust client for the hospital nurse directory service: account
//! registration and login, a persisted session, the signed-in nurse's
//! profile, and directory search.
//!
//! Each workflow publishes its state through a [`tokio::sync::watch`] channel
//! so a UI can subscribe and re-render on every change.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod listing;
mod loading;
pub mod model;
pub mod profile;
pub mod session;
pub mod validation;

use std::sync::Arc;

use crate::auth::AuthWorkflow;
use crate::client::{DirectoryApi, DirectoryClient};
use crate::config::ClientOptions;
use crate::error::Error;
use crate::listing::ListingWorkflow;
use crate::profile::ProfileWorkflow;
use crate::session::SessionStore;

/// The main entry point for the nurse directory client
pub struct NurseDirectory {
    /// Client options
    pub options: ClientOptions,
    client: Arc<DirectoryClient>,
    session: SessionStore,
}

impl NurseDirectory {
    /// Create a client for the default backend address
    ///
    /// # Example
    ///
    /// ```
    /// use nurse_directory::{NurseDirectory, session::SessionStore};
    ///
    /// let directory = NurseDirectory::new(SessionStore::in_memory()).unwrap();
    /// assert_eq!(directory.options.base_url, "http://10.0.2.2:8080");
    /// ```
    pub fn new(session: SessionStore) -> Result<Self, Error> {
        Self::new_with_options(ClientOptions::default(), session)
    }

    /// Create a client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use nurse_directory::{NurseDirectory, config::ClientOptions, session::SessionStore};
    ///
    /// let options = ClientOptions::default().with_base_url("http://localhost:8080");
    /// let directory = NurseDirectory::new_with_options(options, SessionStore::in_memory()).unwrap();
    /// ```
    pub fn new_with_options(options: ClientOptions, session: SessionStore) -> Result<Self, Error> {
        let client = DirectoryClient::new(&options)?;

        Ok(Self {
            options,
            client: Arc::new(client),
            session,
        })
    }

    /// The typed REST client
    pub fn client(&self) -> &DirectoryClient {
        &self.client
    }

    /// The persisted session
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn api(&self) -> Arc<dyn DirectoryApi> {
        self.client.clone()
    }

    /// Workflow for login, registration and logout
    pub fn auth(&self) -> AuthWorkflow {
        AuthWorkflow::new(self.api(), self.session.clone(), &self.options)
    }

    /// Workflow for the signed-in nurse's profile, loaded from the session
    pub async fn profile(&self) -> ProfileWorkflow {
        ProfileWorkflow::open(self.api(), self.session.clone(), &self.options).await
    }

    /// Workflow for directory search, starting with the full directory
    pub async fn listing(&self) -> ListingWorkflow {
        ListingWorkflow::open(self.api()).await
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{AuthResult, AuthWorkflow};
    pub use crate::client::{DirectoryApi, DirectoryClient};
    pub use crate::config::ClientOptions;
    pub use crate::error::Error;
    pub use crate::listing::{DirectoryListing, ListingWorkflow};
    pub use crate::model::NurseRecord;
    pub use crate::profile::{ProfileState, ProfileUpdateOutcome, ProfileWorkflow};
    pub use crate::session::SessionStore;
    pub use crate::validation::{validate_registration, ValidationError};
    pub use crate::NurseDirectory;
}
