//! Browsing and searching the directory

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::watch;

use crate::client::DirectoryApi;
use crate::error::Error;
use crate::loading::LoadingGuard;
use crate::model::NurseRecord;

/// Search results as shown by a directory screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub query: String,
    pub nurses: Vec<NurseRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Runs directory searches. A blank query lists everyone, anything else
/// looks a nurse up by name.
///
/// Searches are latest-wins: when the query changes while a request is in
/// flight, the older response is dropped.
pub struct ListingWorkflow {
    api: Arc<dyn DirectoryApi>,
    state: watch::Sender<DirectoryListing>,
    in_flight: AtomicUsize,
    generation: AtomicU64,
}

impl ListingWorkflow {
    pub fn new(api: Arc<dyn DirectoryApi>) -> Self {
        let (state, _) = watch::channel(DirectoryListing::default());
        Self {
            api,
            state,
            in_flight: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Create the workflow and fetch the whole directory
    pub async fn open(api: Arc<dyn DirectoryApi>) -> Self {
        let workflow = Self::new(api);
        workflow.search("").await;
        workflow
    }

    pub fn listing(&self) -> DirectoryListing {
        self.state.borrow().clone()
    }

    pub fn nurses(&self) -> Vec<NurseRecord> {
        self.state.borrow().nurses.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DirectoryListing> {
        self.state.subscribe()
    }

    /// Search again for new query text; called on every edit
    pub async fn update_query(&self, text: &str) {
        self.search(text).await;
    }

    /// Repeat the search for the current query
    pub async fn refresh(&self) {
        let query = self.state.borrow().query.clone();
        self.search(&query).await;
    }

    /// Run one search and publish its result, or its error with an empty list.
    /// The query becomes the one [`refresh`](Self::refresh) repeats.
    pub async fn search(&self, query: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| s.query = query.to_string());
        let _loading = LoadingGuard::start(&self.state, &self.in_flight, |s, loading| {
            s.is_loading = loading
        });

        // Whitespace only counts for blankness; a name is sent as typed.
        let by_name = !query.trim().is_empty();
        let result = if !by_name {
            self.api.fetch_all().await
        } else {
            self.api
                .fetch_by_name(query)
                .await
                .map(|found| found.into_iter().collect())
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("discarding results of superseded search {:?}", query);
            return;
        }

        match result {
            Ok(nurses) => {
                debug!("search {:?} returned {} nurses", query, nurses.len());
                self.state.send_modify(|s| {
                    s.nurses = nurses;
                    s.error = None;
                });
            }
            Err(err) => {
                warn!("search {:?} failed: {}", query, err);
                let message = listing_failure_message(&err, by_name);
                self.state.send_modify(|s| {
                    s.nurses.clear();
                    s.error = Some(message);
                });
            }
        }
    }
}

fn listing_failure_message(err: &Error, by_name: bool) -> String {
    match err {
        Error::EmptyBody { .. } => "Empty response".to_string(),
        Error::Status { status, .. } if by_name => format!("Search failed: {}", status),
        Error::Status { status, .. } => format!("Failed to fetch nurses: {}", status),
        other => other.to_string(),
    }
}
