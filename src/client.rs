//! Typed REST boundary to the directory backend
//!
//! Every operation resolves to `Result<_, Error>`: transport failures, non-2xx
//! statuses and empty payloads all come back as values. Nothing is retried.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};
use crate::model::NurseRecord;

/// Operations offered by the directory backend
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// `POST /nurse/authentication`
    async fn authenticate(&self, username: &str, password: &str) -> Result<NurseRecord, Error>;

    /// `POST /nurse/registration`
    async fn register(&self, record: &NurseRecord) -> Result<NurseRecord, Error>;

    /// `GET /nurse/checkUserAvailability?user=<name>`; `true` means the name is free
    async fn check_username_availability(&self, username: &str) -> Result<bool, Error>;

    /// `GET /nurse/directory`
    async fn fetch_all(&self) -> Result<Vec<NurseRecord>, Error>;

    /// `GET /nurse/search-by-name/{name}`; `None` when nobody matches
    async fn fetch_by_name(&self, name: &str) -> Result<Option<NurseRecord>, Error>;

    /// `GET /nurse/profile/{id}`
    async fn fetch_by_id(&self, id: i64) -> Result<NurseRecord, Error>;

    /// `PUT /nurse/modification/{id}`
    async fn update_profile(&self, id: i64, record: &NurseRecord) -> Result<NurseRecord, Error>;

    /// `DELETE /nurse/deletion/{id}`
    async fn delete(&self, id: i64) -> Result<String, Error>;

    /// `GET /nurse/profile/{id}/image`
    async fn fetch_image(&self, id: i64) -> Result<Vec<u8>, Error>;
}

/// reqwest backed [`DirectoryApi`]
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    base_url: Url,
    http_client: Client,
    user_agent: String,
}

impl DirectoryClient {
    /// Create a client from options, building a dedicated HTTP client
    pub fn new(options: &ClientOptions) -> Result<Self, Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        Self::with_http_client(options, builder.build()?)
    }

    /// Create a client sharing an existing HTTP client
    pub fn with_http_client(options: &ClientOptions, http_client: Client) -> Result<Self, Error> {
        let base_url = Url::parse(&options.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::general(format!(
                "base URL cannot carry a path: {}",
                options.base_url
            )));
        }

        Ok(Self {
            base_url,
            http_client,
            user_agent: options.user_agent.clone(),
        })
    }

    /// The base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::general("base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, segments: &[&str]) -> Result<FetchBuilder<'_>, Error> {
        let url = self.endpoint(segments)?;
        Ok(Fetch::get(&self.http_client, url).header("User-Agent", &self.user_agent))
    }

    fn post(&self, segments: &[&str]) -> Result<FetchBuilder<'_>, Error> {
        let url = self.endpoint(segments)?;
        Ok(Fetch::post(&self.http_client, url).header("User-Agent", &self.user_agent))
    }

    fn put(&self, segments: &[&str]) -> Result<FetchBuilder<'_>, Error> {
        let url = self.endpoint(segments)?;
        Ok(Fetch::put(&self.http_client, url).header("User-Agent", &self.user_agent))
    }

    fn delete_request(&self, segments: &[&str]) -> Result<FetchBuilder<'_>, Error> {
        let url = self.endpoint(segments)?;
        Ok(Fetch::delete(&self.http_client, url).header("User-Agent", &self.user_agent))
    }
}

#[async_trait]
impl DirectoryApi for DirectoryClient {
    async fn authenticate(&self, username: &str, password: &str) -> Result<NurseRecord, Error> {
        let credentials = NurseRecord::credentials(username, password);
        self.post(&["nurse", "authentication"])?
            .json(&credentials)?
            .execute::<NurseRecord>()
            .await
    }

    async fn register(&self, record: &NurseRecord) -> Result<NurseRecord, Error> {
        self.post(&["nurse", "registration"])?
            .json(record)?
            .execute::<NurseRecord>()
            .await
    }

    async fn check_username_availability(&self, username: &str) -> Result<bool, Error> {
        self.get(&["nurse", "checkUserAvailability"])?
            .query("user", username)
            .execute::<bool>()
            .await
    }

    async fn fetch_all(&self) -> Result<Vec<NurseRecord>, Error> {
        self.get(&["nurse", "directory"])?
            .execute::<Vec<NurseRecord>>()
            .await
    }

    async fn fetch_by_name(&self, name: &str) -> Result<Option<NurseRecord>, Error> {
        let result = self
            .get(&["nurse", "search-by-name", name])?
            .execute::<NurseRecord>()
            .await;

        match result {
            Ok(record) => Ok(Some(record)),
            Err(Error::EmptyBody { .. }) | Err(Error::Status { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn fetch_by_id(&self, id: i64) -> Result<NurseRecord, Error> {
        let id = id.to_string();
        self.get(&["nurse", "profile", id.as_str()])?
            .execute::<NurseRecord>()
            .await
    }

    async fn update_profile(&self, id: i64, record: &NurseRecord) -> Result<NurseRecord, Error> {
        let id = id.to_string();
        self.put(&["nurse", "modification", id.as_str()])?
            .json(record)?
            .execute::<NurseRecord>()
            .await
    }

    async fn delete(&self, id: i64) -> Result<String, Error> {
        let id = id.to_string();
        self.delete_request(&["nurse", "deletion", id.as_str()])?
            .execute_text()
            .await
    }

    async fn fetch_image(&self, id: i64) -> Result<Vec<u8>, Error> {
        let id = id.to_string();
        let bytes = self
            .get(&["nurse", "profile", id.as_str(), "image"])?
            .execute_bytes()
            .await?;

        if bytes.is_empty() {
            return Err(Error::general("Empty image data"));
        }
        Ok(bytes)
    }
}
