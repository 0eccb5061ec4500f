//! HTTP request helper shared by the directory client

use reqwest::{Client, RequestBuilder, Method, Response, header::{HeaderMap, HeaderValue}};
use serde::{Serialize, de::DeserializeOwned};
use crate::error::Error;
use std::collections::HashMap;
use url::Url;

/// Helper for building and executing HTTP requests
pub struct FetchBuilder<'a> {
    client: &'a Client,
    url: Url,
    method: Method,
    headers: HeaderMap,
    query_params: Option<HashMap<String, String>>,
    body: Option<Vec<u8>>,
}

impl<'a> FetchBuilder<'a> {
    /// Create a new FetchBuilder
    pub fn new(client: &'a Client, url: Url, method: Method) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        Self {
            client,
            url,
            method,
            headers,
            query_params: None,
            body: None,
        }
    }

    /// Add a header to the request
    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add a query parameter to the request
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query_params
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(body)?;
        self.body = Some(json);
        Ok(self)
    }

    fn build(&self) -> RequestBuilder {
        let mut url = self.url.clone();

        if let Some(params) = &self.query_params {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in params {
                query_pairs.append_pair(key, value);
            }
        }

        let mut req = self.client.request(self.method.clone(), url);
        req = req.headers(self.headers.clone());

        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }

        req
    }

    /// Send the request and turn any non-2xx status into [`Error::Status`]
    async fn send(&self) -> Result<Response, Error> {
        log::debug!("{} {}", self.method, self.url.path());
        let response = self.build().send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::warn!("{} {} failed with status {}", self.method, self.url.path(), status);
            return Err(Error::Status {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(response)
    }

    /// Execute the request and parse the response as JSON.
    ///
    /// An empty body or a JSON `null` is reported as [`Error::EmptyBody`].
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let response = self.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::EmptyBody { status });
        }

        match serde_json::from_slice::<Option<T>>(&bytes)? {
            Some(result) => Ok(result),
            None => Err(Error::EmptyBody { status }),
        }
    }

    /// Execute the request and return the raw body bytes
    pub async fn execute_bytes(&self) -> Result<Vec<u8>, Error> {
        let response = self.send().await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Execute the request and return the body as text.
    ///
    /// A JSON string body is unquoted; anything else is returned verbatim.
    pub async fn execute_text(&self) -> Result<String, Error> {
        let response = self.send().await?;
        let text = response.text().await?;
        Ok(serde_json::from_str::<String>(&text).unwrap_or(text))
    }
}

/// Helper for creating HTTP requests
pub struct Fetch;

impl Fetch {
    /// Create a GET request
    pub fn get(client: &Client, url: Url) -> FetchBuilder<'_> {
        FetchBuilder::new(client, url, Method::GET)
    }

    /// Create a POST request
    pub fn post(client: &Client, url: Url) -> FetchBuilder<'_> {
        FetchBuilder::new(client, url, Method::POST)
    }

    /// Create a PUT request
    pub fn put(client: &Client, url: Url) -> FetchBuilder<'_> {
        FetchBuilder::new(client, url, Method::PUT)
    }

    /// Create a DELETE request
    pub fn delete(client: &Client, url: Url) -> FetchBuilder<'_> {
        FetchBuilder::new(client, url, Method::DELETE)
    }
}
