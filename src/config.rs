//! Configuration options for the nurse directory client

use std::time::Duration;

/// Address of the directory backend as seen from the Android emulator
pub const DEFAULT_BASE_URL: &str = "http://10.0.2.2:8080";

/// Configuration options for the nurse directory client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The base URL of the directory service
    pub base_url: String,

    /// The request timeout; `None` keeps the transport default
    pub request_timeout: Option<Duration>,

    /// How long a successful registration stays visible before resetting to idle
    pub register_reset_delay: Duration,

    /// How long a profile update outcome stays visible before clearing
    pub update_outcome_ttl: Duration,

    /// The `User-Agent` sent with every request
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
            register_reset_delay: Duration::from_secs(2),
            update_outcome_ttl: Duration::from_secs(5),
            user_agent: concat!("nurse-directory/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientOptions {
    /// Set the base URL of the directory service
    pub fn with_base_url(mut self, value: &str) -> Self {
        self.base_url = value.trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the delay after which a successful registration resets to idle
    pub fn with_register_reset_delay(mut self, value: Duration) -> Self {
        self.register_reset_delay = value;
        self
    }

    /// Set the lifetime of profile update outcomes
    pub fn with_update_outcome_ttl(mut self, value: Duration) -> Self {
        self.update_outcome_ttl = value;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, value: &str) -> Self {
        self.user_agent = value.to_string();
        self
    }
}
