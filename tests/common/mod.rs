#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use nurse_directory::client::{DirectoryApi, DirectoryClient};
use nurse_directory::config::ClientOptions;
use serde_json::{json, Value};
use wiremock::MockServer;

/// Address nothing listens on, for transport failures
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

/// Options pointing at the mock server with short self-reset delays
pub fn options(server: &MockServer) -> ClientOptions {
    ClientOptions::default()
        .with_base_url(&server.uri())
        .with_register_reset_delay(Duration::from_millis(100))
        .with_update_outcome_ttl(Duration::from_millis(100))
}

pub fn api(options: &ClientOptions) -> Arc<dyn DirectoryApi> {
    Arc::new(DirectoryClient::new(options).unwrap())
}

pub fn nurse_json(id: i64, user: &str, name: &str) -> Value {
    json!({
        "id": id,
        "user": user,
        "password": "Passw0rd",
        "name": name
    })
}

/// Long enough for any scheduled reset in [`options`] to have fired
pub async fn wait_for_expiry() {
    tokio::time::sleep(Duration::from_millis(400)).await;
}
