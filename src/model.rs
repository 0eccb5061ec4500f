//! Directory records as exchanged with the backend

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// One entry of the nurse directory: credentials plus profile fields.
///
/// `id` is assigned by the server and is present on every record that was
/// created or fetched; it is the handle for update, delete and image calls.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NurseRecord {
    /// Server-assigned identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Login name, unique across the directory
    #[serde(rename = "user", default)]
    pub username: String,

    /// Password, sent as plain text
    #[serde(default)]
    pub password: String,

    /// Name shown in the directory
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Job role, e.g. "Head Nurse"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Inline base64 encoded profile image
    #[serde(rename = "profileImage", default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,

    /// Raw encoded image fetched from the image endpoint
    #[serde(skip)]
    pub profile_image_pixels: Option<Vec<u8>>,
}

impl NurseRecord {
    /// Record carrying only login credentials
    pub fn credentials(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }

    /// Record for a new registration
    pub fn new(username: &str, password: &str, display_name: &str) -> Self {
        Self {
            display_name: Some(display_name.to_string()),
            ..Self::credentials(username, password)
        }
    }

    /// Decode the inline profile image, accepting an optional `data:` URL prefix
    pub fn decode_profile_image(&self) -> Result<Option<Vec<u8>>, Error> {
        let encoded = match self.profile_image.as_deref().map(str::trim) {
            Some(encoded) if !encoded.is_empty() => encoded,
            _ => return Ok(None),
        };

        let payload = match encoded.split_once(";base64,") {
            Some((prefix, payload)) if prefix.starts_with("data:") => payload,
            _ => encoded,
        };

        Ok(Some(STANDARD.decode(payload)?))
    }
}

impl fmt::Debug for NurseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NurseRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("display_name", &self.display_name)
            .field("role", &self.role)
            .field("profile_image", &self.profile_image.as_ref().map(String::len))
            .field(
                "profile_image_pixels",
                &self.profile_image_pixels.as_ref().map(Vec::len),
            )
            .finish()
    }
}
