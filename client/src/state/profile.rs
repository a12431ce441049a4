use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
    api::{ApiClient, UserIdentity},
    device::{cached_device_info, DeviceInfo},
    error::ClientError,
    session::Session,
};

/// Upper bound on the encoded data URI sent to the server.
pub const MAX_PROFILE_IMAGE_BYTES: usize = 3 * 1024 * 1024;

const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSnapshot {
    pub user: Option<UserIdentity>,
    pub profile_image: Option<String>,
    pub device_info: Option<DeviceInfo>,
}

impl ProfileSnapshot {
    /// Two-letter avatar fallback.
    pub fn initials(&self) -> String {
        initials(self.user.as_ref().map(|u| u.username.as_str()).unwrap_or(""))
    }
}

/// First two characters, upper-cased; `"U"` when there is no name.
pub fn initials(username: &str) -> String {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return "U".to_string();
    }
    trimmed.chars().take(2).collect::<String>().to_uppercase()
}

/// Everything the profile screen shows, read from the local cache only.
/// Unreadable entries are logged and shown as missing.
pub async fn load_profile(session: &Session) -> ProfileSnapshot {
    let user = session.cached_user().await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Cached user unreadable");
        None
    });
    let profile_image = session.cached_profile_image().await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Cached profile image unreadable");
        None
    });
    let device_info = cached_device_info(session).await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Cached device info unreadable");
        None
    });
    ProfileSnapshot {
        user,
        profile_image,
        device_info,
    }
}

pub fn image_data_uri(jpeg: &[u8]) -> String {
    format!("{}{}", JPEG_DATA_URI_PREFIX, STANDARD.encode(jpeg))
}

/// Uploads a new avatar and mirrors the stored URL locally. Oversized
/// images are refused before any request is made.
pub async fn update_profile_image(api: &ApiClient, jpeg: &[u8]) -> Result<String, ClientError> {
    if jpeg.is_empty() {
        return Err(ClientError::Validation("Image is empty".into()));
    }
    let data_uri = image_data_uri(jpeg);
    if data_uri.len() > MAX_PROFILE_IMAGE_BYTES {
        return Err(ClientError::Validation(format!(
            "Image is too large ({} bytes encoded, limit {})",
            data_uri.len(),
            MAX_PROFILE_IMAGE_BYTES
        )));
    }

    let stored = api.upload_profile_image(&data_uri).await?;
    api.session().update_profile_image(&stored).await?;
    tracing::info!(bytes = jpeg.len(), "Profile image updated");
    Ok(stored)
}
