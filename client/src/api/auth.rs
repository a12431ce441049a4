use serde_json::json;

use super::{
    client::{ApiClient, Decoded, RawResponse},
    types::{
        server_message, AuthResponse, AuthSession, BiometricLoginRequest, BiometricStatus,
        LoginRequest, ProfileImageResponse, ProfileImageUpload, SignupRequest,
    },
};
use crate::error::ClientError;

const AUTH_FAILED: &str = "Authentication failed";

impl ApiClient {
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthSession, ClientError> {
        let raw = self.post_public("/auth/login", request).await?;
        self.complete_auth(raw).await
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthSession, ClientError> {
        let raw = self.post_public("/auth/signup", request).await?;
        self.complete_auth(raw).await
    }

    pub async fn biometric_login(&self, user_id: &str) -> Result<AuthSession, ClientError> {
        let raw = self
            .post_authed_raw(
                "/auth/biometric-login",
                &BiometricLoginRequest {
                    user_id: user_id.to_string(),
                },
            )
            .await?;
        self.complete_auth(raw).await
    }

    /// Storage is only written once the response carries both a token and
    /// a user; every other outcome leaves it untouched.
    async fn complete_auth(&self, raw: RawResponse) -> Result<AuthSession, ClientError> {
        let status = raw.status.as_u16();
        let body: serde_json::Value = match raw.decode() {
            Decoded::Value(body) => body,
            Decoded::Malformed(err) => return Err(ClientError::malformed(status, err.to_string())),
        };

        let rejection = || {
            ClientError::rejected(
                status,
                server_message(&body).unwrap_or_else(|| AUTH_FAILED.to_string()),
            )
        };
        if !raw.status.is_success() {
            return Err(rejection());
        }

        let response: AuthResponse = serde_json::from_value(body.clone())
            .map_err(|err| ClientError::malformed(status, err.to_string()))?;
        let (token, user) = match (response.token, response.user) {
            (Some(token), Some(user)) if !token.is_empty() => (token, user),
            (Some(token), None) if !token.is_empty() => {
                return Err(ClientError::malformed(status, "auth response without user"))
            }
            _ => return Err(rejection()),
        };

        self.session().persist_login(&token, &user).await?;
        tracing::info!(user_id = %user.id, role = user.role.as_str(), "Signed in");
        Ok(AuthSession { token, user })
    }

    pub async fn get_biometric_status(&self) -> Result<BiometricStatus, ClientError> {
        self.get_authed("/auth/biometric-status", "Failed to load biometric status")
            .await
    }

    pub async fn set_biometric_status(&self, enabled: bool) -> Result<BiometricStatus, ClientError> {
        self.put_authed(
            "/auth/biometric-status",
            &json!({ "enabled": enabled }),
            "Failed to update biometric status",
        )
        .await
    }

    pub async fn upload_profile_image(&self, data_uri: &str) -> Result<String, ClientError> {
        let response: ProfileImageResponse = self
            .put_authed(
                "/auth/upload-profile-image",
                &ProfileImageUpload {
                    profile_image: data_uri.to_string(),
                },
                "Failed to upload image to server",
            )
            .await?;
        Ok(response.profile_image)
    }
}
