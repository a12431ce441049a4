use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;

use super::{
    client::ApiClient,
    types::{AdminStats, AdminUserDetail, AdminUserList, AdminUserSummary, ApiEnvelope},
};
use crate::error::ClientError;

impl ApiClient {
    async fn get_enveloped<T: DeserializeOwned>(
        &self,
        path: &str,
        fallback: &str,
    ) -> Result<T, ClientError> {
        let envelope: ApiEnvelope<T> = self.get_authed(path, fallback).await?;
        match envelope {
            ApiEnvelope {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            ApiEnvelope {
                success: true,
                data: None,
                ..
            } => Err(ClientError::malformed(200, "missing `data` in admin response")),
            ApiEnvelope { message, .. } => Err(ClientError::rejected(
                200,
                message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
            )),
        }
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, ClientError> {
        self.get_enveloped("/admin/stats", "Failed to fetch user stats")
            .await
    }

    pub async fn admin_list_users(&self) -> Result<Vec<AdminUserSummary>, ClientError> {
        let list: AdminUserList = self
            .get_enveloped("/admin/users", "Failed to fetch users")
            .await?;
        Ok(list.users)
    }

    pub async fn admin_get_user(&self, user_id: &str) -> Result<AdminUserDetail, ClientError> {
        let path = format!(
            "/admin/users/{}",
            utf8_percent_encode(user_id, NON_ALPHANUMERIC)
        );
        self.get_enveloped(&path, "Failed to fetch user details")
            .await
    }

    /// Raw spreadsheet bytes produced by the server.
    pub async fn admin_export_users(&self) -> Result<Vec<u8>, ClientError> {
        let headers = self.get_auth_headers().await?;
        let response = self
            .http_client()
            .get(self.endpoint("/admin/export-users"))
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let raw = super::client::RawResponse { status, body };
            return Err(raw.rejection("Failed to export data"));
        }

        let bytes = response.bytes().await?;
        tracing::debug!(bytes = bytes.len(), "Export downloaded");
        Ok(bytes.to_vec())
    }
}
