use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::{
    api::{AdminStats, AdminUserDetail, AdminUserSummary, ApiClient, AttendanceRecord},
    error::ClientError,
    utils::download::{save_export, XLSX_MIME},
};

/// Read-only admin views. Only constructible for a cached admin identity.
#[derive(Clone)]
pub struct AdminConsole {
    api: ApiClient,
}

impl AdminConsole {
    pub async fn open(api: ApiClient) -> Result<Self, ClientError> {
        let is_admin = api
            .session()
            .cached_user()
            .await?
            .is_some_and(|user| user.is_admin());
        if !is_admin {
            tracing::warn!("Admin console requested without admin role");
            return Err(ClientError::AccessDenied);
        }
        Ok(Self { api })
    }

    pub async fn stats(&self) -> Result<AdminStats, ClientError> {
        self.api.admin_stats().await
    }

    pub async fn users(&self) -> Result<Vec<AdminUserSummary>, ClientError> {
        self.api.admin_list_users().await
    }

    pub async fn user_detail(&self, user_id: &str) -> Result<AdminUserDetail, ClientError> {
        if user_id.trim().is_empty() {
            return Err(ClientError::Validation("User id is required".into()));
        }
        self.api.admin_get_user(user_id).await
    }

    /// Downloads the spreadsheet into `dir` and returns the written path.
    pub async fn export_to(&self, dir: &Path) -> Result<PathBuf, ClientError> {
        let bytes = self.api.admin_export_users().await?;
        let path = save_export(dir, &bytes, Utc::now()).await?;
        tracing::debug!(path = %path.display(), mime = XLSX_MIME, "User export saved");
        Ok(path)
    }
}

pub fn record_status(record: &AttendanceRecord) -> &'static str {
    if record.is_open() {
        "Active"
    } else {
        "Completed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{client_for, seeded_admin_client, seeded_client, NINE_AM};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn non_admin_is_denied() {
        let server = MockServer::start_async().await;
        let err = AdminConsole::open(seeded_client(&server).await)
            .await
            .err()
            .unwrap();
        assert_eq!(err.notice().title, "Access Denied");
        assert_eq!(err.notice().message, "You don't have admin privileges");

        let err = AdminConsole::open(client_for(&server)).await.err().unwrap();
        assert!(matches!(err, ClientError::AccessDenied));
    }

    #[tokio::test]
    async fn stats_and_users_unwrap_envelope() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/admin/stats")
                    .header("authorization", "Bearer admin-token");
                then.status(200).json_body(json!({
                    "success": true,
                    "data": {
                        "totalUsers": 12,
                        "totalAdmins": 2,
                        "recentUsers": [{ "username": "bob", "email": "bob@example.com" }]
                    }
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/admin/users");
                then.status(200).json_body(json!({
                    "success": true,
                    "data": { "users": [{
                        "_id": "u2", "username": "bob", "email": "bob@example.com",
                        "role": "user", "createdAt": "2024-11-01T10:00:00Z"
                    }]}
                }));
            })
            .await;
        let console = AdminConsole::open(seeded_admin_client(&server).await)
            .await
            .unwrap();

        let stats = console.stats().await.unwrap();
        assert_eq!(stats.total_users, 12);
        assert_eq!(stats.recent_users[0].username, "bob");

        let users = console.users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "u2");
    }

    #[tokio::test]
    async fn unsuccessful_envelope_uses_its_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/admin/users/u404");
                then.status(200)
                    .json_body(json!({ "success": false, "message": "User not found" }));
            })
            .await;
        let console = AdminConsole::open(seeded_admin_client(&server).await)
            .await
            .unwrap();

        let err = console.user_detail("u404").await.unwrap_err();
        assert_eq!(err.to_string(), "User not found");
        assert!(console.user_detail(" ").await.is_err());
    }

    #[tokio::test]
    async fn user_detail_includes_history_and_statistics() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/admin/users/u2");
                then.status(200).json_body(json!({
                    "success": true,
                    "data": {
                        "user": { "_id": "u2", "username": "bob", "email": "bob@example.com", "role": "user" },
                        "attendanceHistory": [
                            { "checkinTime": NINE_AM, "checkoutTime": null },
                            { "checkinTime": "2025-01-01T09:00:00Z", "checkoutTime": "2025-01-01T17:30:00Z", "totalHours": 8.5 }
                        ],
                        "statistics": {
                            "totalHoursLast30Days": 42.5,
                            "attendanceDaysLast30Days": 5,
                            "currentMonthAttendance": 2
                        }
                    }
                }));
            })
            .await;
        let console = AdminConsole::open(seeded_admin_client(&server).await)
            .await
            .unwrap();

        let detail = console.user_detail("u2").await.unwrap();
        let statuses: Vec<&str> = detail.attendance_history.iter().map(record_status).collect();
        assert_eq!(statuses, vec!["Active", "Completed"]);
        assert_eq!(detail.statistics.attendance_days_last30_days, 5);
    }

    #[tokio::test]
    async fn export_writes_spreadsheet_bytes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/admin/export-users");
                then.status(200)
                    .header("content-type", XLSX_MIME)
                    .body(b"PK\x03\x04sheet".to_vec());
            })
            .await;
        let console = AdminConsole::open(seeded_admin_client(&server).await)
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();

        let path = console.export_to(dir.path()).await.unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("users_export_") && name.ends_with(".xlsx"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"PK\x03\x04sheet");
    }

    #[tokio::test]
    async fn failed_export_writes_nothing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/admin/export-users");
                then.status(500).body("boom");
            })
            .await;
        let console = AdminConsole::open(seeded_admin_client(&server).await)
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = console.export_to(dir.path()).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to export data");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
