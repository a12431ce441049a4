use super::client::ApiClient;
use crate::{device::DeviceInfo, error::ClientError};

impl ApiClient {
    /// Idempotent upsert keyed server-side by user and device.
    pub async fn save_device_info(&self, info: &DeviceInfo) -> Result<(), ClientError> {
        let headers = self.get_auth_headers().await?;
        let raw = self
            .send(
                self.http_client()
                    .post(self.endpoint("/saveDeviceInfo"))
                    .headers(headers)
                    .json(info),
            )
            .await?;
        if raw.status.is_success() {
            Ok(())
        } else {
            Err(raw.rejection("Failed to save device info"))
        }
    }
}
