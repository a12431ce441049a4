use super::{
    client::ApiClient,
    types::{AttendanceRecord, RecordEnvelope, TodayStatus},
};
use crate::{error::ClientError, location::ResolvedLocation};

impl ApiClient {
    pub async fn get_today_attendance(&self) -> Result<TodayStatus, ClientError> {
        self.get_authed("/attendance/today", "Failed to fetch attendance")
            .await
    }

    pub async fn check_in(&self, location: &ResolvedLocation) -> Result<AttendanceRecord, ClientError> {
        let envelope: RecordEnvelope = self
            .post_authed("/attendance/checkin", location, "Check-in failed")
            .await?;
        checked(envelope.into_record())
    }

    pub async fn check_out(&self, location: &ResolvedLocation) -> Result<AttendanceRecord, ClientError> {
        let envelope: RecordEnvelope = self
            .post_authed("/attendance/checkout", location, "Check-out failed")
            .await?;
        checked(envelope.into_record())
    }
}

fn checked(record: AttendanceRecord) -> Result<AttendanceRecord, ClientError> {
    if record.is_consistent() {
        Ok(record)
    } else {
        tracing::warn!(checkin = %record.checkin_time, checkout = ?record.checkout_time, "Server returned checkout before checkin");
        Err(ClientError::malformed(200, "checkout precedes checkin"))
    }
}
