//! Today's attendance session: which action is allowed, the live elapsed
//! time while checked in, and the resync after every action.
//!
//! The tracker never mutates the record locally. Every successful action is
//! followed by a fresh `GET /attendance/today`, so the flags always mirror
//! what the server decided, including day rollover.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::{
    api::{ApiClient, AttendanceRecord, TodayStatus},
    error::ClientError,
    location::LocationResolver,
    state::elapsed::ElapsedTicker,
    utils::time::format_total_hours,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No record yet today; only check-in is offered.
    NoRecord,
    /// Checked in, not yet out; only check-out is offered.
    OpenSession,
    /// Cycle complete until the server opens a new day.
    ClosedForDay,
}

impl SessionPhase {
    /// Derives the phase from the server's flags. `None` when the payload
    /// contradicts itself.
    pub fn from_status(status: &TodayStatus) -> Option<Self> {
        match (status.can_checkin, status.can_checkout) {
            (true, true) => None,
            (true, false) => match status.attendance {
                None => Some(SessionPhase::NoRecord),
                Some(_) => None,
            },
            (false, true) => status
                .attendance
                .as_ref()
                .filter(|record| record.is_open())
                .map(|_| SessionPhase::OpenSession),
            (false, false) => Some(SessionPhase::ClosedForDay),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFlags {
    pub can_checkin: bool,
    pub can_checkout: bool,
}

impl From<Option<SessionPhase>> for SessionFlags {
    fn from(phase: Option<SessionPhase>) -> Self {
        Self {
            can_checkin: phase == Some(SessionPhase::NoRecord),
            can_checkout: phase == Some(SessionPhase::OpenSession),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceState {
    pub record: Option<AttendanceRecord>,
    pub phase: Option<SessionPhase>,
    pub loading: bool,
}

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct SessionTracker {
    api: ApiClient,
    state: AttendanceState,
    ticker: Option<ElapsedTicker>,
    clock: Clock,
}

impl SessionTracker {
    pub fn new(api: ApiClient) -> Self {
        Self::with_clock(api, Arc::new(Utc::now))
    }

    pub fn with_clock(api: ApiClient, clock: Clock) -> Self {
        Self {
            api,
            state: AttendanceState::default(),
            ticker: None,
            clock,
        }
    }

    pub fn state(&self) -> &AttendanceState {
        &self.state
    }

    pub fn phase(&self) -> Option<SessionPhase> {
        self.state.phase
    }

    pub fn flags(&self) -> SessionFlags {
        SessionFlags::from(self.state.phase)
    }

    pub fn elapsed(&self) -> Option<String> {
        self.ticker.as_ref().map(ElapsedTicker::current)
    }

    pub fn subscribe_elapsed(&self) -> Option<watch::Receiver<String>> {
        self.ticker.as_ref().map(ElapsedTicker::subscribe)
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(ElapsedTicker::is_running)
    }

    /// Tears the ticker down, e.g. when the hosting screen goes away.
    pub fn stop_elapsed(&mut self) {
        self.ticker = None;
    }

    /// On failure the previous state is kept as-is (minus `loading`).
    pub async fn fetch_today(&mut self) -> Result<SessionFlags, ClientError> {
        self.state.loading = true;
        let result = self.load_today().await;
        self.state.loading = false;

        let (status, phase) = result?;
        self.state.record = status.attendance;
        self.state.phase = Some(phase);
        self.sync_ticker();
        tracing::debug!(?phase, "Today's attendance refreshed");
        Ok(self.flags())
    }

    async fn load_today(&self) -> Result<(TodayStatus, SessionPhase), ClientError> {
        let status = self.api.get_today_attendance().await?;
        if let Some(record) = &status.attendance {
            if !record.is_consistent() {
                return Err(ClientError::malformed(200, "checkout precedes checkin"));
            }
        }
        let phase = SessionPhase::from_status(&status).ok_or_else(|| {
            ClientError::malformed(
                200,
                format!(
                    "inconsistent attendance flags (canCheckin={}, canCheckout={})",
                    status.can_checkin, status.can_checkout
                ),
            )
        })?;
        Ok((status, phase))
    }

    /// Resolves the location first; no request is issued if that fails.
    pub async fn check_in(&mut self, resolver: &LocationResolver) -> Result<AttendanceRecord, ClientError> {
        if !self.flags().can_checkin {
            return Err(ClientError::Precondition(
                "Check-in is not available right now".into(),
            ));
        }
        let location = resolver.resolve().await?;
        let record = self.api.check_in(&location).await?;
        tracing::info!(address = ?location.address, "Checked in");
        self.resync().await;
        Ok(record)
    }

    pub async fn check_out(&mut self, resolver: &LocationResolver) -> Result<AttendanceRecord, ClientError> {
        if !self.flags().can_checkout {
            return Err(ClientError::Precondition(
                "Check-out is not available right now".into(),
            ));
        }
        let location = resolver.resolve().await?;
        let record = self.api.check_out(&location).await?;
        tracing::info!(total_hours = ?record.total_hours, "Checked out");
        self.resync().await;
        Ok(record)
    }

    /// The action already succeeded server-side; a failed refresh only
    /// leaves stale flags until the next fetch.
    async fn resync(&mut self) {
        if let Err(err) = self.fetch_today().await {
            tracing::warn!(error = %err, "Failed to refresh attendance after action");
        }
    }

    fn sync_ticker(&mut self) {
        let open_checkin = match (self.state.phase, &self.state.record) {
            (Some(SessionPhase::OpenSession), Some(record)) => Some(record.checkin_time),
            _ => None,
        };

        match open_checkin {
            Some(checkin) => {
                let running = self
                    .ticker
                    .as_ref()
                    .is_some_and(|ticker| ticker.checkin() == checkin);
                if !running {
                    self.ticker = Some(ElapsedTicker::start(checkin, (self.clock)()));
                }
            }
            None => self.ticker = None,
        }
    }

    pub fn status_line(&self) -> String {
        match (self.state.phase, &self.state.record) {
            (Some(SessionPhase::OpenSession), _) => "You are currently checked in".to_string(),
            (Some(SessionPhase::ClosedForDay), Some(record)) if record.checkout_time.is_some() => {
                format!(
                    "Completed - Total: {}h",
                    format_total_hours(record.total_hours.unwrap_or(0.0))
                )
            }
            (Some(SessionPhase::NoRecord), _) => "Click Check In to start your day".to_string(),
            (Some(SessionPhase::ClosedForDay), _) => "Attendance recorded for today".to_string(),
            (None, _) => "Attendance not loaded".to_string(),
        }
    }
}

pub fn checkout_message(record: &AttendanceRecord) -> String {
    format!(
        "Checked out successfully! Total hours: {}h",
        format_total_hours(record.total_hours.unwrap_or(0.0))
    )
}
