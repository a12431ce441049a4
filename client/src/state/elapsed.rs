use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::utils::time::{elapsed_between, format_elapsed};

/// One-second ticker publishing `HH:MM:SS` since check-in.
///
/// The wall clock is read once to seed the offset; after that the value
/// advances on a monotonic clock, so it never goes backwards while the
/// ticker lives. Dropping the ticker aborts the task.
#[derive(Debug)]
pub struct ElapsedTicker {
    checkin: DateTime<Utc>,
    handle: JoinHandle<()>,
    rx: watch::Receiver<String>,
}

impl ElapsedTicker {
    pub fn start(checkin: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let offset = elapsed_between(checkin, now);
        let anchor = Instant::now();
        let (tx, rx) = watch::channel(format_elapsed(offset));

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(anchor + Duration::from_secs(1), Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let elapsed = offset + anchor.elapsed();
                if tx.send(format_elapsed(elapsed)).is_err() {
                    break;
                }
            }
        });

        tracing::debug!(%checkin, "Elapsed ticker started");
        Self {
            checkin,
            handle,
            rx,
        }
    }

    pub fn checkin(&self) -> DateTime<Utc> {
        self.checkin
    }

    pub fn current(&self) -> String {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.rx.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ElapsedTicker {
    fn drop(&mut self) {
        self.handle.abort();
        tracing::debug!(checkin = %self.checkin, "Elapsed ticker stopped");
    }
}
