//! The polling contract shared by both agents, and the loop that drives it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lf_core::errors::CoreError;
use lf_db::error::DatabaseError;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

use crate::error::AgentError;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Leads moved into `calling` or `entry_in_progress`.
    pub claimed: usize,
    /// Calls dialed or entries submitted that the vendor accepted.
    pub sent: usize,
    /// Calls or entries that failed.
    pub failed: usize,
    /// Work left for a later tick (schedule, rate limit, stale state).
    pub deferred: usize,
}

impl TickReport {
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.claimed == 0 && self.sent == 0 && self.failed == 0
    }
}

#[async_trait]
pub trait PollingAgent: Send {
    fn name(&self) -> &'static str;

    /// One polling pass at `now`.
    async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport, AgentError>;
}

/// Another writer got to the lead first. The agent skips it this tick.
pub(crate) const fn is_stale(err: &DatabaseError) -> bool {
    matches!(
        err,
        DatabaseError::Conflict(_)
            | DatabaseError::Core(CoreError::InvalidTransition { .. } | CoreError::Validation(_))
    )
}

/// Tick `agent` every `period` until `shutdown` fires. A failed tick pauses
/// for `backoff` before the next one.
pub(crate) async fn run_loop<A: PollingAgent>(
    mut agent: A,
    period: Duration,
    backoff: Duration,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
) {
    let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(agent = agent.name(), period_secs = period.as_secs(), "agent loop started");

    loop {
        tokio::select! {
            biased;

            () = shutdown.notified() => break,

            _ = interval.tick() => {
                match agent.tick(Utc::now()).await {
                    Ok(report) if report.is_idle() => {
                        tracing::debug!(agent = agent.name(), deferred = report.deferred, "idle tick");
                    }
                    Ok(report) => {
                        tracing::info!(
                            agent = agent.name(),
                            claimed = report.claimed,
                            sent = report.sent,
                            failed = report.failed,
                            deferred = report.deferred,
                            "tick finished"
                        );
                    }
                    Err(e) => {
                        tracing::error!(agent = agent.name(), "tick failed: {e}");
                        tokio::select! {
                            biased;
                            () = shutdown.notified() => break,
                            () = tokio::time::sleep(backoff) => {}
                        }
                    }
                }
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    tracing::info!(agent = agent.name(), "agent loop stopped");
}
