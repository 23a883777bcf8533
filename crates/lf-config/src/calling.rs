//! Call schedule and calling-window configuration.
//!
//! The voice agent consults [`CallSchedule::should_attempt`] before redialing a
//! lead and [`CallWindow::is_open`] before dialing at all.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, Timelike, Utc};
use lf_core::entities::CallAttemptSettings;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of days in the redial schedule.
pub const SCHEDULE_DAYS: usize = 6;

/// Attempt cap and spacing for one day of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DayPlan {
    pub max_attempts: u32,
    pub min_interval_minutes: u32,
}

impl DayPlan {
    const fn new(max_attempts: u32, min_interval_minutes: u32) -> Self {
        Self {
            max_attempts,
            min_interval_minutes,
        }
    }
}

fn default_schedule() -> Vec<DayPlan> {
    vec![
        DayPlan::new(5, 45),
        DayPlan::new(4, 60),
        DayPlan::new(2, 120),
        DayPlan::new(2, 120),
        DayPlan::new(2, 120),
        DayPlan::new(0, 120),
    ]
}

const fn default_max_total_attempts() -> u32 {
    15
}

const fn default_rate_limit_per_minute() -> u32 {
    10
}

const fn default_start_hour() -> u32 {
    6
}

const fn default_end_hour() -> u32 {
    23
}

fn default_allowed_weekdays() -> Vec<u32> {
    (0..7).collect()
}

const fn default_utc_offset_hours() -> i32 {
    -7
}

// ---------------------------------------------------------------------------
// CallWindow
// ---------------------------------------------------------------------------

/// Local hours and weekdays during which calls may be placed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CallWindow {
    /// First allowed hour (inclusive, 0-23).
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,

    /// Last allowed hour (inclusive, 0-23).
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,

    /// Allowed weekdays, 0 = Monday.
    #[serde(default = "default_allowed_weekdays")]
    pub allowed_weekdays: Vec<u32>,

    /// Offset of the calling timezone from UTC.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for CallWindow {
    fn default() -> Self {
        Self {
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            allowed_weekdays: default_allowed_weekdays(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

impl CallWindow {
    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    /// Whether `now` falls inside the window in the configured timezone.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.offset());
        let hour = local.hour();
        let weekday = local.weekday().num_days_from_monday();
        hour >= self.start_hour && hour <= self.end_hour && self.allowed_weekdays.contains(&weekday)
    }

    /// Start of the local day containing `now`, in UTC.
    pub fn local_day_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.offset());
        let elapsed = Duration::seconds(i64::from(local.num_seconds_from_midnight()))
            + Duration::nanoseconds(i64::from(local.nanosecond()));
        now - elapsed
    }
}

// ---------------------------------------------------------------------------
// CallingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallingConfig {
    /// Per-day plans, day 1 first.
    #[serde(default = "default_schedule")]
    pub schedule: Vec<DayPlan>,

    /// Safety cap on attempts across all days.
    #[serde(default = "default_max_total_attempts")]
    pub max_total_attempts: u32,

    #[serde(default)]
    pub window: CallWindow,

    /// Most calls dialed per minute across all leads.
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
}

impl Default for CallingConfig {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            max_total_attempts: default_max_total_attempts(),
            window: CallWindow::default(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
        }
    }
}

impl CallingConfig {
    /// Attempt caps as configured, used until an operator stores their own.
    pub fn default_caps(&self) -> CallAttemptSettings {
        let mut caps = [0; SCHEDULE_DAYS];
        for (cap, plan) in caps.iter_mut().zip(&self.schedule) {
            *cap = plan.max_attempts;
        }
        CallAttemptSettings::from_array(caps)
    }

    /// Build the effective schedule, replacing the configured caps with
    /// operator-stored ones while keeping the configured intervals.
    pub fn schedule_with_caps(&self, caps: &CallAttemptSettings) -> CallSchedule {
        let days = caps
            .as_array()
            .iter()
            .enumerate()
            .map(|(i, &max_attempts)| DayPlan {
                max_attempts,
                min_interval_minutes: self
                    .schedule
                    .get(i)
                    .map_or(120, |plan| plan.min_interval_minutes),
            })
            .collect();
        CallSchedule {
            days,
            max_total_attempts: self.max_total_attempts,
            window: self.window.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a malformed schedule or window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.len() != SCHEDULE_DAYS {
            return Err(ConfigError::InvalidValue {
                field: "calling.schedule".into(),
                reason: format!("expected {SCHEDULE_DAYS} days, got {}", self.schedule.len()),
            });
        }
        let w = &self.window;
        if w.start_hour > 23 || w.end_hour > 23 || w.start_hour > w.end_hour {
            return Err(ConfigError::InvalidValue {
                field: "calling.window".into(),
                reason: format!("invalid hours {}..={}", w.start_hour, w.end_hour),
            });
        }
        if let Some(day) = w.allowed_weekdays.iter().find(|d| **d > 6) {
            return Err(ConfigError::InvalidValue {
                field: "calling.window.allowed_weekdays".into(),
                reason: format!("weekday {day} out of range 0-6"),
            });
        }
        if !(-12..=14).contains(&w.utc_offset_hours) {
            return Err(ConfigError::InvalidValue {
                field: "calling.window.utc_offset_hours".into(),
                reason: format!("{} out of range", w.utc_offset_hours),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CallSchedule
// ---------------------------------------------------------------------------

/// Verdict on whether a lead should be redialed now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    Attempt,
    /// Not now; try again on a later tick.
    Wait,
    /// The schedule is used up for this lead.
    Exhausted,
}

/// Effective redial schedule for one agent tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSchedule {
    pub days: Vec<DayPlan>,
    pub max_total_attempts: u32,
    pub window: CallWindow,
}

impl CallSchedule {
    /// Decide whether to call a lead whose previous calls started at `history`.
    pub fn should_attempt(&self, history: &[DateTime<Utc>], now: DateTime<Utc>) -> ScheduleDecision {
        let (Some(first), Some(last)) = (history.iter().min(), history.iter().max()) else {
            return ScheduleDecision::Attempt;
        };

        if history.len() >= self.max_total_attempts as usize {
            return ScheduleDecision::Exhausted;
        }

        let day = usize::try_from((now - *first).num_days()).unwrap_or(0) + 1;
        let Some(plan) = self.days.get(day - 1) else {
            return ScheduleDecision::Exhausted;
        };
        if plan.max_attempts == 0 {
            let later = self.days.iter().skip(day).any(|p| p.max_attempts > 0);
            return if later {
                ScheduleDecision::Wait
            } else {
                ScheduleDecision::Exhausted
            };
        }

        let today_start = self.window.local_day_start(now);
        let calls_today = history.iter().filter(|t| **t >= today_start).count();
        if calls_today >= plan.max_attempts as usize {
            return ScheduleDecision::Wait;
        }

        if now - *last < Duration::minutes(i64::from(plan.min_interval_minutes)) {
            return ScheduleDecision::Wait;
        }
        ScheduleDecision::Attempt
    }
}
