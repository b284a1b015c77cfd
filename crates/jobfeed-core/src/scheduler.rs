//! Recurring per-destination refreshes driven by one cadence clock.
//!
//! Each destination has at most one [`ScheduleEntry`]. Scheduling a
//! destination again replaces its entry; the old cadence never fires again.
//!
//! ```text
//! schedule()/unschedule() ──► registry ──notify──┐
//!                                                ▼
//! run(): sleep until earliest next fire ──► due(now) ──► handler.fire(trigger)
//! ```
//!
//! Entries live in memory only and are lost on restart.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::models::PipelineOutcome;
use crate::pipeline::RunRequest;

/// Upper bound on how long the clock sleeps without re-checking the registry.
const MAX_IDLE: Duration = Duration::from_secs(60);

/// A validated 5-field cron expression bound to a timezone.
#[derive(Clone)]
pub struct CronSchedule {
    expression: String,
    timezone: Tz,
    schedule: cron::Schedule,
}

impl CronSchedule {
    /// Parse `minute hour day-of-month month day-of-week` in an IANA timezone.
    ///
    /// Numeric days of week follow the POSIX convention (0 or 7 is Sunday).
    pub fn parse(expression: &str, timezone: &str) -> Result<Self, AppError> {
        let timezone = parse_timezone(timezone)?;
        let six_field = to_six_field(expression)?;
        let schedule = cron::Schedule::from_str(&six_field).map_err(|e| {
            AppError::ScheduleValidation(format!("invalid cron expression '{expression}': {e}"))
        })?;
        Ok(Self {
            expression: expression.split_whitespace().collect::<Vec<_>>().join(" "),
            timezone,
            schedule,
        })
    }

    /// Every day at `hour:minute` local time.
    pub fn daily(hour: u32, minute: u32, timezone: &str) -> Result<Self, AppError> {
        if hour > 23 || minute > 59 {
            return Err(AppError::ScheduleValidation(format!(
                "time of day out of range: {hour:02}:{minute:02}"
            )));
        }
        Self::parse(&format!("{minute} {hour} * * *"), timezone)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&self.timezone))
            .next()
            .map(|t| t.with_timezone(&Utc))
    }
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronSchedule")
            .field("expression", &self.expression)
            .field("timezone", &self.timezone)
            .finish()
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, AppError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| AppError::ScheduleValidation(format!("unknown timezone '{name}': {e}")))
}

/// Parse a 24h `HH:MM` time of day.
pub fn parse_hhmm(value: &str) -> Result<(u32, u32), AppError> {
    let invalid = || AppError::ScheduleValidation(format!("expected HH:MM, got '{value}'"));
    let (h, m) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.trim().parse().map_err(|_| invalid())?;
    let minute: u32 = m.trim().parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

/// Prefix a zero seconds field and rewrite numeric days of week as names.
fn to_six_field(expression: &str) -> Result<String, AppError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(AppError::ScheduleValidation(format!(
            "expected 5 cron fields (minute hour day month weekday), got {} in '{expression}'",
            fields.len()
        )));
    }
    let dow = translate_weekdays(fields[4])?;
    Ok(format!(
        "0 {} {} {} {} {}",
        fields[0], fields[1], fields[2], fields[3], dow
    ))
}

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// A numeric day of week (0-7), or `None` for names and `*`.
fn weekday_number(token: &str) -> Result<Option<usize>, AppError> {
    match token.parse::<usize>() {
        Ok(n) if n <= 7 => Ok(Some(n)),
        Ok(n) => Err(AppError::ScheduleValidation(format!(
            "day of week out of range: {n}"
        ))),
        Err(_) => Ok(None),
    }
}

fn parse_step(step: &str) -> Result<usize, AppError> {
    match step.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::ScheduleValidation(format!(
            "invalid day of week step '{step}'"
        ))),
    }
}

/// Rewrite numeric day-of-week terms as explicit lists of day names.
///
/// The cron crate numbers days from 1 = SUN, so numbers are expanded here
/// with POSIX meaning (0 and 7 are both Sunday). Names pass through.
fn translate_weekdays(field: &str) -> Result<String, AppError> {
    let mut parts = Vec::new();
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => (range, Some(parse_step(step)?)),
            None => (part, None),
        };
        let bounds = match range.split_once('-') {
            Some((start, end)) => match (weekday_number(start)?, weekday_number(end)?) {
                (Some(start), Some(end)) => Some((start, end)),
                (None, None) => None,
                _ => {
                    return Err(AppError::ScheduleValidation(format!(
                        "day of week range mixes names and numbers: '{range}'"
                    )));
                }
            },
            None if range == "*" => step.map(|_| (0, 7)),
            // `n/step` runs from n to the end of the week.
            None => weekday_number(range)?.map(|n| (n, if step.is_some() { 7 } else { n })),
        };
        let Some((start, end)) = bounds else {
            parts.push(part.to_string());
            continue;
        };
        if start > end {
            return Err(AppError::ScheduleValidation(format!(
                "day of week range runs backwards: '{range}'"
            )));
        }
        let mut days: Vec<usize> = (start..=end)
            .step_by(step.unwrap_or(1))
            .map(|n| n % 7)
            .collect();
        days.sort_unstable();
        days.dedup();
        parts.extend(days.into_iter().map(|n| WEEKDAYS[n].to_string()));
    }
    Ok(parts.join(","))
}

/// One destination's recurring refresh.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub destination_id: String,
    pub cron: CronSchedule,
    pub request: RunRequest,
    pub next_fire: Option<DateTime<Utc>>,
}

impl ScheduleEntry {
    pub fn new(
        destination_id: impl Into<String>,
        cron: CronSchedule,
        request: RunRequest,
        now: DateTime<Utc>,
    ) -> Self {
        let next_fire = cron.next_after(now);
        Self {
            destination_id: destination_id.into(),
            cron,
            request,
            next_fire,
        }
    }
}

/// A fired entry, handed to the [`TriggerHandler`].
#[derive(Debug, Clone)]
pub struct Trigger {
    pub destination_id: String,
    pub request: RunRequest,
    pub scheduled_for: DateTime<Utc>,
}

/// Runs the pipeline for a fired trigger.
pub trait TriggerHandler: Send + Sync {
    fn fire(
        &self,
        trigger: &Trigger,
    ) -> impl Future<Output = Result<PipelineOutcome, AppError>> + Send;
}

/// Events emitted by the cadence clock for monitoring/logging.
#[derive(Debug, Clone)]
pub enum SchedulerEvent<'a> {
    Started {
        entries: usize,
    },
    Fired {
        trigger: &'a Trigger,
    },
    Completed {
        destination_id: &'a str,
        outcome: &'a PipelineOutcome,
    },
    Failed {
        destination_id: &'a str,
        error: &'a str,
    },
    Stopped,
}

/// Trait for receiving scheduler events (decoupled logging).
pub trait SchedulerReporter: Send + Sync {
    fn report(&self, event: SchedulerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSchedulerReporter;

impl SchedulerReporter for TracingSchedulerReporter {
    fn report(&self, event: SchedulerEvent<'_>) {
        match event {
            SchedulerEvent::Started { entries } => {
                tracing::info!(%entries, "Scheduler started");
            }
            SchedulerEvent::Fired { trigger } => {
                tracing::info!(
                    destination = %trigger.destination_id,
                    scheduled_for = %trigger.scheduled_for,
                    "Scheduled refresh fired"
                );
            }
            SchedulerEvent::Completed {
                destination_id,
                outcome,
            } => {
                tracing::info!(destination = %destination_id, ?outcome, "Scheduled refresh completed");
            }
            SchedulerEvent::Failed {
                destination_id,
                error,
            } => {
                tracing::error!(destination = %destination_id, %error, "Scheduled refresh failed");
            }
            SchedulerEvent::Stopped => {
                tracing::info!("Scheduler stopped");
            }
        }
    }
}

/// Registry of schedule entries plus the clock that fires them.
#[derive(Default)]
pub struct Scheduler {
    entries: Mutex<HashMap<String, ScheduleEntry>>,
    changed: Notify,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a cron schedule, replacing any existing entry
    /// for the same destination. Invalid input never reaches the registry.
    pub fn schedule(
        &self,
        destination_id: &str,
        expression: &str,
        timezone: &str,
        request: RunRequest,
    ) -> Result<ScheduleEntry, AppError> {
        let cron = CronSchedule::parse(expression, timezone)?;
        self.register(destination_id, cron, request)
    }

    /// Register a refresh every day at `hour:minute` in `timezone`.
    pub fn schedule_daily(
        &self,
        destination_id: &str,
        hour: u32,
        minute: u32,
        timezone: &str,
        request: RunRequest,
    ) -> Result<ScheduleEntry, AppError> {
        let cron = CronSchedule::daily(hour, minute, timezone)?;
        self.register(destination_id, cron, request)
    }

    fn register(
        &self,
        destination_id: &str,
        cron: CronSchedule,
        request: RunRequest,
    ) -> Result<ScheduleEntry, AppError> {
        let entry = ScheduleEntry::new(destination_id, cron, request, Utc::now());
        if entry.next_fire.is_none() {
            return Err(AppError::ScheduleValidation(format!(
                "cron expression '{}' never fires",
                entry.cron.expression()
            )));
        }
        self.insert(entry.clone());
        Ok(entry)
    }

    /// Insert a pre-built entry. Returns the entry it replaced, if any.
    pub fn insert(&self, entry: ScheduleEntry) -> Option<ScheduleEntry> {
        tracing::info!(
            destination = %entry.destination_id,
            cron = %entry.cron.expression(),
            timezone = %entry.cron.timezone(),
            next_fire = ?entry.next_fire,
            "Schedule registered"
        );
        let replaced = self
            .lock_entries()
            .insert(entry.destination_id.clone(), entry);
        if let Some(old) = &replaced {
            tracing::info!(destination = %old.destination_id, cron = %old.cron.expression(), "Replaced previous schedule");
        }
        self.changed.notify_one();
        replaced
    }

    /// Remove a destination's schedule. Returns whether one existed.
    pub fn unschedule(&self, destination_id: &str) -> bool {
        let removed = self.lock_entries().remove(destination_id).is_some();
        if removed {
            tracing::info!(destination = %destination_id, "Schedule removed");
            self.changed.notify_one();
        }
        removed
    }

    /// Snapshot of all entries, ordered by destination id.
    pub fn entries(&self) -> Vec<ScheduleEntry> {
        let mut entries: Vec<_> = self.lock_entries().values().cloned().collect();
        entries.sort_by(|a, b| a.destination_id.cmp(&b.destination_id));
        entries
    }

    pub fn next_fire(&self, destination_id: &str) -> Option<DateTime<Utc>> {
        self.lock_entries()
            .get(destination_id)
            .and_then(|e| e.next_fire)
    }

    /// Pop every entry due at `now` and advance it past `now`.
    ///
    /// Missed fire times coalesce into a single trigger per entry.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<Trigger> {
        let mut entries = self.lock_entries();
        let mut fired = Vec::new();
        for entry in entries.values_mut() {
            let Some(at) = entry.next_fire else { continue };
            if at > now {
                continue;
            }
            fired.push(Trigger {
                destination_id: entry.destination_id.clone(),
                request: entry.request.clone(),
                scheduled_for: at,
            });
            entry.next_fire = entry.cron.next_after(now);
        }
        fired.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then_with(|| a.destination_id.cmp(&b.destination_id))
        });
        fired
    }

    fn earliest(&self) -> Option<DateTime<Utc>> {
        self.lock_entries().values().filter_map(|e| e.next_fire).min()
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, ScheduleEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drive the clock until cancellation.
    ///
    /// Fired triggers run one after another; a failing run is reported and
    /// the loop carries on.
    pub async fn run<H, R>(&self, handler: &H, reporter: &R, cancel: CancellationToken)
    where
        H: TriggerHandler,
        R: SchedulerReporter,
    {
        reporter.report(SchedulerEvent::Started {
            entries: self.lock_entries().len(),
        });

        loop {
            if cancel.is_cancelled() {
                break;
            }

            for trigger in self.due(Utc::now()) {
                reporter.report(SchedulerEvent::Fired { trigger: &trigger });
                match handler.fire(&trigger).await {
                    Ok(outcome) => reporter.report(SchedulerEvent::Completed {
                        destination_id: &trigger.destination_id,
                        outcome: &outcome,
                    }),
                    Err(e) => {
                        let error = e.to_string();
                        reporter.report(SchedulerEvent::Failed {
                            destination_id: &trigger.destination_id,
                            error: &error,
                        });
                    }
                }
            }

            let wait = self
                .earliest()
                .map(|at| (at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
                .map_or(MAX_IDLE, |d| d.min(MAX_IDLE));

            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = self.changed.notified() => {}
                () = cancel.cancelled() => break,
            }
        }

        reporter.report(SchedulerEvent::Stopped);
    }
}
