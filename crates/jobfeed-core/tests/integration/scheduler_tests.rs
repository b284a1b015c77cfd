use chrono::{TimeZone, Utc};
use jobfeed_core::Scheduler;
use jobfeed_core::pipeline::RunRequest;
use jobfeed_core::scheduler::{CronSchedule, ScheduleEntry};

#[test]
fn rescheduling_replaces_previous_cadence() {
    let now = Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap();
    let scheduler = Scheduler::new();

    let first = CronSchedule::parse("0 9 * * *", "UTC").unwrap();
    let second = CronSchedule::parse("30 10 * * *", "UTC").unwrap();
    scheduler.insert(ScheduleEntry::new("team", first, RunRequest::scheduled(), now));
    let replaced = scheduler.insert(ScheduleEntry::new("team", second, RunRequest::scheduled(), now));
    assert_eq!(replaced.map(|e| e.cron.expression().to_string()).as_deref(), Some("0 9 * * *"));

    // 09:00 passes without anything firing.
    assert!(scheduler.due(Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()).is_empty());

    let fired = scheduler.due(Utc.with_ymd_and_hms(2025, 3, 3, 10, 30, 0).unwrap());
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].destination_id, "team");
    assert_eq!(
        fired[0].scheduled_for,
        Utc.with_ymd_and_hms(2025, 3, 3, 10, 30, 0).unwrap()
    );
    assert_eq!(scheduler.entries().len(), 1);
}

#[test]
fn invalid_input_never_enters_registry() {
    let scheduler = Scheduler::new();
    assert!(
        scheduler
            .schedule("team", "61 * * * *", "UTC", RunRequest::scheduled())
            .is_err()
    );
    assert!(
        scheduler
            .schedule("team", "0 9 * * *", "Mars/Olympus", RunRequest::scheduled())
            .is_err()
    );
    assert!(scheduler.entries().is_empty());
}

#[test]
fn independent_destinations_fire_on_their_own_cadence() {
    let now = Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap();
    let scheduler = Scheduler::new();
    // 09:00 in Kolkata is 03:30 UTC.
    let kolkata = CronSchedule::daily(9, 0, "Asia/Kolkata").unwrap();
    let utc = CronSchedule::daily(9, 0, "UTC").unwrap();
    scheduler.insert(ScheduleEntry::new("in", kolkata, RunRequest::scheduled(), now));
    scheduler.insert(ScheduleEntry::new("uk", utc, RunRequest::scheduled(), now));

    let early = scheduler.due(Utc.with_ymd_and_hms(2025, 3, 3, 3, 30, 0).unwrap());
    assert_eq!(early.len(), 1);
    assert_eq!(early[0].destination_id, "in");

    let later = scheduler.due(Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap());
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].destination_id, "uk");
}
