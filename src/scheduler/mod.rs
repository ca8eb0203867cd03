//! Recording scheduler
//!
//! A single ticking task polls the store once a minute, claims due
//! recordings via the store's compare-and-set status update and spawns
//! one detached capture task per claim. The compare-and-set is the only
//! synchronization primitive: of any number of callers racing to start
//! the same recording, exactly one observes success.

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use crate::capture::CaptureWorker;
use crate::database::Database;
use crate::models::{Recording, RecordingStatus};

/// Fixed polling interval. The due window below is sized to match, so a
/// recording is matched on exactly one tick.
pub const TICK_INTERVAL: Duration = Duration::from_secs(60);

const DUE_WINDOW_MINUTES: i64 = 1;

/// Where a pending recording stands relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartWindow {
    /// Start instant is still in the future.
    NotYet,
    /// `now` falls within `[start, start + 1 minute)`: claim and launch.
    Due,
    /// Past the launch window but before `start + duration`; never
    /// launched late.
    Missed,
    /// The whole capture window has passed; the recording can never run.
    Elapsed,
}

/// Resolve an IANA timezone name, degrading to UTC when it cannot be
/// parsed. A bad timezone must never take the scheduler down.
pub fn resolve_timezone(name: &str) -> Tz {
    match Tz::from_str(name) {
        Ok(tz) => tz,
        Err(_) => {
            warn!("Unknown timezone '{}', falling back to UTC", name);
            Tz::UTC
        }
    }
}

/// Combine a recording's date and wall-clock start time with the
/// configured timezone. Returns `None` when the stored fields don't
/// parse or the local time doesn't exist in that zone.
fn resolve_start_instant(recording: &Recording, tz: Tz) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(
        &format!("{} {}", recording.date, recording.start_time),
        "%Y-%m-%d %H:%M",
    )
    .ok()?;

    // An ambiguous local time (DST fold) resolves to the earlier instant.
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn classify(recording: &Recording, tz: Tz, now: DateTime<Utc>) -> Option<StartWindow> {
    let start = resolve_start_instant(recording, tz)?;
    let launch_deadline = start + ChronoDuration::minutes(DUE_WINDOW_MINUTES);
    let end = start + ChronoDuration::minutes(recording.duration);

    if now < start {
        Some(StartWindow::NotYet)
    } else if now < launch_deadline {
        Some(StartWindow::Due)
    } else if now > end {
        Some(StartWindow::Elapsed)
    } else {
        Some(StartWindow::Missed)
    }
}

pub struct SchedulerService {
    database: Database,
    timezone: Tz,
    worker: Arc<CaptureWorker>,
}

impl SchedulerService {
    pub fn new(database: Database, timezone_name: &str, worker: Arc<CaptureWorker>) -> Self {
        let timezone = resolve_timezone(timezone_name);
        Self {
            database,
            timezone,
            worker,
        }
    }

    /// Run the recovery pass, then tick forever. A failed tick is logged
    /// and retried on the next interval; nothing here is fatal.
    pub async fn start(self) -> Result<()> {
        info!(
            "Starting recording scheduler (timezone {}, tick interval {}s)",
            self.timezone,
            TICK_INTERVAL.as_secs()
        );

        if let Err(e) = self.run_recovery_pass(Utc::now()).await {
            error!("Scheduler recovery pass failed: {}", e);
        }

        let mut ticker = interval(TICK_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_tick(Utc::now()).await {
                error!("Scheduler tick failed: {}", e);
            }
        }
    }

    /// One scheduling pass over a single snapshot of the pending list and
    /// a single `now`. Recordings created after the snapshot are picked
    /// up on the next tick.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<()> {
        let pending = self
            .database
            .list_recordings_by_status(RecordingStatus::Pending)
            .await?;

        for recording in pending {
            match classify(&recording, self.timezone, now) {
                Some(StartWindow::Due) => self.claim_and_launch(recording).await,
                Some(StartWindow::Elapsed) => self.fail_elapsed(&recording).await,
                Some(StartWindow::NotYet) | Some(StartWindow::Missed) => {}
                None => {
                    warn!(
                        "Recording {} has unparseable start time '{} {}'; skipping",
                        recording.id, recording.date, recording.start_time
                    );
                }
            }
        }

        Ok(())
    }

    /// Startup pass: apply the regular due/elapsed logic immediately so a
    /// restart doesn't silently strand recordings that were pending when
    /// the process died, then reconcile rows stuck in `recording` whose
    /// capture window has fully passed (a worker crashed before writing
    /// its terminal status).
    pub async fn run_recovery_pass(&self, now: DateTime<Utc>) -> Result<()> {
        self.run_tick(now).await?;

        let in_flight = self
            .database
            .list_recordings_by_status(RecordingStatus::Recording)
            .await?;

        for recording in in_flight {
            if classify(&recording, self.timezone, now) == Some(StartWindow::Elapsed) {
                warn!(
                    "Recording {} stuck in 'recording' past its window; marking failed",
                    recording.id
                );
                match self
                    .database
                    .update_recording_status(
                        recording.id,
                        RecordingStatus::Recording,
                        RecordingStatus::Failed,
                    )
                    .await
                {
                    Ok(_) => {}
                    Err(e) => error!("Failed to reconcile recording {}: {}", recording.id, e),
                }
            }
        }

        Ok(())
    }

    async fn claim_and_launch(&self, recording: Recording) {
        match self
            .database
            .update_recording_status(
                recording.id,
                RecordingStatus::Pending,
                RecordingStatus::Recording,
            )
            .await
        {
            Ok(true) => {
                info!(
                    "Recording {} due (channel {}, {} {}); launching capture",
                    recording.id, recording.channel_id, recording.date, recording.start_time
                );
                let worker = self.worker.clone();
                tokio::spawn(async move {
                    worker.run(recording).await;
                });
            }
            Ok(false) => {
                // Another caller won the claim; this recording already started.
                debug!("Recording {} claimed elsewhere; skipping", recording.id);
            }
            Err(e) => error!("Failed to claim recording {}: {}", recording.id, e),
        }
    }

    async fn fail_elapsed(&self, recording: &Recording) {
        match self
            .database
            .update_recording_status(
                recording.id,
                RecordingStatus::Pending,
                RecordingStatus::Failed,
            )
            .await
        {
            Ok(true) => warn!(
                "Recording {} window elapsed while pending; marked failed",
                recording.id
            ),
            Ok(false) => debug!(
                "Recording {} no longer pending; leaving it alone",
                recording.id
            ),
            Err(e) => error!(
                "Failed to mark elapsed recording {} failed: {}",
                recording.id, e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn recording(date: &str, start_time: &str, duration: i64) -> Recording {
        Recording {
            id: 1,
            channel_id: "5".to_string(),
            date: date.to_string(),
            start_time: start_time.to_string(),
            duration,
            status: RecordingStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_resolve_timezone_fallback() {
        assert_eq!(resolve_timezone("not/a-zone"), Tz::UTC);
        assert_eq!(
            resolve_timezone("America/Los_Angeles"),
            chrono_tz::America::Los_Angeles
        );
    }

    #[test]
    fn test_start_instant_uses_timezone() {
        let r = recording("2026-01-01", "19:00", 30);
        let start = resolve_start_instant(&r, chrono_tz::America::Los_Angeles).unwrap();
        // 19:00 PST is 03:00 UTC the next day
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 1, 2, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_start_instant_rejects_garbage() {
        let r = recording("not-a-date", "19:00", 30);
        assert!(resolve_start_instant(&r, Tz::UTC).is_none());
    }

    #[test]
    fn test_due_window_is_half_open() {
        let r = recording("2026-01-01", "19:00", 30);
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 19, 0, 0).unwrap();

        // Exactly at start: due
        assert_eq!(classify(&r, Tz::UTC, start), Some(StartWindow::Due));
        // 30s late: still due
        assert_eq!(
            classify(&r, Tz::UTC, start + ChronoDuration::seconds(30)),
            Some(StartWindow::Due)
        );
        // Exactly one minute late: no longer due, so the next tick can't
        // match the same recording twice
        assert_eq!(
            classify(&r, Tz::UTC, start + ChronoDuration::minutes(1)),
            Some(StartWindow::Missed)
        );
        // One second early: not yet
        assert_eq!(
            classify(&r, Tz::UTC, start - ChronoDuration::seconds(1)),
            Some(StartWindow::NotYet)
        );
    }

    #[test]
    fn test_elapsed_after_full_window() {
        let r = recording("2026-01-01", "19:00", 30);
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 19, 0, 0).unwrap();

        // At end of window: still just missed, not elapsed
        assert_eq!(
            classify(&r, Tz::UTC, start + ChronoDuration::minutes(30)),
            Some(StartWindow::Missed)
        );
        // Past the window: elapsed
        assert_eq!(
            classify(&r, Tz::UTC, start + ChronoDuration::minutes(31)),
            Some(StartWindow::Elapsed)
        );
    }

    #[test]
    fn test_example_scenario_matches_within_window() {
        // A 19:00 recording observed at 19:00:30 must be due
        let r = recording("2026-01-01", "19:00", 30);
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 19, 0, 30).unwrap();
        assert_eq!(classify(&r, Tz::UTC, now), Some(StartWindow::Due));
    }
}
