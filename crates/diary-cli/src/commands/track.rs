//! Track command: the tracker's event loop.
//!
//! Reads host signals as JSON lines and feeds them to the [`Tracker`] one at a
//! time. Signals carrying an `at` stamp are timed by that stamp, which makes a
//! recorded session replayable; unstamped signals use the wall clock, and the
//! idle timer then runs on the wall clock as well.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use diary_core::{HostEvent, Store, Tracker};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Counts from one tracking session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackStats {
    pub signals: usize,
    pub skipped: usize,
}

/// Which clock times the session.
#[derive(Debug, Clone, Copy)]
enum Clock {
    Wall,
    /// Timestamp of the last stamped signal.
    Stamped(i64),
}

impl Clock {
    fn now(self) -> i64 {
        match self {
            Self::Wall => wall_now_ms(),
            Self::Stamped(at) => at,
        }
    }
}

fn wall_now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Sleeps until the wall clock reaches `deadline`, or forever without one.
async fn idle_timer(deadline: Option<i64>) {
    match deadline {
        Some(deadline) => {
            let delay = u64::try_from(deadline - wall_now_ms()).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        None => std::future::pending().await,
    }
}

/// Runs the event loop until `reader` is exhausted or `shutdown` resolves,
/// then closes the open interval.
pub async fn run<R, S, F>(reader: R, tracker: &mut Tracker<S>, shutdown: F) -> Result<TrackStats>
where
    R: AsyncBufRead + Unpin,
    S: Store,
    F: Future<Output = ()>,
{
    let mut lines = reader.lines();
    let mut clock = Clock::Wall;
    let mut stats = TrackStats::default();
    tokio::pin!(shutdown);

    loop {
        // A stamped session fires its timer when the next stamp passes it.
        let deadline = match clock {
            Clock::Wall => tracker.idle_deadline(),
            Clock::Stamped(_) => None,
        };

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read signal")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let event: HostEvent = match serde_json::from_str(line) {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, line, "skipping malformed signal");
                        stats.skipped += 1;
                        continue;
                    }
                };
                clock = event.at.map_or(Clock::Wall, Clock::Stamped);
                tracker
                    .handle(&event, clock.now())
                    .context("failed to record signal")?;
                stats.signals += 1;
            }
            () = idle_timer(deadline) => {
                tracker
                    .advance(wall_now_ms())
                    .context("failed to record idle timeout")?;
            }
            () = &mut shutdown => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    tracker
        .shutdown(clock.now())
        .context("failed to close the open interval")?;
    tracing::info!(
        signals = stats.signals,
        skipped = stats.skipped,
        "tracking session ended"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diary_core::{Category, ClassifierConfig, MemoryStore};

    const SESSION: &str = r#"
{"at":0,"type":"focus","focused":true}
{"at":1000,"type":"text_edit","language":"rust","workspace":"api","changes":[{"line":2,"text":"// retry once","inserted_non_blank":true}]}
this is not a signal
{"at":30000,"type":"debug_start"}
{"at":40000,"type":"debug_stderr","message":"thread 'main' panicked"}
{"at":45000,"type":"debug_end"}
{"at":46000,"type":"git_commit"}
{"at":50000,"type":"focus","focused":false}
"#;

    fn tracker() -> Tracker<MemoryStore> {
        Tracker::open(MemoryStore::new(), ClassifierConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn stamped_session_replays_deterministically() {
        let mut tracker = tracker();
        let stats = run(SESSION.as_bytes(), &mut tracker, std::future::pending())
            .await
            .unwrap();
        assert_eq!(stats, TrackStats { signals: 7, skipped: 1 });

        let entries: Vec<_> = tracker
            .entries()
            .unwrap()
            .into_iter()
            .map(|i| (i.category, i.start, i.end))
            .collect();
        assert_eq!(
            entries,
            vec![
                (Category::Thinking, 0, 1_000),
                (Category::Writing, 1_000, 12_000),
                (Category::Thinking, 12_000, 30_000),
                (Category::Debugging, 30_000, 45_000),
                (Category::Thinking, 45_000, 50_000),
            ]
        );

        let errors = tracker.errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].timestamp, 40_000);
        assert_eq!(errors[0].workspace, "api");
        assert_eq!(tracker.commit_count(), 1);
        assert_eq!(tracker.comment_line_count(), 1);
    }

    #[tokio::test]
    async fn end_of_input_closes_at_last_stamp() {
        let input = concat!(
            r#"{"at":5000,"type":"focus","focused":true}"#,
            "\n",
            r#"{"at":8000,"type":"text_edit","workspace":"web"}"#,
            "\n",
        );
        let mut tracker = tracker();
        run(input.as_bytes(), &mut tracker, std::future::pending())
            .await
            .unwrap();

        // The writing interval opened by the last edit has no length yet.
        let entries: Vec<_> = tracker
            .entries()
            .unwrap()
            .into_iter()
            .map(|i| (i.category, i.start, i.end))
            .collect();
        assert_eq!(entries, vec![(Category::Thinking, 5_000, 8_000)]);
        assert_eq!(tracker.classifier_state().current_start, None);
    }

    #[tokio::test]
    async fn shutdown_future_stops_the_loop() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut tracker = tracker();
        let stats = run(
            tokio::io::BufReader::new(reader),
            &mut tracker,
            std::future::ready(()),
        )
        .await
        .unwrap();
        assert_eq!(stats, TrackStats::default());
        assert!(tracker.entries().unwrap().is_empty());
    }
}
