//! Foreground session accounting

use chrono::{DateTime, Duration, Utc};

pub trait MetricsSink: Send + Sync {
    /// Time between the first browser resuming and the last one pausing
    fn record_session_duration(&self, duration: Duration);
}

/// Logs metrics through tracing
#[derive(Debug, Default)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn record_session_duration(&self, duration: Duration) {
        tracing::info!(
            duration_ms = duration.num_milliseconds(),
            "Foreground session ended"
        );
    }
}

/// Process-wide count of resumed browsers
#[derive(Debug, Default)]
pub(crate) struct ForegroundSessions {
    count: usize,
    started_at: Option<DateTime<Utc>>,
}

impl ForegroundSessions {
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn resumed(&mut self, now: DateTime<Utc>) {
        self.count += 1;
        if self.count == 1 {
            self.started_at = Some(now);
        }
    }

    /// Returns the session duration when the last browser pauses.
    pub fn paused(&mut self, now: DateTime<Utc>) -> Option<Duration> {
        if self.count == 0 {
            tracing::warn!("Pause without matching resume");
            return None;
        }

        self.count -= 1;
        if self.count > 0 {
            return None;
        }
        self.started_at.take().map(|start| now - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_only_when_back_to_zero() {
        let mut sessions = ForegroundSessions::default();
        let t0 = Utc::now();

        sessions.resumed(t0);
        sessions.resumed(t0 + Duration::seconds(1));
        assert_eq!(sessions.count(), 2);

        assert_eq!(sessions.paused(t0 + Duration::seconds(2)), None);
        assert_eq!(
            sessions.paused(t0 + Duration::seconds(5)),
            Some(Duration::seconds(5))
        );
        assert_eq!(sessions.count(), 0);
    }

    #[test]
    fn test_unmatched_pause_is_ignored() {
        let mut sessions = ForegroundSessions::default();
        assert_eq!(sessions.paused(Utc::now()), None);
        assert_eq!(sessions.count(), 0);
    }
}
