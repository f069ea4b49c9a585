use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Location;

const PRODUCTIVITY_BASE: u64 = 60;
const PRODUCTIVITY_CYCLE: u64 = 40;
const PRODUCTIVITY_MIN: u64 = 30;
const PRODUCTIVITY_MAX: u64 = 95;

/// Placeholder productivity score derived only from session length.
///
/// `clamp(60 + (minutes % 40), 30, 95)` with integer minutes. This is not a
/// real measurement; clients rely on the exact values.
pub fn productivity_score(duration_secs: u64) -> u8 {
    let raw = PRODUCTIVITY_BASE + (duration_secs / 60) % PRODUCTIVITY_CYCLE;
    raw.clamp(PRODUCTIVITY_MIN, PRODUCTIVITY_MAX) as u8
}

/// A completed stay at a location. Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub location: String,
    pub network: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_secs: u64,
    pub productivity: u8,
}

/// The session currently in progress. End time, duration and score are only
/// known once it is finished.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub id: String,
    pub location: Location,
    pub network: String,
    pub start_time: DateTime<Utc>,
}

impl ActiveSession {
    pub fn begin(location: Location, network: String, start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            location,
            network,
            start_time,
        }
    }

    /// Seconds elapsed up to `now`, clamped at zero if the wall clock went
    /// backwards.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.start_time).num_seconds().max(0) as u64
    }

    pub fn finish(self, end_time: DateTime<Utc>) -> Session {
        let duration_secs = self.elapsed_secs(end_time);
        Session {
            id: self.id,
            location: self.location.name,
            network: self.network,
            start_time: self.start_time,
            end_time,
            duration_secs,
            productivity: productivity_score(duration_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn location() -> Location {
        Location::new("home", ["A"])
    }

    #[test]
    fn productivity_matches_reference_values() {
        assert_eq!(productivity_score(0), 60);
        assert_eq!(productivity_score(59), 60);
        assert_eq!(productivity_score(125), 62);
        assert_eq!(productivity_score(3600), 80);
    }

    #[test]
    fn productivity_is_capped_at_ninety_five() {
        // 39 minutes -> 60 + 39 = 99 before clamping
        assert_eq!(productivity_score(39 * 60), 95);
        assert_eq!(productivity_score(35 * 60), 95);
        assert_eq!(productivity_score(34 * 60), 94);
        // wraps every 40 minutes
        assert_eq!(productivity_score(40 * 60), 60);
    }

    #[test]
    fn productivity_stays_in_range_for_many_durations() {
        for secs in (0..200_000).step_by(17) {
            let score = productivity_score(secs);
            assert!((30..=95).contains(&score), "{secs}s scored {score}");
        }
    }

    #[test]
    fn finish_computes_duration_and_score() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let active = ActiveSession::begin(location(), "A".into(), start);
        let id = active.id.clone();

        let session = active.finish(start + Duration::seconds(125));

        assert_eq!(session.id, id);
        assert_eq!(session.location, "home");
        assert_eq!(session.network, "A");
        assert_eq!(session.duration_secs, 125);
        assert_eq!(session.productivity, 62);
    }

    #[test]
    fn finish_clamps_negative_duration() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let active = ActiveSession::begin(location(), "A".into(), start);

        let session = active.finish(start - Duration::seconds(30));

        assert_eq!(session.duration_secs, 0);
        assert_eq!(session.productivity, 60);
    }
}
