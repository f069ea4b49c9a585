use chrono::{DateTime, Utc};

use crate::models::{find_location, ActiveSession, Location, Session};

/// What a single network sample did to the state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Session closed by this sample, to be persisted by the caller.
    pub ended: Option<Session>,
    /// Session opened by this sample.
    pub started: Option<ActiveSession>,
    pub network_changed: bool,
}

impl Transition {
    pub fn is_noop(&self) -> bool {
        !self.network_changed && self.ended.is_none() && self.started.is_none()
    }
}

/// Current network and the at-most-one session in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    pub current_network: Option<String>,
    pub active_session: Option<ActiveSession>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_location(&self) -> Option<&Location> {
        self.active_session.as_ref().map(|session| &session.location)
    }

    /// Apply one sensor sample.
    ///
    /// An unchanged sample does nothing. Any change ends the running session
    /// first, even when the new network belongs to the same location, then
    /// starts a session for the first location listing the new network.
    pub fn observe(
        &mut self,
        sample: Option<String>,
        locations: &[Location],
        now: DateTime<Utc>,
    ) -> Transition {
        if sample == self.current_network {
            return Transition::default();
        }

        let ended = self.end_session(now);
        self.current_network = sample;

        let started = match self.current_network.as_deref() {
            Some(network) => find_location(locations, network)
                .map(|location| ActiveSession::begin(location.clone(), network.to_string(), now)),
            None => None,
        };
        self.active_session = started.clone();

        Transition {
            ended,
            started,
            network_changed: true,
        }
    }

    /// Finish the running session, if any. Returns `None` when idle.
    pub fn end_session(&mut self, now: DateTime<Utc>) -> Option<Session> {
        self.active_session.take().map(|active| active.finish(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(offset_secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap() + Duration::seconds(offset_secs)
    }

    fn locations() -> Vec<Location> {
        vec![
            Location::new("home", ["A"]),
            Location::new("work", ["B", "C"]),
        ]
    }

    fn sample(name: &str) -> Option<String> {
        Some(name.to_string())
    }

    #[test]
    fn starts_idle_with_no_network() {
        let state = MonitorState::new();
        assert!(state.active_session.is_none());
        assert_eq!(state.current_network, None);
    }

    #[test]
    fn repeated_sample_is_a_noop() {
        let mut state = MonitorState::new();
        let locations = locations();

        let first = state.observe(sample("A"), &locations, t(0));
        let started = first.started.clone().expect("session started");

        let second = state.observe(sample("A"), &locations, t(5));
        assert!(second.is_noop());
        assert_eq!(state.active_session, Some(started));
    }

    #[test]
    fn absence_while_idle_is_a_noop() {
        let mut state = MonitorState::new();
        assert!(state.observe(None, &locations(), t(0)).is_noop());
    }

    #[test]
    fn sample_sequence_produces_expected_sessions() {
        let mut state = MonitorState::new();
        let locations = locations();
        let samples = [
            sample("A"),
            sample("A"),
            sample("X"),
            sample("B"),
            None,
            sample("C"),
        ];

        let mut ended = Vec::new();
        for (i, s) in samples.into_iter().enumerate() {
            let transition = state.observe(s, &locations, t(i as i64 * 60));
            ended.extend(transition.ended);
        }

        assert_eq!(ended.len(), 2);
        assert_eq!(
            (ended[0].location.as_str(), ended[0].network.as_str()),
            ("home", "A")
        );
        assert_eq!((ended[0].start_time, ended[0].end_time), (t(0), t(120)));
        assert_eq!(
            (ended[1].location.as_str(), ended[1].network.as_str()),
            ("work", "B")
        );
        assert_eq!((ended[1].start_time, ended[1].end_time), (t(180), t(240)));

        let active = state.active_session.as_ref().expect("still in a session");
        assert_eq!(active.location.name, "work");
        assert_eq!(active.network, "C");
        assert_eq!(active.start_time, t(300));
    }

    #[test]
    fn unknown_network_ends_session_without_starting_one() {
        let mut state = MonitorState::new();
        let locations = locations();
        state.observe(sample("A"), &locations, t(0));

        let transition = state.observe(sample("X"), &locations, t(30));

        assert!(transition.ended.is_some());
        assert!(transition.started.is_none());
        assert!(state.active_session.is_none());
        assert_eq!(state.current_network.as_deref(), Some("X"));
    }

    #[test]
    fn switching_between_networks_of_one_location_restarts_session() {
        let mut state = MonitorState::new();
        let locations = locations();
        let first = state.observe(sample("B"), &locations, t(0)).started.unwrap();

        let transition = state.observe(sample("C"), &locations, t(90));

        let ended = transition.ended.expect("B session ended");
        assert_eq!(ended.id, first.id);
        assert_eq!(ended.duration_secs, 90);
        let started = transition.started.expect("C session started");
        assert_eq!(started.location.name, "work");
        assert_ne!(started.id, first.id);
    }

    #[test]
    fn never_more_than_one_active_session() {
        let mut state = MonitorState::new();
        let locations = locations();
        let pattern = [sample("A"), sample("B"), None, sample("C"), sample("X"), sample("A")];

        let mut open = 0i32;
        for (i, s) in pattern.iter().cycle().take(60).enumerate() {
            let transition = state.observe(s.clone(), &locations, t(i as i64));
            open -= transition.ended.is_some() as i32;
            open += transition.started.is_some() as i32;
            assert!((0..=1).contains(&open));
            assert_eq!(open == 1, state.active_session.is_some());
        }
    }

    #[test]
    fn end_session_when_idle_returns_none() {
        let mut state = MonitorState::new();
        assert_eq!(state.end_session(t(0)), None);
    }

    #[test]
    fn manual_end_keeps_network_and_goes_idle() {
        let mut state = MonitorState::new();
        let locations = locations();
        state.observe(sample("A"), &locations, t(0));

        let session = state.end_session(t(125)).expect("ended");

        assert_eq!(session.duration_secs, 125);
        assert_eq!(session.productivity, 62);
        assert!(state.active_session.is_none());
        assert_eq!(state.current_network.as_deref(), Some("A"));
        // Still on the same network, so nothing restarts until it changes.
        assert!(state.observe(sample("A"), &locations, t(130)).is_noop());
    }
}
