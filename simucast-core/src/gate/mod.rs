// File: simucast-core/src/gate/mod.rs

use chrono::{DateTime, Duration, Utc};

use crate::config::GateConfig;

/// Where the viewer stands relative to the scheduled start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Waiting { starts_at: DateTime<Utc> },
    Admitted,
}

/// Outcome of a single gate poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatePoll {
    /// Time until the nominal start, for countdown display.
    Waiting { remaining: Duration },
    /// `first` is true exactly once, on the waiting-to-admitted transition.
    Admitted { first: bool },
}

/// Waiting-room gate for scheduled sessions.
///
/// Sessions without a scheduled start are admitted immediately. Scheduled
/// sessions wait until `start - early_access`, then admit. The joined and
/// left latches fire at most once each regardless of how the session ends.
pub struct SessionGate {
    state: GateState,
    early_access: Duration,
    joined_fired: bool,
    left_fired: bool,
}

impl SessionGate {
    pub fn new(session_start: Option<DateTime<Utc>>, now: DateTime<Utc>, config: &GateConfig) -> Self {
        let early_access = Duration::seconds(i64::from(config.early_access_secs));
        let state = match session_start {
            Some(starts_at) if now < starts_at - early_access => GateState::Waiting { starts_at },
            _ => GateState::Admitted,
        };
        SessionGate {
            state,
            early_access,
            joined_fired: false,
            left_fired: false,
        }
    }

    pub fn poll(&mut self, now: DateTime<Utc>) -> GatePoll {
        match self.state {
            GateState::Admitted => GatePoll::Admitted { first: false },
            GateState::Waiting { starts_at } => {
                if now >= starts_at - self.early_access {
                    self.state = GateState::Admitted;
                    GatePoll::Admitted { first: true }
                } else {
                    GatePoll::Waiting {
                        remaining: starts_at - now,
                    }
                }
            }
        }
    }

    pub fn is_admitted(&self) -> bool {
        self.state == GateState::Admitted
    }

    /// True the first time it is called after admission, then false forever.
    pub fn take_joined(&mut self) -> bool {
        if self.is_admitted() && !self.joined_fired {
            self.joined_fired = true;
            true
        } else {
            false
        }
    }

    /// True the first time it is called after a join was taken, then false.
    pub fn take_left(&mut self) -> bool {
        if self.joined_fired && !self.left_fired {
            self.left_fired = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_early(early_access_secs: u32) -> GateConfig {
        GateConfig {
            early_access_secs,
            ..GateConfig::default()
        }
    }

    #[test]
    fn test_unscheduled_session_is_admitted_immediately() {
        let now = Utc::now();
        let mut gate = SessionGate::new(None, now, &GateConfig::default());
        assert!(gate.is_admitted(), "no scheduled start means no waiting room");
        assert_eq!(gate.poll(now), GatePoll::Admitted { first: false });
        assert!(gate.take_joined(), "first join latch should fire");
        assert!(!gate.take_joined(), "join latch must only fire once");
    }

    #[test]
    fn test_scheduled_session_waits_until_start() {
        let now = Utc::now();
        let starts_at = now + Duration::seconds(90);
        let mut gate = SessionGate::new(Some(starts_at), now, &GateConfig::default());
        assert!(!gate.is_admitted());

        match gate.poll(now + Duration::seconds(30)) {
            GatePoll::Waiting { remaining } => {
                assert_eq!(remaining.num_seconds(), 60);
            }
            other => panic!("expected waiting poll, got {:?}", other),
        }

        assert_eq!(
            gate.poll(now + Duration::seconds(90)),
            GatePoll::Admitted { first: true }
        );
        assert_eq!(
            gate.poll(now + Duration::seconds(91)),
            GatePoll::Admitted { first: false },
            "admission transition only reports first once"
        );
    }

    #[test]
    fn test_early_access_opens_gate_before_start() {
        let now = Utc::now();
        let starts_at = now + Duration::seconds(120);
        let mut gate = SessionGate::new(Some(starts_at), now, &config_with_early(60));

        assert!(matches!(
            gate.poll(now + Duration::seconds(30)),
            GatePoll::Waiting { .. }
        ));
        assert_eq!(
            gate.poll(now + Duration::seconds(60)),
            GatePoll::Admitted { first: true },
            "gate opens early_access seconds before the nominal start"
        );
    }

    #[test]
    fn test_session_already_started_skips_waiting() {
        let now = Utc::now();
        let starts_at = now - Duration::seconds(300);
        let gate = SessionGate::new(Some(starts_at), now, &GateConfig::default());
        assert!(gate.is_admitted(), "late joiners go straight in");
    }

    #[test]
    fn test_left_latch_requires_join_and_fires_once() {
        let now = Utc::now();
        let mut gate = SessionGate::new(Some(now + Duration::seconds(60)), now, &GateConfig::default());

        assert!(!gate.take_left(), "cannot leave before joining");
        gate.poll(now + Duration::seconds(60));
        assert!(gate.take_joined());
        assert!(gate.take_left());
        assert!(!gate.take_left(), "leave latch must only fire once");
    }
}
