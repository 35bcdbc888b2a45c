// File: simucast-core/src/report/heartbeat.rs
//
// Decides when to send a watch-progress heartbeat. Reports are spaced a
// base interval plus a random jitter apart (in playback seconds), and the
// jitter is redrawn after every report, so a webinar full of viewers does
// not hammer the progress endpoint in lockstep.

use rand::Rng;

use crate::config::HeartbeatConfig;

/// Source of jitter values. Production uses `RandomJitter`; tests pin the
/// sequence.
pub trait JitterDraw: Send {
    /// A value in `[0, max)`.
    fn draw(&mut self, max: f64) -> f64;
}

pub struct RandomJitter;

impl JitterDraw for RandomJitter {
    fn draw(&mut self, max: f64) -> f64 {
        if max <= 0.0 {
            return 0.0;
        }
        rand::rng().random_range(0.0..max)
    }
}

pub struct HeartbeatReporter {
    base_interval: f64,
    jitter_max: f64,
    jitter: f64,
    last_reported: f64,
    source: Box<dyn JitterDraw>,
}

impl HeartbeatReporter {
    pub fn new(config: &HeartbeatConfig, start_position: f64) -> Self {
        Self::with_jitter(config, start_position, Box::new(RandomJitter))
    }

    pub fn with_jitter(
        config: &HeartbeatConfig,
        start_position: f64,
        mut source: Box<dyn JitterDraw>,
    ) -> Self {
        let jitter = source.draw(config.jitter_max_secs);
        HeartbeatReporter {
            base_interval: config.base_interval_secs,
            jitter_max: config.jitter_max_secs,
            jitter,
            last_reported: start_position,
            source,
        }
    }

    /// Feeds a playback position; true means "send a heartbeat now".
    /// Distance is absolute, so a replay seek far backwards also reports.
    pub fn offer(&mut self, position: f64) -> bool {
        if (position - self.last_reported).abs() >= self.base_interval + self.jitter {
            self.last_reported = position;
            self.jitter = self.source.draw(self.jitter_max);
            return true;
        }
        false
    }

    pub fn last_reported(&self) -> f64 {
        self.last_reported
    }

    /// Distance the playhead must cover before the next report.
    pub fn current_threshold(&self) -> f64 {
        self.base_interval + self.jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedJitter {
        values: Vec<f64>,
        next: usize,
    }

    impl FixedJitter {
        fn new(values: Vec<f64>) -> Box<Self> {
            Box::new(FixedJitter { values, next: 0 })
        }
    }

    impl JitterDraw for FixedJitter {
        fn draw(&mut self, _max: f64) -> f64 {
            let v = self.values[self.next % self.values.len()];
            self.next += 1;
            v
        }
    }

    fn config() -> HeartbeatConfig {
        HeartbeatConfig { base_interval_secs: 10.0, jitter_max_secs: 5.0 }
    }

    #[test]
    fn test_reports_fire_at_base_plus_jitter() {
        let mut hb = HeartbeatReporter::with_jitter(&config(), 0.0, FixedJitter::new(vec![2.0]));

        assert!(!hb.offer(11.9), "below the 12s threshold");
        assert!(hb.offer(12.0));
        assert_eq!(hb.last_reported(), 12.0);
    }

    #[test]
    fn test_jitter_redrawn_after_each_report() {
        let mut hb =
            HeartbeatReporter::with_jitter(&config(), 0.0, FixedJitter::new(vec![2.0, 4.0]));

        assert!(hb.offer(12.0), "first threshold is 12s");
        assert!(!hb.offer(25.9), "second threshold is 14s past the last report");
        assert!(hb.offer(26.0));
    }

    #[test]
    fn test_spacing_stays_within_jitter_band() {
        let draws = vec![0.0, 4.9, 1.3, 3.7, 2.2];
        let mut hb =
            HeartbeatReporter::with_jitter(&config(), 0.0, FixedJitter::new(draws));

        let mut report_positions = vec![0.0];
        let mut pos = 0.0;
        while pos < 300.0 {
            pos += 0.25;
            if hb.offer(pos) {
                report_positions.push(pos);
            }
        }

        for pair in report_positions.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(
                (10.0..15.25).contains(&gap),
                "consecutive reports {}s apart, outside the jitter band",
                gap
            );
        }
        assert!(report_positions.len() > 10, "sanity: the walk produced reports");
    }

    #[test]
    fn test_backward_jump_counts_as_distance() {
        let mut hb =
            HeartbeatReporter::with_jitter(&config(), 100.0, FixedJitter::new(vec![0.0]));

        assert!(!hb.offer(95.0));
        assert!(hb.offer(88.0), "a 12s backward seek is reportable movement");
        assert_eq!(hb.last_reported(), 88.0);
    }

    #[test]
    fn test_starts_from_start_position() {
        let mut hb =
            HeartbeatReporter::with_jitter(&config(), 300.0, FixedJitter::new(vec![1.0]));

        assert!(!hb.offer(305.0), "measured from the session start position");
        assert!(hb.offer(311.0));
    }

    #[test]
    fn test_random_jitter_stays_in_range() {
        let mut source = RandomJitter;
        for _ in 0..200 {
            let v = source.draw(5.0);
            assert!((0.0..5.0).contains(&v));
        }
        assert_eq!(source.draw(0.0), 0.0);
    }
}
