// File: simucast-core/src/config.rs

/// Tunables for one viewer session. Defaults match the production
/// behavior; tests shrink the intervals to keep runs fast.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub playback: PlaybackConfig,
    pub scheduler: SchedulerConfig,
    pub heartbeat: HeartbeatConfig,
    pub results: ResultsConfig,
    pub feed: FeedConfig,
    pub gate: GateConfig,
}

#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Slack allowed on backward seeks before the policy snaps back.
    pub seek_tolerance_secs: f64,
    /// Recovery attempts per error class before surfacing a fatal error.
    pub max_recovery_attempts: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            seek_tolerance_secs: 1.0,
            max_recovery_attempts: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Active-window length for definitions that do not carry their own.
    pub default_duration_secs: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig { default_duration_secs: 30 }
    }
}

#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Baseline spacing between progress reports, in playback seconds.
    pub base_interval_secs: f64,
    /// Upper bound of the random jitter added on top of the baseline.
    pub jitter_max_secs: f64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        HeartbeatConfig {
            base_interval_secs: 10.0,
            jitter_max_secs: 5.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultsConfig {
    /// Refetch cadence for shared poll/quiz tallies, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        ResultsConfig { poll_interval_ms: 5_000 }
    }
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// How many recent live messages to backfill on channel connect.
    pub history_backlog: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig { history_backlog: 50 }
    }
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Seconds before the nominal start at which waiting viewers get in.
    pub early_access_secs: u32,
    /// Cadence of waiting-room countdown updates, in milliseconds.
    pub countdown_tick_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            early_access_secs: 0,
            countdown_tick_ms: 1_000,
        }
    }
}
