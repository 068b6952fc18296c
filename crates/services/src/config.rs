use std::time::Duration;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Playback simulation and refresh cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    tick_interval: Duration,
    progress_step: u8,
    poll_interval: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            progress_step: 2,
            poll_interval: Duration::from_secs(3),
        }
    }
}

impl PlaybackConfig {
    /// Time between simulated playback ticks. Zero is raised to 1ms.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(MIN_PERIOD);
        self
    }

    /// Progress points added per tick. Zero is raised to 1.
    #[must_use]
    pub fn with_progress_step(mut self, step: u8) -> Self {
        self.progress_step = step.max(1);
        self
    }

    /// Time between listing refreshes. Zero is raised to 1ms.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_PERIOD);
        self
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    #[must_use]
    pub fn progress_step(&self) -> u8 {
        self.progress_step
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
