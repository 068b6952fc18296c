//! Player state machine, free of timers and storage.
//!
//! The async driver in `services` owns the tick timer and forwards the values
//! returned by [`PlayerMachine::tick`] to the progress store.

use crate::model::{MAX_PROGRESS, VideoKey, is_completed};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerState {
    Locked,
    Loading,
    Playing { progress: u8 },
    Error { message: String },
}

impl PlayerState {
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, PlayerState::Locked)
    }

    #[must_use]
    pub fn progress(&self) -> Option<u8> {
        match self {
            PlayerState::Playing { progress } => Some(*progress),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlayerMachine {
    video: VideoKey,
    state: PlayerState,
    step: u8,
    generation: u64,
}

impl PlayerMachine {
    /// Starts `Locked` or `Loading` depending on `unlocked`.
    /// A zero `step` is raised to 1 so playback always reaches completion.
    #[must_use]
    pub fn new(video: VideoKey, unlocked: bool, step: u8) -> Self {
        Self {
            video,
            state: initial_state(unlocked),
            step: step.max(1),
            generation: 0,
        }
    }

    #[must_use]
    pub fn video(&self) -> &VideoKey {
        &self.video
    }

    #[must_use]
    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    /// Bumped on every video change; tick tasks compare it to detect that
    /// they were superseded.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `Loading -> Playing`, resuming from previously stored progress.
    /// Returns false when the event does not apply to the current state.
    pub fn media_ready(&mut self, resume_from: u8) -> bool {
        if self.state != PlayerState::Loading {
            return false;
        }
        self.state = PlayerState::Playing {
            progress: resume_from.min(MAX_PROGRESS),
        };
        true
    }

    /// `Loading -> Error`. No retry; changing video re-evaluates.
    pub fn media_failed(&mut self, message: impl Into<String>) -> bool {
        if self.state != PlayerState::Loading {
            return false;
        }
        self.state = PlayerState::Error {
            message: message.into(),
        };
        true
    }

    /// Whether the tick timer should keep running.
    #[must_use]
    pub fn wants_ticks(&self) -> bool {
        matches!(self.state, PlayerState::Playing { progress } if !is_completed(progress))
    }

    /// Advances playback by one step and returns the value to persist.
    /// Returns `None` outside `Playing` or once the video is completed.
    pub fn tick(&mut self) -> Option<u8> {
        if !self.wants_ticks() {
            return None;
        }
        let PlayerState::Playing { progress } = &mut self.state else {
            return None;
        };
        *progress = progress.saturating_add(self.step).min(MAX_PROGRESS);
        Some(*progress)
    }

    /// Switches to another video. Any state goes to `Locked` when the new
    /// target is locked, otherwise to `Loading`.
    pub fn change_video(&mut self, video: VideoKey, unlocked: bool) {
        self.video = video;
        self.state = initial_state(unlocked);
        self.generation = self.generation.wrapping_add(1);
    }

    /// Invalidates outstanding tick tasks without changing the state.
    pub fn retire(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Re-checks a locked player after the unlock affordance was used.
    pub fn reevaluate(&mut self, unlocked: bool) -> bool {
        if self.state.is_locked() && unlocked {
            self.state = PlayerState::Loading;
            return true;
        }
        false
    }
}

fn initial_state(unlocked: bool) -> PlayerState {
    if unlocked {
        PlayerState::Loading
    } else {
        PlayerState::Locked
    }
}
