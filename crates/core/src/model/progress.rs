use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, VideoKey};

/// Progress at or above this value marks a video as completed.
pub const COMPLETION_THRESHOLD: u8 = 90;

pub const MAX_PROGRESS: u8 = 100;

/// Watch progress for a single video of a course.
///
/// `completed` is always derived from `progress`; there is no way to build a
/// record where the two disagree, including when loading persisted JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "PersistedVideoProgress")]
pub struct VideoProgress {
    course_id: CourseId,
    video_index: u32,
    progress: u8,
    completed: bool,
    last_watched: DateTime<Utc>,
}

impl VideoProgress {
    /// Builds a record, clamping `progress` into `0..=100`.
    #[must_use]
    pub fn new(
        course_id: CourseId,
        video_index: u32,
        progress: i64,
        last_watched: DateTime<Utc>,
    ) -> Self {
        let progress = clamp_progress(progress);
        Self {
            course_id,
            video_index,
            progress,
            completed: is_completed(progress),
            last_watched,
        }
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn video_index(&self) -> u32 {
        self.video_index
    }

    #[must_use]
    pub fn key(&self) -> VideoKey {
        VideoKey::new(self.course_id.clone(), self.video_index)
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn last_watched(&self) -> DateTime<Utc> {
        self.last_watched
    }

    #[must_use]
    pub fn matches(&self, course_id: &CourseId, video_index: u32) -> bool {
        self.video_index == video_index && &self.course_id == course_id
    }
}

#[must_use]
pub fn clamp_progress(raw: i64) -> u8 {
    // Clamped into 0..=100 first, so the cast is lossless.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = raw.clamp(0, i64::from(MAX_PROGRESS)) as u8;
    value
}

#[must_use]
pub fn is_completed(progress: u8) -> bool {
    progress >= COMPLETION_THRESHOLD
}

// Persisted `completed` flags are ignored and recomputed.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedVideoProgress {
    course_id: CourseId,
    video_index: u32,
    progress: i64,
    last_watched: DateTime<Utc>,
}

impl From<PersistedVideoProgress> for VideoProgress {
    fn from(raw: PersistedVideoProgress) -> Self {
        Self::new(raw.course_id, raw.video_index, raw.progress, raw.last_watched)
    }
}

/// Aggregate progress of one course. Derived on every read, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub course_id: CourseId,
    pub videos_completed: u32,
    pub total_videos: u32,
    pub overall_progress: u8,
    pub purchased: bool,
}

impl CourseProgress {
    /// Computes the aggregate, rounding the percentage to the nearest integer
    /// (half rounds up). A course without videos reports 0%.
    #[must_use]
    pub fn compute(
        course_id: CourseId,
        videos_completed: u32,
        total_videos: u32,
        purchased: bool,
    ) -> Self {
        let overall_progress = if total_videos == 0 {
            0
        } else {
            let done = u64::from(videos_completed.min(total_videos));
            let total = u64::from(total_videos);
            let rounded = (done * 200 + total) / (total * 2);
            u8::try_from(rounded).unwrap_or(MAX_PROGRESS)
        };

        Self {
            course_id,
            videos_completed,
            total_videos,
            overall_progress,
            purchased,
        }
    }

    /// Default for a course we know nothing about.
    #[must_use]
    pub fn empty(course_id: CourseId) -> Self {
        Self::compute(course_id, 0, 0, false)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.total_videos > 0 && self.videos_completed >= self.total_videos
    }
}
