//! Sequential unlock rules.
//!
//! Video 0 of a course is always playable. Any later video is playable once
//! the course is purchased or the video right before it is completed.

use std::collections::{BTreeSet, HashMap};

use crate::model::{CourseId, VideoKey, VideoProgress};

pub trait ProgressLookup {
    fn is_completed(&self, course_id: &CourseId, video_index: u32) -> bool;
}

pub trait PurchaseLookup {
    fn is_purchased(&self, course_id: &CourseId) -> bool;
}

#[must_use]
pub fn is_video_unlocked(
    progress: &impl ProgressLookup,
    purchases: &impl PurchaseLookup,
    course_id: &CourseId,
    video_index: u32,
) -> bool {
    match video_index.checked_sub(1) {
        None => true,
        Some(previous) => {
            purchases.is_purchased(course_id) || progress.is_completed(course_id, previous)
        }
    }
}

/// Unlock flag for every video of a course, in index order.
#[must_use]
pub fn unlock_flags(
    progress: &impl ProgressLookup,
    purchases: &impl PurchaseLookup,
    course_id: &CourseId,
    total_videos: u32,
) -> Vec<bool> {
    (0..total_videos)
        .map(|index| is_video_unlocked(progress, purchases, course_id, index))
        .collect()
}

/// Point-in-time copy of stored progress and purchases.
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    records: HashMap<VideoKey, VideoProgress>,
    purchases: BTreeSet<CourseId>,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new(
        records: impl IntoIterator<Item = VideoProgress>,
        purchases: impl IntoIterator<Item = CourseId>,
    ) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.key(), record))
                .collect(),
            purchases: purchases.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn get(&self, course_id: &CourseId, video_index: u32) -> Option<&VideoProgress> {
        self.records
            .get(&VideoKey::new(course_id.clone(), video_index))
    }

    /// Completed records of a course with an index below `total_videos`.
    #[must_use]
    pub fn completed_count(&self, course_id: &CourseId, total_videos: u32) -> u32 {
        let count = self
            .records
            .values()
            .filter(|record| {
                record.course_id() == course_id
                    && record.video_index() < total_videos
                    && record.completed()
            })
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

impl ProgressLookup for ProgressSnapshot {
    fn is_completed(&self, course_id: &CourseId, video_index: u32) -> bool {
        self.get(course_id, video_index)
            .is_some_and(VideoProgress::completed)
    }
}

impl PurchaseLookup for ProgressSnapshot {
    fn is_purchased(&self, course_id: &CourseId) -> bool {
        self.purchases.contains(course_id)
    }
}
