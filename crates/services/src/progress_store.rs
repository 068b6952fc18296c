use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use course_core::model::{CourseCatalog, CourseId, CourseProgress, VideoProgress};
use course_core::unlock::{self, ProgressSnapshot};
use storage::repository::{
    KeyValueStore, PURCHASES_KEY, Storage, StorageError, VIDEO_PROGRESS_KEY,
};

use crate::Clock;

/// Per-video progress and course purchases for one learner on one device.
///
/// Every storage fault is absorbed here: reads fall back to empty data and
/// writes become no-ops, with a `warn` event instead of an error. A write
/// whose read half fails is skipped so the stored blob is never replaced by
/// a partial one. Build one per session and share it behind an `Arc`.
pub struct ProgressStore {
    clock: Clock,
    kv: Arc<dyn KeyValueStore>,
    catalog: Arc<CourseCatalog>,
    available: bool,
    // Serializes read-modify-write cycles on the blobs.
    write_lock: Mutex<()>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(storage: &Storage, catalog: Arc<CourseCatalog>, clock: Clock) -> Self {
        Self {
            clock,
            kv: Arc::clone(&storage.kv),
            catalog,
            available: storage.is_available(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &CourseCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn catalog_handle(&self) -> Arc<CourseCatalog> {
        Arc::clone(&self.catalog)
    }

    /// False when running without persistent storage.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }

    pub async fn get_video_progress(
        &self,
        course_id: &CourseId,
        video_index: u32,
    ) -> Option<VideoProgress> {
        self.load_records()
            .await
            .into_iter()
            .find(|record| record.matches(course_id, video_index))
    }

    /// Records of one course ordered by video index.
    pub async fn list_video_progress(&self, course_id: &CourseId) -> Vec<VideoProgress> {
        let mut records: Vec<_> = self
            .load_records()
            .await
            .into_iter()
            .filter(|record| record.course_id() == course_id)
            .collect();
        records.sort_by_key(VideoProgress::video_index);
        records
    }

    /// Clamps `progress`, stamps `last_watched` and overwrites the record for
    /// `(course_id, video_index)`. Returns the stored record, or `None` when
    /// nothing was persisted.
    pub async fn update_video_progress(
        &self,
        course_id: &CourseId,
        video_index: u32,
        progress: i64,
    ) -> Option<VideoProgress> {
        if !self.available {
            return None;
        }

        let _guard = self.write_lock.lock().await;
        let record = VideoProgress::new(course_id.clone(), video_index, progress, self.clock.now());
        let mut records: Vec<VideoProgress> = self.read_for_write(VIDEO_PROGRESS_KEY).await?;
        match records
            .iter_mut()
            .find(|existing| existing.matches(course_id, video_index))
        {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }

        tracing::debug!(
            course = %course_id,
            video = video_index,
            progress = record.progress(),
            completed = record.completed(),
            "video progress updated"
        );
        self.write_json(VIDEO_PROGRESS_KEY, &records)
            .await
            .then_some(record)
    }

    pub async fn get_course_progress(&self, course_id: &CourseId) -> CourseProgress {
        let snapshot = self.snapshot().await;
        self.course_progress_from(&snapshot, course_id)
    }

    #[must_use]
    pub fn course_progress_from(
        &self,
        snapshot: &ProgressSnapshot,
        course_id: &CourseId,
    ) -> CourseProgress {
        use course_core::unlock::PurchaseLookup;

        let total = self.catalog.total_videos(course_id);
        CourseProgress::compute(
            course_id.clone(),
            snapshot.completed_count(course_id, total),
            total,
            snapshot.is_purchased(course_id),
        )
    }

    pub async fn is_video_unlocked(&self, course_id: &CourseId, video_index: u32) -> bool {
        if video_index == 0 {
            return true;
        }
        let snapshot = self.snapshot().await;
        unlock::is_video_unlocked(&snapshot, &snapshot, course_id, video_index)
    }

    /// Adds the course to the purchase set. Purchasing twice is a no-op.
    pub async fn purchase_course(&self, course_id: &CourseId) {
        if !self.available {
            return;
        }

        let _guard = self.write_lock.lock().await;
        let Some(mut purchases) = self.read_for_write::<Vec<CourseId>>(PURCHASES_KEY).await else {
            return;
        };
        if purchases.contains(course_id) {
            return;
        }
        purchases.push(course_id.clone());
        if self.write_json(PURCHASES_KEY, &purchases).await {
            tracing::info!(course = %course_id, "course purchased");
        }
    }

    pub async fn is_purchased(&self, course_id: &CourseId) -> bool {
        self.load_purchases().await.contains(course_id)
    }

    /// Removes progress for one course, or for every course when `None`.
    /// Purchases are left alone.
    pub async fn reset_progress(&self, course_id: Option<&CourseId>) {
        if !self.available {
            return;
        }

        let _guard = self.write_lock.lock().await;
        match course_id {
            Some(course_id) => {
                let Some(mut records) =
                    self.read_for_write::<Vec<VideoProgress>>(VIDEO_PROGRESS_KEY).await
                else {
                    return;
                };
                let before = records.len();
                records.retain(|record| record.course_id() != course_id);
                if self.write_json(VIDEO_PROGRESS_KEY, &records).await {
                    tracing::info!(
                        course = %course_id,
                        removed = before - records.len(),
                        "course progress reset"
                    );
                }
            }
            None => {
                if self.remove_key(VIDEO_PROGRESS_KEY).await {
                    tracing::info!("all video progress reset");
                }
            }
        }
    }

    pub async fn reset_purchases(&self) {
        if !self.available {
            return;
        }

        let _guard = self.write_lock.lock().await;
        if self.remove_key(PURCHASES_KEY).await {
            tracing::info!("purchases reset");
        }
    }

    /// One consistent read of both blobs for unlock and aggregate decisions.
    pub async fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(self.load_records().await, self.load_purchases().await)
    }

    async fn load_records(&self) -> Vec<VideoProgress> {
        self.read_json(VIDEO_PROGRESS_KEY).await
    }

    async fn load_purchases(&self) -> Vec<CourseId> {
        self.read_json(PURCHASES_KEY).await
    }

    async fn read_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        if !self.available {
            return T::default();
        }

        self.try_read_json(key).await.unwrap_or_else(|err| {
            tracing::warn!(key, error = %err, "storage read failed; using empty value");
            T::default()
        })
    }

    /// Read half of a read-modify-write. A missing or corrupt blob reads as
    /// empty so the write replaces it. `None` on a backend error: the caller
    /// must skip its write.
    async fn read_for_write<T: DeserializeOwned + Default>(&self, key: &str) -> Option<T> {
        match self.try_read_json(key).await {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "storage read failed; write skipped");
                None
            }
        }
    }

    async fn try_read_json<T: DeserializeOwned + Default>(
        &self,
        key: &str,
    ) -> Result<T, StorageError> {
        let Some(raw) = self.kv.get(key).await? else {
            return Ok(T::default());
        };

        Ok(serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::warn!(key, error = %err, "stored value is corrupt; treating as empty");
            T::default()
        }))
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to encode value; write skipped");
                return false;
            }
        };

        match self.kv.set(key, &raw).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(key, error = %err, "storage write failed; write skipped");
                false
            }
        }
    }

    async fn remove_key(&self, key: &str) -> bool {
        match self.kv.remove(key).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(key, error = %err, "storage delete failed");
                false
            }
        }
    }
}
