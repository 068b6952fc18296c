use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use course_core::model::{CourseId, CourseProgress, CourseVideo};
use course_core::unlock::{self, ProgressSnapshot};

use crate::progress_store::ProgressStore;

/// One catalog video with the learner's state for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoListing {
    pub index: u32,
    pub video: CourseVideo,
    pub unlocked: bool,
    pub progress: u8,
    pub completed: bool,
}

/// Everything the course page shows, read from a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseListing {
    pub course_id: CourseId,
    pub title: String,
    pub videos: Vec<VideoListing>,
    pub progress: CourseProgress,
}

impl CourseListing {
    #[must_use]
    pub fn locked_count(&self) -> usize {
        self.videos.iter().filter(|video| !video.unlocked).count()
    }
}

#[derive(Clone)]
pub struct CourseListingService {
    store: Arc<ProgressStore>,
}

impl CourseListingService {
    #[must_use]
    pub fn new(store: Arc<ProgressStore>) -> Self {
        Self { store }
    }

    /// Listing for a catalog course; `None` if the course is unknown.
    pub async fn listing(&self, course_id: &CourseId) -> Option<CourseListing> {
        let snapshot = self.store.snapshot().await;
        self.build(&snapshot, course_id)
    }

    /// Listings for every catalog course, in catalog order.
    pub async fn overview(&self) -> Vec<CourseListing> {
        let snapshot = self.store.snapshot().await;
        self.store
            .catalog()
            .courses()
            .iter()
            .filter_map(|entry| self.build(&snapshot, &entry.id))
            .collect()
    }

    /// Purchases the course and re-reads its listing right away so the
    /// unlock shows without waiting for the next poll.
    pub async fn purchase(&self, course_id: &CourseId) -> Option<CourseListing> {
        self.store.purchase_course(course_id).await;
        self.listing(course_id).await
    }

    /// Starts re-reading the listing every `interval` until the poller is
    /// dropped or stopped.
    #[must_use]
    pub fn poll(&self, course_id: CourseId, interval: Duration) -> ProgressPoller {
        let (tx, rx) = watch::channel(None);
        let service = self.clone();
        let interval = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now(), interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let listing = service.listing(&course_id).await;
                tracing::trace!(course = %course_id, "listing polled");
                if tx.send(listing).is_err() {
                    break;
                }
            }
        });

        ProgressPoller { rx, handle }
    }

    fn build(&self, snapshot: &ProgressSnapshot, course_id: &CourseId) -> Option<CourseListing> {
        let entry = self.store.catalog().course(course_id)?;
        let total = self.store.catalog().total_videos(course_id);
        let flags = unlock::unlock_flags(snapshot, snapshot, course_id, total);

        let videos = entry
            .videos
            .iter()
            .zip(flags)
            .zip(0_u32..)
            .map(|((video, unlocked), index)| {
                let record = snapshot.get(course_id, index);
                VideoListing {
                    index,
                    video: video.clone(),
                    unlocked,
                    progress: record.map_or(0, |r| r.progress()),
                    completed: record.is_some_and(|r| r.completed()),
                }
            })
            .collect();

        Some(CourseListing {
            course_id: course_id.clone(),
            title: entry.title.clone(),
            videos,
            progress: self.store.course_progress_from(snapshot, course_id),
        })
    }
}

/// Periodic listing refresh. Dropping it cancels the refresh task.
pub struct ProgressPoller {
    rx: watch::Receiver<Option<CourseListing>>,
    handle: JoinHandle<()>,
}

impl ProgressPoller {
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<CourseListing>> {
        self.rx.clone()
    }

    #[must_use]
    pub fn latest(&self) -> Option<CourseListing> {
        self.rx.borrow().clone()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use course_core::model::CourseCatalog;
    use course_core::time::fixed_clock;
    use storage::repository::Storage;

    use super::*;

    fn service() -> (Arc<ProgressStore>, CourseListingService) {
        let store = Arc::new(ProgressStore::new(
            &Storage::in_memory(),
            Arc::new(CourseCatalog::demo()),
            fixed_clock(),
        ));
        (Arc::clone(&store), CourseListingService::new(store))
    }

    fn id(raw: &str) -> CourseId {
        CourseId::new(raw).unwrap()
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn fresh_listing_unlocks_only_first_video() {
        let (_, service) = service();
        let listing = service.listing(&id("shopify-starter")).await.unwrap();

        let flags: Vec<_> = listing.videos.iter().map(|v| v.unlocked).collect();
        assert_eq!(flags, vec![true, false, false]);
        assert_eq!(listing.locked_count(), 2);
        assert_eq!(listing.progress.overall_progress, 0);
        assert_eq!(listing.title, "Shopify Starter");
    }

    #[tokio::test]
    async fn listing_reflects_completion() {
        let (store, service) = service();
        let course = id("shopify-starter");
        store.update_video_progress(&course, 0, 92).await;
        store.update_video_progress(&course, 1, 30).await;

        let listing = service.listing(&course).await.unwrap();
        assert!(listing.videos[0].completed);
        assert!(listing.videos[1].unlocked);
        assert_eq!(listing.videos[1].progress, 30);
        assert!(!listing.videos[2].unlocked);
        assert_eq!(listing.progress.overall_progress, 33);
    }

    #[tokio::test]
    async fn purchase_returns_refreshed_listing() {
        let (_, service) = service();
        let listing = service.purchase(&id("tiktok-ads-mini")).await.unwrap();
        assert!(listing.progress.purchased);
        assert_eq!(listing.locked_count(), 0);
    }

    #[tokio::test]
    async fn unknown_course_has_no_listing() {
        let (_, service) = service();
        assert!(service.listing(&id("missing")).await.is_none());
        assert!(service.purchase(&id("missing")).await.is_none());
    }

    #[tokio::test]
    async fn overview_follows_catalog_order() {
        let (_, service) = service();
        let ids: Vec<_> = service
            .overview()
            .await
            .into_iter()
            .map(|listing| listing.course_id.to_string())
            .collect();
        assert_eq!(ids, vec!["shopify-starter", "tiktok-ads-mini", "dropshipping-basics"]);
    }

    #[tokio::test(start_paused = true)]
    async fn poller_picks_up_new_progress() {
        let (store, service) = service();
        let course = id("shopify-starter");
        let poller = service.poll(course.clone(), Duration::from_secs(3));
        settle().await;
        assert_eq!(poller.latest().unwrap().progress.videos_completed, 0);

        store.update_video_progress(&course, 0, 95).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(poller.latest().unwrap().progress.videos_completed, 0);

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        let latest = poller.latest().unwrap();
        assert_eq!(latest.progress.videos_completed, 1);
        assert!(latest.videos[1].unlocked);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_poller_keeps_last_value() {
        let (store, service) = service();
        let course = id("shopify-starter");
        let poller = service.poll(course.clone(), Duration::from_secs(3));
        settle().await;
        poller.stop();

        store.update_video_progress(&course, 0, 95).await;
        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(poller.latest().unwrap().progress.videos_completed, 0);
    }
}
