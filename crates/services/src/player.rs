use std::sync::{Arc, PoisonError};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use course_core::model::VideoKey;
use course_core::player::{PlayerMachine, PlayerState};

use crate::config::PlaybackConfig;
use crate::progress_store::ProgressStore;

/// Drives a [`PlayerMachine`] for one on-screen player.
///
/// While `Playing`, a single tick task advances progress on the configured
/// cadence and writes each value to the store. Navigating, closing or dropping
/// the adapter cancels that task.
///
/// Only `navigate` and `close` wait for a write the task has already started.
/// After `stop` or a drop that write may still land; owners that need a hard
/// cut-off call `close` before letting go.
pub struct PlayerAdapter {
    store: Arc<ProgressStore>,
    config: PlaybackConfig,
    machine: Arc<Mutex<PlayerMachine>>,
    state_tx: Arc<watch::Sender<PlayerState>>,
    ticker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl PlayerAdapter {
    /// Evaluates the unlock policy for `video` and starts in `Locked` or
    /// `Loading`.
    pub async fn open(store: Arc<ProgressStore>, config: PlaybackConfig, video: VideoKey) -> Self {
        let unlocked = store
            .is_video_unlocked(&video.course_id, video.video_index)
            .await;
        let machine = PlayerMachine::new(video, unlocked, config.progress_step());
        let (state_tx, _) = watch::channel(machine.state().clone());
        tracing::debug!(video = %machine.video(), state = ?machine.state(), "player opened");

        Self {
            store,
            config,
            machine: Arc::new(Mutex::new(machine)),
            state_tx: Arc::new(state_tx),
            ticker: std::sync::Mutex::new(None),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.state_tx.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> PlayerState {
        self.state_tx.borrow().clone()
    }

    /// Media-ready signal from the embedded player. Resumes from stored
    /// progress and starts ticking.
    pub async fn media_ready(&self) {
        let mut machine = self.machine.lock().await;
        let video = machine.video().clone();
        let resume_from = self
            .store
            .get_video_progress(&video.course_id, video.video_index)
            .await
            .map_or(0, |record| record.progress());

        if !machine.media_ready(resume_from) {
            return;
        }
        self.publish(&machine);
        if machine.wants_ticks() {
            self.spawn_ticker(machine.generation());
        }
    }

    /// Media-load failure signal. Not retried.
    pub async fn media_failed(&self, message: impl Into<String>) {
        let mut machine = self.machine.lock().await;
        if machine.media_failed(message) {
            tracing::warn!(video = %machine.video(), state = ?machine.state(), "media failed to load");
            self.publish(&machine);
        }
    }

    /// Switches to another video, cancelling the current tick task first.
    /// No progress is written for the previous video once this returns.
    pub async fn navigate(&self, video: VideoKey) {
        self.cancel_ticker();
        let mut machine = self.machine.lock().await;
        let unlocked = self
            .store
            .is_video_unlocked(&video.course_id, video.video_index)
            .await;
        machine.change_video(video, unlocked);
        self.publish(&machine);
    }

    /// Unlock affordance: purchases the course and re-evaluates.
    pub async fn unlock(&self) {
        let mut machine = self.machine.lock().await;
        let video = machine.video().clone();
        self.store.purchase_course(&video.course_id).await;
        let unlocked = self
            .store
            .is_video_unlocked(&video.course_id, video.video_index)
            .await;
        if machine.reevaluate(unlocked) {
            self.publish(&machine);
        }
    }

    /// Cancels the tick task without waiting. A write already inside the
    /// store may still complete; use [`PlayerAdapter::close`] when that
    /// matters.
    pub fn stop(&self) {
        self.cancel_ticker();
    }

    /// Cancels the tick task and waits for any in-flight write to settle.
    pub async fn close(&self) {
        self.cancel_ticker();
        // Retires a tick task that already woke up but has not reached the
        // lock yet.
        self.machine.lock().await.retire();
    }

    /// Whether a tick task is currently scheduled.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn publish(&self, machine: &PlayerMachine) {
        tracing::debug!(video = %machine.video(), state = ?machine.state(), "player state");
        self.state_tx.send_replace(machine.state().clone());
    }

    fn spawn_ticker(&self, generation: u64) {
        self.cancel_ticker();

        let machine = Arc::clone(&self.machine);
        let store = Arc::clone(&self.store);
        let state_tx = Arc::clone(&self.state_tx);
        let period = self.config.tick_interval();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut machine = machine.lock().await;
                if machine.generation() != generation {
                    break;
                }
                let Some(progress) = machine.tick() else {
                    break;
                };
                let video = machine.video().clone();
                state_tx.send_replace(machine.state().clone());
                // Written under the machine lock so navigation waits for it.
                store
                    .update_video_progress(&video.course_id, video.video_index, i64::from(progress))
                    .await;
                if !machine.wants_ticks() {
                    tracing::debug!(video = %video, progress, "video completed; ticking stopped");
                    break;
                }
            }
        });

        *self.ticker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    fn cancel_ticker(&self) {
        if let Some(handle) = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

/// Aborts the tick task. Same guarantee as [`PlayerAdapter::stop`].
impl Drop for PlayerAdapter {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use course_core::model::{CourseCatalog, CourseId};
    use course_core::time::fixed_clock;
    use storage::repository::{InMemoryStore, KeyValueStore, Storage, StorageError, StorageKind};

    use super::*;

    fn key(course: &str, index: u32) -> VideoKey {
        VideoKey::new(CourseId::new(course).unwrap(), index)
    }

    fn store() -> Arc<ProgressStore> {
        Arc::new(ProgressStore::new(
            &Storage::in_memory(),
            Arc::new(CourseCatalog::demo()),
            fixed_clock(),
        ))
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance_ticks(count: u32) {
        for _ in 0..count {
            tokio::time::advance(Duration::from_secs(1)).await;
            settle().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn locked_video_starts_locked() {
        let player = PlayerAdapter::open(store(), PlaybackConfig::default(), key("shopify-starter", 1)).await;
        assert_eq!(player.state(), PlayerState::Locked);

        player.media_ready().await;
        assert_eq!(player.state(), PlayerState::Locked);
        assert!(!player.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn playing_writes_progress_each_tick() {
        let store = store();
        let course = CourseId::new("shopify-starter").unwrap();
        let player =
            PlayerAdapter::open(Arc::clone(&store), PlaybackConfig::default(), key("shopify-starter", 0)).await;
        assert_eq!(player.state(), PlayerState::Loading);

        player.media_ready().await;
        assert_eq!(player.state(), PlayerState::Playing { progress: 0 });
        assert!(store.get_video_progress(&course, 0).await.is_none());

        advance_ticks(3).await;
        assert_eq!(player.state(), PlayerState::Playing { progress: 6 });
        let record = store.get_video_progress(&course, 0).await.unwrap();
        assert_eq!(record.progress(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn ticking_stops_at_completion_and_unlocks_next() {
        let store = store();
        let course = CourseId::new("shopify-starter").unwrap();
        store.update_video_progress(&course, 0, 84).await;

        let player =
            PlayerAdapter::open(Arc::clone(&store), PlaybackConfig::default(), key("shopify-starter", 0)).await;
        player.media_ready().await;
        assert_eq!(player.state(), PlayerState::Playing { progress: 84 });

        advance_ticks(10).await;
        assert_eq!(player.state(), PlayerState::Playing { progress: 90 });
        assert!(!player.is_ticking());
        assert_eq!(store.get_video_progress(&course, 0).await.unwrap().progress(), 90);
        assert!(store.is_video_unlocked(&course, 1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn media_failure_shows_error_and_never_writes() {
        let store = store();
        let course = CourseId::new("shopify-starter").unwrap();
        let player =
            PlayerAdapter::open(Arc::clone(&store), PlaybackConfig::default(), key("shopify-starter", 0)).await;

        player.media_failed("This video is unavailable").await;
        advance_ticks(3).await;

        assert_eq!(
            player.state(),
            PlayerState::Error {
                message: "This video is unavailable".into()
            }
        );
        assert!(store.get_video_progress(&course, 0).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn navigating_cancels_ticks_for_previous_video() {
        let store = store();
        let course = CourseId::new("shopify-starter").unwrap();
        let player =
            PlayerAdapter::open(Arc::clone(&store), PlaybackConfig::default(), key("shopify-starter", 0)).await;
        player.media_ready().await;
        advance_ticks(2).await;

        player.navigate(key("shopify-starter", 2)).await;
        assert_eq!(player.state(), PlayerState::Locked);
        assert!(!player.is_ticking());

        advance_ticks(5).await;
        assert_eq!(store.get_video_progress(&course, 0).await.unwrap().progress(), 4);
        assert!(store.get_video_progress(&course, 2).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn navigating_to_unlocked_video_reloads() {
        let player = PlayerAdapter::open(store(), PlaybackConfig::default(), key("shopify-starter", 1)).await;
        player.navigate(key("shopify-starter", 0)).await;
        assert_eq!(player.state(), PlayerState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn unlock_purchases_and_reloads() {
        let store = store();
        let course = CourseId::new("tiktok-ads-mini").unwrap();
        let player =
            PlayerAdapter::open(Arc::clone(&store), PlaybackConfig::default(), key("tiktok-ads-mini", 2)).await;
        let mut updates = player.subscribe();

        player.unlock().await;

        assert!(store.is_purchased(&course).await);
        assert_eq!(player.state(), PlayerState::Loading);
        assert!(updates.has_changed().unwrap());
        assert_eq!(*updates.borrow_and_update(), PlayerState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_adapter_stops_writes() {
        let store = store();
        let course = CourseId::new("shopify-starter").unwrap();
        let player =
            PlayerAdapter::open(Arc::clone(&store), PlaybackConfig::default(), key("shopify-starter", 0)).await;
        player.media_ready().await;
        advance_ticks(1).await;
        drop(player);

        advance_ticks(5).await;
        assert_eq!(store.get_video_progress(&course, 0).await.unwrap().progress(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn close_stops_writes() {
        let store = store();
        let course = CourseId::new("shopify-starter").unwrap();
        let config = PlaybackConfig::default().with_progress_step(10);
        let player = PlayerAdapter::open(Arc::clone(&store), config, key("shopify-starter", 0)).await;
        player.media_ready().await;
        advance_ticks(2).await;
        player.close().await;

        advance_ticks(5).await;
        assert_eq!(store.get_video_progress(&course, 0).await.unwrap().progress(), 20);
    }

    /// Every `set` takes half a second.
    struct SlowWrites(InMemoryStore);

    #[async_trait]
    impl KeyValueStore for SlowWrites {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            self.0.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.0.remove(key).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_lands_after_close_returns() {
        let storage = Storage::new(Arc::new(SlowWrites(InMemoryStore::new())), StorageKind::Sqlite);
        let store = Arc::new(ProgressStore::new(
            &storage,
            Arc::new(CourseCatalog::demo()),
            fixed_clock(),
        ));
        let course = CourseId::new("shopify-starter").unwrap();
        let player =
            PlayerAdapter::open(Arc::clone(&store), PlaybackConfig::default(), key("shopify-starter", 0)).await;
        player.media_ready().await;

        // Second tick fires and its write is now sleeping inside the store.
        advance_ticks(2).await;
        assert_eq!(store.get_video_progress(&course, 0).await.unwrap().progress(), 2);

        player.close().await;
        let at_close = store.get_video_progress(&course, 0).await.map(|r| r.progress());

        advance_ticks(5).await;
        assert_eq!(
            store.get_video_progress(&course, 0).await.map(|r| r.progress()),
            at_close
        );
        assert!(!player.is_ticking());
    }
}
