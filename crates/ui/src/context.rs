use std::sync::Arc;

use course_core::model::VideoKey;
use services::{CourseListingService, PlaybackConfig, PlayerAdapter, ProgressStore};

pub trait UiApp: Send + Sync {
    fn progress(&self) -> Arc<ProgressStore>;
    fn listings(&self) -> Arc<CourseListingService>;
    fn playback_config(&self) -> PlaybackConfig;
}

#[derive(Clone)]
pub struct AppContext {
    progress: Arc<ProgressStore>,
    listings: Arc<CourseListingService>,
    config: PlaybackConfig,
}

impl AppContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        Self {
            progress: app.progress(),
            listings: app.listings(),
            config: app.playback_config(),
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn listings(&self) -> Arc<CourseListingService> {
        Arc::clone(&self.listings)
    }

    #[must_use]
    pub fn config(&self) -> PlaybackConfig {
        self.config
    }

    /// False when progress is not being saved on this device.
    #[must_use]
    pub fn storage_available(&self) -> bool {
        self.progress.is_available()
    }

    pub async fn open_player(&self, video: VideoKey) -> PlayerAdapter {
        PlayerAdapter::open(self.progress(), self.config, video).await
    }
}

// Provided by the application composition root (`crates/app`).

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: &Arc<dyn UiApp>) -> AppContext {
    AppContext::new(app)
}
