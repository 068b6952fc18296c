mod catalog;
mod ids;
mod progress;

pub use catalog::{CatalogError, CourseCatalog, CourseEntry, CourseVideo};
pub use ids::{CourseId, CourseIdError, VideoKey};
pub use progress::{
    COMPLETION_THRESHOLD, CourseProgress, MAX_PROGRESS, VideoProgress, clamp_progress, is_completed,
};
