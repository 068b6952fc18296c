#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod course_listing;
pub mod error;
pub mod player;
pub mod progress_store;

pub use course_core::Clock;

pub use app_services::{AppServices, load_catalog};
pub use config::PlaybackConfig;
pub use course_listing::{CourseListing, CourseListingService, ProgressPoller, VideoListing};
pub use error::AppServicesError;
pub use player::PlayerAdapter;
pub use progress_store::ProgressStore;
