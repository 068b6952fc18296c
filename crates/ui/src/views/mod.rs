mod course;
mod courses;
mod state;
mod watch;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod view_smoke;

pub use course::CourseView;
pub use courses::CoursesView;
pub use state::{ViewError, ViewState, view_state_from_resource};
pub use watch::WatchView;
