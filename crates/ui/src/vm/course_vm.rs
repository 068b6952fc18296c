use services::CourseListing;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CourseCardVm {
    pub id: String,
    pub title: String,
    pub percent: u8,
    pub percent_str: String,
    pub completed_str: String,
    pub purchased: bool,
    /// "2 videos locked"; `None` once nothing is locked.
    pub locked_str: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoStatus {
    Locked,
    NotStarted,
    InProgress(u8),
    Completed,
}

impl VideoStatus {
    #[must_use]
    pub fn label(self) -> String {
        match self {
            VideoStatus::Locked => "Locked".to_string(),
            VideoStatus::NotStarted => "Not started".to_string(),
            VideoStatus::InProgress(progress) => format!("{progress}% watched"),
            VideoStatus::Completed => "Completed".to_string(),
        }
    }

    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            VideoStatus::Locked => "status-locked",
            VideoStatus::NotStarted | VideoStatus::InProgress(_) => "status-open",
            VideoStatus::Completed => "status-completed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoRowVm {
    pub index: u32,
    pub title: String,
    pub description: String,
    pub status: VideoStatus,
    pub status_str: String,
}

impl VideoRowVm {
    #[must_use]
    pub fn can_watch(&self) -> bool {
        self.status != VideoStatus::Locked
    }
}

#[must_use]
pub fn map_course_card(listing: &CourseListing) -> CourseCardVm {
    let progress = &listing.progress;
    CourseCardVm {
        id: listing.course_id.to_string(),
        title: listing.title.clone(),
        percent: progress.overall_progress,
        percent_str: format!("{}%", progress.overall_progress),
        completed_str: format!(
            "{} of {} videos completed",
            progress.videos_completed, progress.total_videos
        ),
        purchased: progress.purchased,
        locked_str: match listing.locked_count() {
            0 => None,
            1 => Some("1 video locked".to_string()),
            count => Some(format!("{count} videos locked")),
        },
    }
}

#[must_use]
pub fn map_video_rows(listing: &CourseListing) -> Vec<VideoRowVm> {
    listing
        .videos
        .iter()
        .map(|video| {
            let status = if !video.unlocked {
                VideoStatus::Locked
            } else if video.completed {
                VideoStatus::Completed
            } else if video.progress == 0 {
                VideoStatus::NotStarted
            } else {
                VideoStatus::InProgress(video.progress)
            };
            VideoRowVm {
                index: video.index,
                title: video.video.title.clone(),
                description: video.video.description.clone(),
                status,
                status_str: status.label(),
            }
        })
        .collect()
}
