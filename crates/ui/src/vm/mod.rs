mod course_vm;
mod player_vm;

pub use course_vm::{CourseCardVm, VideoRowVm, VideoStatus, map_course_card, map_video_rows};
pub use player_vm::{PlayerPhase, PlayerVm, embed_url, map_player_state, youtube_embed_id};
