use course_core::player::PlayerState;
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerPhase {
    Locked,
    Loading,
    Playing,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerVm {
    pub phase: PlayerPhase,
    pub progress: u8,
    pub status_str: String,
    pub message: Option<String>,
}

impl PlayerVm {
    /// Only a locked player offers the unlock button.
    #[must_use]
    pub fn can_unlock(&self) -> bool {
        self.phase == PlayerPhase::Locked
    }

    /// The embed is mounted while loading or playing.
    #[must_use]
    pub fn shows_embed(&self) -> bool {
        matches!(self.phase, PlayerPhase::Loading | PlayerPhase::Playing)
    }
}

#[must_use]
pub fn map_player_state(state: &PlayerState) -> PlayerVm {
    match state {
        PlayerState::Locked => PlayerVm {
            phase: PlayerPhase::Locked,
            progress: 0,
            status_str: "Finish the previous video or unlock the course to watch this one."
                .to_string(),
            message: None,
        },
        PlayerState::Loading => PlayerVm {
            phase: PlayerPhase::Loading,
            progress: 0,
            status_str: "Loading video...".to_string(),
            message: None,
        },
        PlayerState::Playing { progress } => PlayerVm {
            phase: PlayerPhase::Playing,
            progress: *progress,
            status_str: format!("Progress: {progress}%"),
            message: None,
        },
        PlayerState::Error { message } => PlayerVm {
            phase: PlayerPhase::Error,
            progress: 0,
            status_str: "This video could not be loaded.".to_string(),
            message: Some(message.clone()),
        },
    }
}

/// Resolves the YouTube video id from watch, short and embed URLs.
#[must_use]
pub fn youtube_embed_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let id = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_owned),
        "youtube.com" | "youtube-nocookie.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("embed" | "shorts" | "live") => segments.next().map(str::to_owned),
                _ => None,
            }
        }
        _ => None,
    }?;

    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

#[must_use]
pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{video_id}?rel=0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_common_url_shapes() {
        for raw in [
            "https://www.youtube.com/watch?v=Zr7Ad2wE3kQ",
            "https://youtube.com/watch?feature=share&v=Zr7Ad2wE3kQ",
            "https://youtu.be/Zr7Ad2wE3kQ",
            "https://www.youtube.com/embed/Zr7Ad2wE3kQ",
            "https://m.youtube.com/shorts/Zr7Ad2wE3kQ",
        ] {
            assert_eq!(youtube_embed_id(raw).as_deref(), Some("Zr7Ad2wE3kQ"), "{raw}");
        }
    }

    #[test]
    fn rejects_other_hosts_and_bad_ids() {
        assert_eq!(youtube_embed_id("https://vimeo.com/12345"), None);
        assert_eq!(youtube_embed_id("not a url"), None);
        assert_eq!(youtube_embed_id("https://www.youtube.com/watch"), None);
        assert_eq!(youtube_embed_id("https://youtu.be/<script>"), None);
    }

    #[test]
    fn maps_states_to_view_models() {
        let locked = map_player_state(&PlayerState::Locked);
        assert!(locked.can_unlock());
        assert!(!locked.shows_embed());

        let playing = map_player_state(&PlayerState::Playing { progress: 42 });
        assert_eq!(playing.status_str, "Progress: 42%");
        assert!(playing.shows_embed());

        let failed = map_player_state(&PlayerState::Error {
            message: "unavailable".into(),
        });
        assert_eq!(failed.message.as_deref(), Some("unavailable"));
        assert!(!failed.can_unlock());
    }
}
