use std::sync::{Arc, Mutex, PoisonError};

use dioxus::prelude::*;
use dioxus_router::Link;

use course_core::model::{CourseId, VideoKey};
use course_core::player::PlayerState;
use services::PlayerAdapter;

use crate::context::AppContext;
use crate::routes::Route;
use crate::views::ViewError;
use crate::vm::{embed_url, map_player_state, youtube_embed_id};

#[component]
pub fn WatchView(course_id: String, index: u32) -> Element {
    let ctx = use_context::<AppContext>();
    let store = ctx.progress();

    let Ok(parsed) = CourseId::new(course_id.clone()) else {
        return rsx! {
            p { "{ViewError::NotFound.message()}" }
        };
    };
    let videos = store.catalog().videos(&parsed);
    let Some(video) = videos.get(index as usize).cloned() else {
        return rsx! {
            div { class: "page",
                Link { to: Route::Courses {}, "← All courses" }
                p { "{ViewError::NotFound.message()}" }
            }
        };
    };
    let has_next = (index as usize) + 1 < videos.len();
    let key = VideoKey::new(parsed, index);

    rsx! {
        div { class: "page",
            Link { to: Route::Course { course_id: course_id.clone() }, "← Back to course" }
            h2 { "{video.title}" }
            PlayerPanel { video: key, url: video.url.clone() }
            if !video.description.is_empty() {
                p { "{video.description}" }
            }
            nav { class: "video-nav",
                if index > 0 {
                    Link {
                        to: Route::Watch { course_id: course_id.clone(), index: index - 1 },
                        "Previous"
                    }
                }
                if has_next {
                    Link {
                        to: Route::Watch { course_id: course_id.clone(), index: index + 1 },
                        "Next"
                    }
                }
            }
        }
    }
}

/// The panel's adapter, shared with event handlers and the unmount hook.
#[derive(Clone, Default)]
struct PlayerSlot(Arc<Mutex<Option<Arc<PlayerAdapter>>>>);

impl PlayerSlot {
    fn get(&self) -> Option<Arc<PlayerAdapter>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, player: Arc<PlayerAdapter>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(player);
    }

    fn take(&self) -> Option<Arc<PlayerAdapter>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Closes the adapter off the render path. Once `close` returns no tick
/// write for this panel can land.
fn close_in_background(player: Arc<PlayerAdapter>) {
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move { player.close().await });
        }
        Err(_) => player.stop(),
    }
}

/// Hosts one `PlayerAdapter` for the lifetime of the panel.
///
/// When the route switches to another video the adapter is navigated rather
/// than rebuilt. Unmounting closes it.
#[component]
fn PlayerPanel(video: VideoKey, url: String) -> Element {
    let ctx = use_context::<AppContext>();
    let slot = use_hook(PlayerSlot::default);
    let mut state = use_signal(|| None::<PlayerState>);

    use_drop({
        let slot = slot.clone();
        move || {
            if let Some(player) = slot.take() {
                close_in_background(player);
            }
        }
    });

    let _driver = use_resource(use_reactive((&video, &url), {
        let slot = slot.clone();
        move |(video, url)| {
            let ctx = ctx.clone();
            let slot = slot.clone();
            async move {
                let player = match slot.get() {
                    Some(player) => {
                        player.navigate(video).await;
                        player
                    }
                    None => {
                        let player = Arc::new(ctx.open_player(video).await);
                        slot.set(Arc::clone(&player));
                        player
                    }
                };

                if youtube_embed_id(&url).is_none() {
                    player.media_failed("Unsupported video link.").await;
                }

                let mut updates = player.subscribe();
                state.set(Some(updates.borrow_and_update().clone()));
                while updates.changed().await.is_ok() {
                    state.set(Some(updates.borrow_and_update().clone()));
                }
            }
        }
    }));

    let on_ready = {
        let slot = slot.clone();
        move |_| {
            if let Some(player) = slot.get() {
                spawn(async move {
                    player.media_ready().await;
                });
            }
        }
    };

    let on_error = {
        let slot = slot.clone();
        move |_| {
            if let Some(player) = slot.get() {
                spawn(async move {
                    player.media_failed("The video failed to load.").await;
                });
            }
        }
    };

    let on_unlock = move |_| {
        if let Some(player) = slot.get() {
            spawn(async move {
                player.unlock().await;
            });
        }
    };

    let Some(vm) = state.read().as_ref().map(map_player_state) else {
        return rsx! {
            div { class: "player",
                p { "Loading video..." }
            }
        };
    };

    let frame = match youtube_embed_id(&url) {
        Some(id) if vm.shows_embed() => rsx! {
            iframe {
                class: "player-frame",
                src: embed_url(&id),
                title: "Course video",
                allow: "autoplay; encrypted-media; picture-in-picture",
                allowfullscreen: true,
                onload: on_ready,
                onerror: on_error,
            }
        },
        _ => rsx! {},
    };

    let error_line = match vm.message.clone() {
        Some(message) => rsx! {
            p { class: "player-error", "{message}" }
        },
        None => rsx! {},
    };

    rsx! {
        div { class: "player",
            {frame}
            if vm.can_unlock() {
                div { class: "player-overlay",
                    p { "{vm.status_str}" }
                    button { class: "unlock", onclick: on_unlock, "Unlock course" }
                }
            } else {
                p { class: "player-status", "{vm.status_str}" }
            }
            {error_line}
            if vm.progress > 0 {
                div { class: "progress-bar",
                    span { style: "width: {vm.progress}%" }
                }
            }
        }
    }
}
