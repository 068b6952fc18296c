use dioxus::prelude::*;
use dioxus_router::Link;

use course_core::model::CourseId;
use services::CourseListing;

use crate::context::AppContext;
use crate::routes::Route;
use crate::views::ViewError;
use crate::vm::{VideoRowVm, map_course_card, map_video_rows};

#[component]
pub fn CourseView(course_id: String) -> Element {
    let ctx = use_context::<AppContext>();
    let listings = ctx.listings();
    let poll_interval = ctx.config().poll_interval();
    let parsed = CourseId::new(course_id).ok();

    let mut listing = use_signal(|| None::<CourseListing>);
    let mut loaded = use_signal(|| false);

    // Restarted when the route points at another course. Dropping the
    // previous future drops its poller, which cancels the refresh task.
    let _poll = use_resource(use_reactive((&parsed,), {
        let listings = listings.clone();
        move |(parsed,)| {
            let listings = listings.clone();
            async move {
                let Some(course_id) = parsed else {
                    loaded.set(true);
                    return;
                };
                let poller = listings.poll(course_id, poll_interval);
                let mut updates = poller.subscribe();
                while updates.changed().await.is_ok() {
                    let next = updates.borrow_and_update().clone();
                    listing.set(next);
                    loaded.set(true);
                }
            }
        }
    }));

    let on_purchase = {
        let parsed = parsed.clone();
        move |_| {
            let Some(course_id) = parsed.clone() else {
                return;
            };
            let listings = listings.clone();
            spawn(async move {
                // Re-read right away instead of waiting for the next poll.
                if let Some(updated) = listings.purchase(&course_id).await {
                    listing.set(Some(updated));
                }
            });
        }
    };

    let current = listing.read().clone();
    let body = match current {
        None if !loaded() => rsx! {
            p { "Loading..." }
        },
        None => rsx! {
            p { "{ViewError::NotFound.message()}" }
        },
        Some(listing) => {
            let card = map_course_card(&listing);
            let rows = map_video_rows(&listing);
            let width = format!("width: {}%", card.percent);
            let locked_line = match card.locked_str.clone() {
                Some(locked) => rsx! {
                    span { class: "locked-count", "{locked}" }
                },
                None => rsx! {},
            };
            rsx! {
                h2 { "{card.title}" }
                div { class: "progress-bar", span { style: "{width}" } }
                p { "Progress: {card.percent_str} · {card.completed_str}" }
                if card.purchased {
                    p { class: "badge", "All videos unlocked" }
                } else {
                    div { class: "unlock-bar",
                        {locked_line}
                        button { class: "unlock", onclick: on_purchase, "Unlock course" }
                    }
                }
                ul {
                    for row in rows {
                        VideoRow { key: "{row.index}", course_id: card.id.clone(), row }
                    }
                }
            }
        }
    };

    rsx! {
        div { class: "page",
            Link { to: Route::Courses {}, "← All courses" }
            {body}
        }
    }
}

#[component]
fn VideoRow(course_id: String, row: VideoRowVm) -> Element {
    let number = row.index + 1;
    rsx! {
        li { class: "video-row",
            if row.can_watch() {
                Link {
                    to: Route::Watch { course_id: course_id.clone(), index: row.index },
                    "{number}. {row.title}"
                }
            } else {
                span { "{number}. {row.title}" }
            }
            span { class: row.status.css_class(), " {row.status_str}" }
            if !row.description.is_empty() {
                p { "{row.description}" }
            }
        }
    }
}
