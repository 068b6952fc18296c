use dioxus::prelude::*;
use dioxus_router::Link;

use crate::context::AppContext;
use crate::routes::Route;
use crate::views::{ViewError, ViewState, view_state_from_resource};
use crate::vm::{CourseCardVm, map_course_card};

#[component]
pub fn CoursesView() -> Element {
    let ctx = use_context::<AppContext>();
    let listings = ctx.listings();

    let resource = use_resource(move || {
        let listings = listings.clone();
        async move {
            let overview = listings.overview().await;
            Ok::<_, ViewError>(overview.iter().map(map_course_card).collect::<Vec<_>>())
        }
    });

    let state = view_state_from_resource(resource);

    rsx! {
        div { class: "page",
            h2 { "Courses" }

            match state {
                ViewState::Idle => rsx! {
                    p { "Idle" }
                },
                ViewState::Loading => rsx! {
                    p { "Loading..." }
                },
                ViewState::Ready(cards) => rsx! {
                    if cards.is_empty() {
                        p { "No courses available yet." }
                    } else {
                        ul {
                            for card in cards {
                                CourseCard { key: "{card.id}", card }
                            }
                        }
                    }
                },
                ViewState::Error(err) => rsx! {
                    p { "{err.message()}" }
                },
            }
        }
    }
}

#[component]
fn CourseCard(card: CourseCardVm) -> Element {
    let width = format!("width: {}%", card.percent);
    rsx! {
        li { class: "course-card",
            Link { to: Route::Course { course_id: card.id.clone() }, "{card.title}" }
            div { class: "progress-bar", span { style: "{width}" } }
            p { "{card.percent_str} · {card.completed_str}" }
            if card.purchased {
                span { class: "badge", "Unlocked" }
            }
        }
    }
}
