use dioxus::prelude::*;
use dioxus_router::{Link, Outlet, Routable};

use crate::context::AppContext;
use crate::views::{CourseView, CoursesView, WatchView};

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
pub enum Route {
    #[layout(Layout)]
        #[route("/", CoursesView)] Courses {},
        #[route("/courses/:course_id", CourseView)] Course { course_id: String },
        #[route("/courses/:course_id/videos/:index", WatchView)] Watch { course_id: String, index: u32 },
}

#[component]
fn Layout() -> Element {
    rsx! {
        div { class: "app",
            Sidebar {}
            main { class: "content",
                StorageBanner {}
                Outlet::<Route> {}
            }
        }
    }
}

#[component]
fn Sidebar() -> Element {
    rsx! {
        nav { class: "sidebar",
            h1 { "Academy" }
            ul {
                li { Link { to: Route::Courses {}, "Courses" } }
            }
        }
    }
}

#[component]
fn StorageBanner() -> Element {
    let ctx = use_context::<AppContext>();
    if ctx.storage_available() {
        return rsx! {};
    }
    rsx! {
        p { class: "storage-banner", "Progress is not being saved on this device." }
    }
}
