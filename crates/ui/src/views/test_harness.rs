use std::sync::Arc;

use dioxus::core::NoOpMutations;
use dioxus::prelude::*;
use dioxus_router::{Routable, Router};
use course_core::model::CourseCatalog;
use course_core::time::fixed_clock;
use services::{AppServices, CourseListingService, PlaybackConfig, ProgressStore};
use storage::repository::Storage;

use crate::context::{UiApp, build_app_context};
use crate::views::{CourseView, CoursesView, WatchView};

#[derive(Clone)]
struct TestApp {
    services: AppServices,
}

impl UiApp for TestApp {
    fn progress(&self) -> Arc<ProgressStore> {
        self.services.progress()
    }

    fn listings(&self) -> Arc<CourseListingService> {
        self.services.listings()
    }

    fn playback_config(&self) -> PlaybackConfig {
        self.services.config()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum ViewKind {
    Courses,
    Course(String),
    Watch(String, u32),
}

#[derive(Props, Clone)]
struct ViewHarnessProps {
    app: Arc<TestApp>,
    view: ViewKind,
}

impl PartialEq for ViewHarnessProps {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

#[component]
fn ViewRouterHarness(props: ViewHarnessProps) -> Element {
    let app: Arc<dyn UiApp> = props.app.clone();
    use_context_provider(|| build_app_context(&app));
    use_context_provider(|| props.view.clone());
    rsx! { Router::<TestRoute> {} }
}

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum TestRoute {
    #[route("/")]
    Root {},
}

#[component]
fn Root() -> Element {
    let view = use_context::<ViewKind>();
    match view {
        ViewKind::Courses => rsx! { CoursesView {} },
        ViewKind::Course(course_id) => rsx! { CourseView { course_id } },
        ViewKind::Watch(course_id, index) => rsx! { WatchView { course_id, index } },
    }
}

pub struct ViewHarness {
    pub dom: VirtualDom,
    pub services: AppServices,
}

impl ViewHarness {
    pub fn rebuild(&mut self) {
        self.dom.rebuild_in_place();
        drive_dom(&mut self.dom);
    }

    pub async fn drive_async(&mut self) {
        for _ in 0..4 {
            let _ = tokio::time::timeout(
                std::time::Duration::from_millis(50),
                self.dom.wait_for_work(),
            )
            .await;
            self.dom.render_immediate(&mut NoOpMutations);
            self.dom.process_events();
        }
    }

    pub fn render(&self) -> String {
        dioxus_ssr::render(&self.dom)
    }
}

pub fn drive_dom(dom: &mut VirtualDom) {
    dom.process_events();
    dom.render_immediate(&mut NoOpMutations);
    dom.process_events();
}

pub fn setup_view_harness(view: ViewKind) -> ViewHarness {
    setup_view_harness_with_storage(view, &Storage::in_memory())
}

pub fn setup_view_harness_with_storage(view: ViewKind, storage: &Storage) -> ViewHarness {
    let services = AppServices::new(
        storage,
        CourseCatalog::demo(),
        fixed_clock(),
        PlaybackConfig::default(),
    );
    let app = Arc::new(TestApp {
        services: services.clone(),
    });
    let dom = VirtualDom::new_with_props(ViewRouterHarness, ViewHarnessProps { app, view });
    ViewHarness { dom, services }
}
