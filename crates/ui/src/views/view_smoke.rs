use course_core::model::CourseId;
use storage::repository::Storage;

use super::test_harness::{ViewKind, setup_view_harness, setup_view_harness_with_storage};

fn id(raw: &str) -> CourseId {
    CourseId::new(raw).unwrap()
}

#[tokio::test(flavor = "current_thread")]
async fn courses_view_lists_catalog_with_progress() {
    let mut harness = setup_view_harness(ViewKind::Courses);
    harness
        .services
        .progress()
        .update_video_progress(&id("shopify-starter"), 0, 100)
        .await;

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("Shopify Starter"), "missing course in {html}");
    assert!(html.contains("TikTok Ads Mini Course"), "missing course in {html}");
    assert!(html.contains("33%"), "missing progress in {html}");
    assert!(html.contains("1 of 3 videos completed"), "missing count in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn course_view_shows_locked_videos_and_unlock_button() {
    let mut harness = setup_view_harness(ViewKind::Course("shopify-starter".into()));

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("Progress: 0%"), "missing progress in {html}");
    assert!(html.contains("Not started"), "missing first video status in {html}");
    assert!(html.contains("Locked"), "missing locked status in {html}");
    assert!(html.contains("Unlock course"), "missing unlock button in {html}");
    assert!(html.contains("2 videos locked"), "missing locked count in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn course_view_reflects_purchase() {
    let mut harness = setup_view_harness(ViewKind::Course("tiktok-ads-mini".into()));
    harness
        .services
        .progress()
        .purchase_course(&id("tiktok-ads-mini"))
        .await;

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("All videos unlocked"), "missing badge in {html}");
    assert!(!html.contains("Locked"), "unexpected locked video in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn unknown_course_renders_not_found() {
    let mut harness = setup_view_harness(ViewKind::Course("no-such-course".into()));

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("couldn"), "missing not found message in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn watch_view_locks_gated_video() {
    let mut harness = setup_view_harness(ViewKind::Watch("shopify-starter".into(), 2));

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("Your first product"), "missing title in {html}");
    assert!(html.contains("Unlock course"), "missing unlock affordance in {html}");
    assert!(!html.contains("<iframe"), "locked video must not embed in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn watch_view_embeds_unlocked_video() {
    let mut harness = setup_view_harness(ViewKind::Watch("shopify-starter".into(), 0));

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("Opening your store"), "missing title in {html}");
    assert!(html.contains("Loading video..."), "missing loading state in {html}");
    assert!(
        html.contains("youtube.com/embed/Zr7Ad2wE3kQ"),
        "missing embed in {html}"
    );
}

#[tokio::test(flavor = "current_thread")]
async fn watch_view_without_storage_still_plays_first_video() {
    let mut harness =
        setup_view_harness_with_storage(ViewKind::Watch("shopify-starter".into(), 0), &Storage::null());

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("Loading video..."), "missing loading state in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn watch_view_unknown_video_is_not_found() {
    let mut harness = setup_view_harness(ViewKind::Watch("shopify-starter".into(), 9));

    harness.rebuild();
    harness.drive_async().await;
    let html = harness.render();

    assert!(html.contains("couldn"), "missing not found message in {html}");
}
