#![allow(clippy::unwrap_used)]

mod support;

use std::time::Duration;

use pretty_assertions::assert_eq;
use skysync_api::skyspark::{Row, Value};
use skysync_core::{EntityKind, SinkFetcher, SourceFetcher};
use tokio::time::Instant;
use tracing::Span;

use support::{FakeSink, FakeSource, point, site};

fn ten_points() -> FakeSource {
    FakeSource::new(
        site("hq"),
        (1..=10)
            .map(|i| point("hq", i, &format!("P-{i:02}"), None))
            .collect(),
    )
}

#[tokio::test(start_paused = true)]
async fn failing_page_keeps_earlier_pages() {
    let source = ten_points();
    source.state.lock().unwrap().failing_pages.insert(3);

    let fetcher = SourceFetcher::new(&source, 2, Duration::from_secs(1), Span::none());
    let points = fetcher.fetch_points("hq", true).await;

    let names: Vec<&str> = points.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["acme/hq/P-01", "acme/hq/P-02", "acme/hq/P-03", "acme/hq/P-04"]
    );
    assert_eq!(source.state.lock().unwrap().page_requests, vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn pages_are_paced() {
    let source = ten_points();
    let fetcher = SourceFetcher::new(&source, 2, Duration::from_secs(1), Span::none());

    let started = Instant::now();
    let points = fetcher.fetch_points("hq", true).await;

    assert_eq!(points.len(), 10);
    // Five pages, a pause between each pair.
    assert_eq!(started.elapsed(), Duration::from_secs(4));
}

#[tokio::test]
async fn configured_only_filters_uncollected_points() {
    let source = ten_points();
    source.state.lock().unwrap().points[0].collect_enabled = false;
    let fetcher = SourceFetcher::new(&source, 500, Duration::ZERO, Span::none());

    assert_eq!(fetcher.fetch_points("hq", true).await.len(), 9);
    assert_eq!(fetcher.fetch_points("hq", false).await.len(), 10);
}

#[tokio::test]
async fn empty_site_stops_after_one_page() {
    let source = FakeSource::new(site("hq"), Vec::new());
    let fetcher = SourceFetcher::new(&source, 500, Duration::ZERO, Span::none());

    assert!(fetcher.fetch_points("hq", true).await.is_empty());
    assert_eq!(source.state.lock().unwrap().page_requests, vec![1]);
}

#[tokio::test]
async fn timezone_failure_is_reported() {
    let sink = FakeSink::with_timezone(None);
    let fetcher = SinkFetcher::new(&sink, Span::none());

    assert!(fetcher.project_timezone().await.is_err());
    assert!(fetcher.fetch_points().await.is_empty());
}

#[tokio::test]
async fn failed_entity_read_degrades_to_empty() {
    let sink = FakeSink::default();
    sink.seed(Row::from([
        ("equip".to_owned(), Value::Marker),
        ("dis".to_owned(), Value::str("AHU-1")),
    ]));
    sink.fail_read(EntityKind::Equip);
    let fetcher = SinkFetcher::new(&sink, Span::none());

    assert!(fetcher.fetch_equipment().await.is_empty());
    assert!(fetcher.fetch_sites().await.is_empty());
    assert_eq!(sink.count(EntityKind::Equip), 1);
}
