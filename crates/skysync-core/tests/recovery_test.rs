#![allow(clippy::unwrap_used)]

mod support;

use pretty_assertions::assert_eq;
use skysync_api::skyspark::{Row, Value};
use skysync_core::RefRecovery;
use tracing::Span;

use support::{FakeSink, FakeSource, point, site};

fn sink_point(topic: Option<&str>) -> Row {
    let mut row = Row::from([
        ("point".to_owned(), Value::Marker),
        ("dis".to_owned(), Value::str("pt")),
        ("siteRef".to_owned(), Value::reference("p:demo:r:s1")),
        ("equipRef".to_owned(), Value::reference("p:demo:r:e1")),
    ]);
    if let Some(topic) = topic {
        row.insert("aceTopic".to_owned(), Value::str(topic));
    }
    row
}

fn fixture() -> (FakeSource, FakeSink) {
    let mut source = FakeSource::new(
        site("hq"),
        vec![point("hq", 1, "ZN-T", None), point("hq", 2, "AHU-1/SAT", None)],
    );
    source
        .state
        .get_mut()
        .unwrap()
        .points
        .push(point("annex", 3, "ZN-T", None));

    let sink = FakeSink::default();
    sink.seed(sink_point(Some("acme/hq/ZN-T")));
    sink.seed(sink_point(Some("acme/hq/AHU-1/SAT")));
    sink.seed(sink_point(Some("acme/annex/ZN-T")));
    sink.seed(sink_point(Some("garbage")));
    sink.seed(sink_point(None));
    (source, sink)
}

#[tokio::test]
async fn references_are_rebuilt_from_origin_topics() {
    let (source, sink) = fixture();

    let result = RefRecovery::new(&source, &sink, 2, Span::none())
        .recover_refs(None, false)
        .await;

    assert_eq!(result.points_found, 4);
    assert_eq!(result.refs_updated, 3);
    assert_eq!(result.points_skipped, 1);
    assert!(result.is_success());

    let sat = source.point("acme/hq/AHU-1/SAT");
    assert_eq!(sat.refs.point.as_deref(), Some("p:demo:r:r2"));
    assert_eq!(sat.refs.site.as_deref(), Some("p:demo:r:s1"));
    assert_eq!(sat.refs.equip.as_deref(), Some("p:demo:r:e1"));
    assert_eq!(source.state.lock().unwrap().write_back_calls, 2);
}

#[tokio::test]
async fn site_filter_limits_recovery() {
    let (source, sink) = fixture();

    let result = RefRecovery::new(&source, &sink, 100, Span::none())
        .recover_refs(Some("annex"), false)
        .await;

    assert_eq!(result.points_found, 1);
    assert_eq!(result.refs_updated, 1);
    assert!(source.point("acme/hq/ZN-T").refs.point.is_none());
    assert!(source.point("acme/annex/ZN-T").refs.point.is_some());
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
    let (source, sink) = fixture();

    let result = RefRecovery::new(&source, &sink, 100, Span::none())
        .recover_refs(None, true)
        .await;

    assert_eq!(result.refs_updated, 3);
    assert_eq!(source.state.lock().unwrap().write_back_calls, 0);
}

#[tokio::test]
async fn write_failures_are_collected() {
    let (source, sink) = fixture();
    source.state.lock().unwrap().fail_write_back = true;

    let result = RefRecovery::new(&source, &sink, 2, Span::none())
        .recover_refs(None, false)
        .await;

    assert_eq!(result.refs_updated, 0);
    assert_eq!(result.errors.len(), 2);
}
