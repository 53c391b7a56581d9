#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashSet;

use obskit_core::{label_values, ErrorCode};
use obskit_metrics::{
    EndOptions, MeasureOptions, Metrics, RetroactiveOptions, StartOptions, SummaryOptions,
};

fn metrics_with_m1() -> (Metrics, std::sync::Arc<obskit_metrics::TimeMeasure>) {
    let metrics = Metrics::new();
    let measure = metrics
        .add_time_measure(MeasureOptions::new("m1").labels(["l1", "l2"]))
        .unwrap();
    (metrics, measure)
}

#[test]
fn start_without_id_generates_distinct_ids() {
    let (_metrics, measure) = metrics_with_m1();
    let ids: HashSet<String> = (0..16).map(|_| measure.start(StartOptions::default()).unwrap()).collect();
    assert_eq!(ids.len(), 16);
    assert_eq!(measure.pending(), 16);
    for id in ids {
        measure.end(EndOptions::new(id)).unwrap();
    }
    assert_eq!(measure.pending(), 0);
}

#[test]
fn end_without_id_is_argument_error() {
    let (_metrics, measure) = metrics_with_m1();
    let err = measure.end(EndOptions::default()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Argument);
}

#[test]
fn end_unknown_id_is_not_found() {
    let (_metrics, measure) = metrics_with_m1();
    measure.start(StartOptions::default().id("known")).unwrap();
    let err = measure.end(EndOptions::new("unknown")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(measure.pending(), 1);
}

#[test]
fn start_and_end_labels_are_merged() {
    let (metrics, measure) = metrics_with_m1();
    let id = measure
        .start(StartOptions::default().label_values(label_values([("l1", 1)])))
        .unwrap();
    measure
        .end(EndOptions::new(id).label_values(label_values([("l2", 2)])))
        .unwrap();

    let text = metrics.metrics().unwrap();
    assert!(text.contains("m1_counter{l1=\"1\",l2=\"2\"} 1"));
    assert!(text.contains("m1_histogram_count{l1=\"1\",l2=\"2\"} 1"));
}

#[test]
fn end_labels_override_start_labels() {
    let (metrics, measure) = metrics_with_m1();
    let id = measure
        .start(StartOptions::default().label_values(label_values([("l1", 1), ("l2", 2)])))
        .unwrap();
    measure
        .end(EndOptions::new(id).label_values(label_values([("l2", 3)])))
        .unwrap();

    let text = metrics.metrics().unwrap();
    assert!(text.contains("m1_counter{l1=\"1\",l2=\"3\"} 1"));
    assert!(!text.contains("l2=\"2\""));
}

#[test]
fn works_without_labels() {
    let metrics = Metrics::new();
    let measure = metrics.add_time_measure(MeasureOptions::new("plain")).unwrap();
    let id = measure.start(StartOptions::default()).unwrap();
    measure.end(EndOptions::new(id)).unwrap();

    let text = metrics.metrics().unwrap();
    assert!(text.contains("plain_counter 1"));
    assert!(text.contains("plain_histogram_count 1"));
}

#[test]
fn overlapping_measurements_are_tracked_per_id() {
    let (metrics, measure) = metrics_with_m1();
    let a = measure
        .start(StartOptions::default().label_values(label_values([("l1", "a")])))
        .unwrap();
    let b = measure
        .start(StartOptions::default().label_values(label_values([("l1", "b")])))
        .unwrap();
    measure.end(EndOptions::new(b)).unwrap();
    measure.end(EndOptions::new(a)).unwrap();

    let text = metrics.metrics().unwrap();
    for value in ["a", "b"] {
        let needle = format!("l1=\"{value}\"");
        assert!(text
            .lines()
            .any(|l| l.starts_with("m1_counter{") && l.contains(&needle) && l.ends_with(" 1")));
    }
}

#[test]
fn undeclared_labels_are_rejected_before_losing_the_measurement() {
    let (metrics, measure) = metrics_with_m1();
    let err = measure
        .start(StartOptions::default().label_values(label_values([("zzz", 1)])))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(measure.pending(), 0);

    let id = measure
        .start(StartOptions::default().label_values(label_values([("l1", "a")])))
        .unwrap();
    let err = measure
        .end(EndOptions::new(id.clone()).label_values(label_values([("zzz", 1)])))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(measure.pending(), 1);

    // a corrected retry still finds the pending entry
    measure
        .end(EndOptions::new(id).label_values(label_values([("l2", "b")])))
        .unwrap();
    assert!(metrics.metrics().unwrap().contains("m1_counter{l1=\"a\",l2=\"b\"} 1"));
}

#[test]
fn summary_rejects_undeclared_labels_at_start() {
    let metrics = Metrics::new();
    let summary = metrics
        .add_summary_measure(MeasureOptions::new("s2").labels(["op"]))
        .unwrap();
    let err = summary
        .start(StartOptions::default().label_values(label_values([("zzz", 1)])))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(summary.pending(), 0);
}

#[test]
fn retroactive_requires_time() {
    let (_metrics, measure) = metrics_with_m1();
    let err = measure.retroactive(RetroactiveOptions::default()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Argument);
}

#[test]
fn retroactive_records_given_duration() {
    let (metrics, measure) = metrics_with_m1();
    measure
        .retroactive(RetroactiveOptions::new(250.0).label_values(label_values([("l1", "x"), ("l2", "y")])))
        .unwrap();

    let text = metrics.metrics().unwrap();
    assert!(text.contains("m1_histogram_sum{l1=\"x\",l2=\"y\"} 250"));
    assert!(text.contains("m1_histogram_bucket{l1=\"x\",l2=\"y\",le=\"200\"} 0"));
    assert!(text.contains("m1_histogram_bucket{l1=\"x\",l2=\"y\",le=\"300\"} 1"));
    assert_eq!(measure.pending(), 0);
}

#[test]
fn summary_start_end_and_render() {
    let metrics = Metrics::new();
    let summary = metrics
        .add_summary_measure(
            SummaryOptions::from(MeasureOptions::new("s1").labels(["op"])).percentiles(vec![0.5, 0.9]),
        )
        .unwrap();

    for v in [10.0, 20.0, 30.0, 40.0] {
        summary
            .retroactive(RetroactiveOptions::new(v).label_values(label_values([("op", "read")])))
            .unwrap();
    }
    let id = summary
        .start(StartOptions::default().label_values(label_values([("op", "write")])))
        .unwrap();
    summary.end(EndOptions::new(id.clone())).unwrap();
    assert_eq!(summary.end(EndOptions::new(id)).unwrap_err().code(), ErrorCode::NotFound);

    let text = metrics.metrics().unwrap();
    assert!(text.contains("# TYPE s1_summary summary"));
    assert!(text.contains("s1_summary{op=\"read\",quantile=\"0.5\"} 20"));
    assert!(text.contains("s1_summary{op=\"read\",quantile=\"0.9\"} 40"));
    assert!(text.contains("s1_summary_sum{op=\"read\"} 100"));
    assert!(text.contains("s1_summary_count{op=\"read\"} 4"));
    assert!(text.contains("s1_summary_count{op=\"write\"} 1"));

    metrics.remove_measure("s1");
    assert!(!metrics.metrics().unwrap().contains("s1_summary"));
}

#[test]
fn counter_and_gauge_updates() {
    let metrics = Metrics::new();
    let counter = metrics.add_counter_measure(MeasureOptions::new("hits")).unwrap();
    let gauge = metrics
        .add_gauge_measure(MeasureOptions::new("queue").labels(["name"]))
        .unwrap();
    let q = label_values([("name", "jobs")]);

    counter.inc(&Default::default()).unwrap();
    counter.inc_by(2.0, &Default::default()).unwrap();
    assert_eq!(counter.inc_by(-1.0, &Default::default()).unwrap_err().code(), ErrorCode::Validation);

    gauge.set(10.0, &q).unwrap();
    gauge.inc(&q).unwrap();
    gauge.dec_by(4.0, &q).unwrap();
    assert_eq!(gauge.get(&q).unwrap(), 7.0);

    let text = metrics.metrics().unwrap();
    assert!(text.contains("hits_counter 3"));
    assert!(text.contains("queue_gauge{name=\"jobs\"} 7"));
}
