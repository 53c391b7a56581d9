#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use obskit_core::{label_values, ErrorCode, LabelValues, ObsError};
use obskit_metrics::{
    MeasureKind, MeasureOptions, Metrics, MetricsConfig, RemoveEntriesOptions, SummaryOptions,
    TimeMeasureOptions,
};

fn none() -> LabelValues {
    LabelValues::new()
}

#[tokio::test]
async fn init_without_options_uses_defaults() {
    let metrics = Metrics::new();
    metrics.init(MetricsConfig::default()).await.unwrap();
    let cfg = metrics.config();
    assert!(!cfg.collect_default);
    assert_eq!(cfg.server.path, "/metrics");
    assert!(metrics.is_empty());
    assert!(metrics.local_addr().await.is_none());
}

#[tokio::test]
async fn init_rejects_invalid_config() {
    let metrics = Metrics::new();
    let err = metrics
        .init(MetricsConfig::default().with_path("no-slash"))
        .await
        .expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::Validation);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn collect_default_registers_process_metrics() {
    let metrics = Metrics::new();
    metrics
        .init(MetricsConfig::default().with_collect_default(true))
        .await
        .unwrap();
    assert!(metrics.metrics().unwrap().contains("process_"));
}

#[tokio::test]
async fn init_resets_measures() {
    let metrics = Metrics::new();
    metrics.add_counter_measure(MeasureOptions::new("m1")).unwrap();
    assert_eq!(metrics.len(), 1);

    metrics.init(MetricsConfig::default()).await.unwrap();
    assert!(metrics.is_empty());
    assert!(metrics.get("m1").unwrap().is_none());
    metrics.add_counter_measure(MeasureOptions::new("m1")).unwrap();
}

#[test]
fn add_requires_name() {
    let metrics = Metrics::new();
    let err = metrics.add_time_measure(MeasureOptions::default()).unwrap_err();
    assert!(matches!(err, ObsError::Validation(_)));
}

#[test]
fn duplicate_names_conflict_for_every_kind() {
    let metrics = Metrics::new();

    metrics.add_time_measure(MeasureOptions::new("t")).unwrap();
    let err = metrics.add_time_measure(MeasureOptions::new("t")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NameConflict);

    metrics.add_counter_measure(MeasureOptions::new("c")).unwrap();
    let err = metrics.add_counter_measure(MeasureOptions::new("c")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NameConflict);

    metrics.add_gauge_measure(MeasureOptions::new("g")).unwrap();
    let err = metrics.add_gauge_measure(MeasureOptions::new("g")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NameConflict);

    metrics.add_summary_measure(MeasureOptions::new("s")).unwrap();
    let err = metrics.add_summary_measure(MeasureOptions::new("s")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NameConflict);

    // names are shared across kinds
    let err = metrics.add_gauge_measure(MeasureOptions::new("t")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NameConflict);
    assert_eq!(metrics.len(), 4);
}

#[test]
fn get_by_name() {
    let metrics = Metrics::new();
    let added = metrics
        .add_time_measure(MeasureOptions::new("m1").labels(["l1", "l2"]))
        .unwrap();
    let found = metrics.get("m1").unwrap().expect("registered");
    assert_eq!(found.kind(), MeasureKind::Time);
    assert!(std::sync::Arc::ptr_eq(found.as_time().unwrap(), &added));
    assert!(found.as_counter().is_none());
}

#[test]
fn get_without_name_is_argument_error() {
    let metrics = Metrics::new();
    assert_eq!(metrics.get("").unwrap_err().code(), ErrorCode::Argument);
}

#[test]
fn get_unknown_name_is_none() {
    let metrics = Metrics::new();
    assert!(metrics.get("m1").unwrap().is_none());
}

#[tokio::test]
async fn prefix_is_applied_to_exported_series() {
    let metrics = Metrics::new();
    metrics
        .init(MetricsConfig::default().with_prefix("hkube_"))
        .await
        .unwrap();
    let counter = metrics.add_counter_measure(MeasureOptions::new("m1")).unwrap();
    counter.inc(&none()).unwrap();

    assert_eq!(counter.series_name(), "hkube_m1_counter");
    assert!(metrics.metrics().unwrap().contains("hkube_m1_counter 1"));
    let found = metrics.get("m1").unwrap().expect("found without prefix");
    assert_eq!(found.name(), "hkube_m1");
    assert_eq!(metrics.names(), vec!["hkube_m1".to_string()]);
}

#[test]
fn remove_measure_releases_series() {
    let metrics = Metrics::new();
    let measure = metrics
        .add_time_measure(MeasureOptions::new("m1").labels(["l1", "l2"]))
        .unwrap();
    measure
        .retroactive(obskit_metrics::RetroactiveOptions::new(12.0))
        .unwrap();
    assert!(metrics.metrics().unwrap().contains("m1_histogram"));

    metrics.remove_measure("m1");
    assert!(metrics.is_empty());
    assert!(!metrics.metrics().unwrap().contains("m1_histogram"));

    metrics.add_time_measure(MeasureOptions::new("m1")).unwrap();
}

#[test]
fn removed_name_can_be_redefined() {
    let metrics = Metrics::new();
    let counter = metrics
        .add_counter_measure(MeasureOptions::new("jobs").labels(["jobId"]).description("jobs run"))
        .unwrap();
    counter.inc(&label_values([("jobId", "a")])).unwrap();
    metrics.remove_measure("jobs");

    let counter = metrics
        .add_counter_measure(
            MeasureOptions::new("jobs")
                .labels(["pipeline", "status"])
                .description("jobs per pipeline"),
        )
        .unwrap();
    counter
        .inc(&label_values([("pipeline", "p1"), ("status", "ok")]))
        .unwrap();

    let text = metrics.metrics().unwrap();
    assert!(text.contains("# HELP jobs_counter jobs per pipeline"));
    assert!(text.contains("jobs_counter{pipeline=\"p1\",status=\"ok\"} 1"));
    assert!(!text.contains("jobId"));
}

#[test]
fn removed_time_measure_can_be_redefined_with_other_labels() {
    let metrics = Metrics::new();
    metrics
        .add_time_measure(MeasureOptions::new("m1").labels(["l1", "l2"]))
        .unwrap();
    metrics.remove_measure("m1");

    let measure = metrics
        .add_time_measure(MeasureOptions::new("m1").labels(["l3"]).description("other"))
        .unwrap();
    measure
        .retroactive(obskit_metrics::RetroactiveOptions::new(5.0).label_values(label_values([("l3", "x")])))
        .unwrap();
    assert!(metrics
        .metrics()
        .unwrap()
        .contains("m1_histogram_count{l3=\"x\"} 1"));
}

#[test]
fn removed_handle_no_longer_exports() {
    let metrics = Metrics::new();
    let counter = metrics.add_counter_measure(MeasureOptions::new("stale")).unwrap();
    metrics.remove_measure("stale");
    counter.inc(&none()).unwrap();
    assert!(!metrics.metrics().unwrap().contains("stale_counter"));
}

#[test]
fn remove_unknown_measure_is_noop() {
    let metrics = Metrics::new();
    metrics.remove_measure("missing");
    assert!(metrics.is_empty());
}

#[test]
fn remove_entries_keeps_other_label_values() {
    let metrics = Metrics::new();
    let counter = metrics
        .add_counter_measure(MeasureOptions::new("jobs").labels(["jobId", "status"]))
        .unwrap();
    let gauge = metrics
        .add_gauge_measure(MeasureOptions::new("load").labels(["jobId"]))
        .unwrap();
    counter.inc(&label_values([("jobId", "a"), ("status", "ok")])).unwrap();
    counter.inc(&label_values([("jobId", "a"), ("status", "err")])).unwrap();
    counter.inc(&label_values([("jobId", "b"), ("status", "ok")])).unwrap();
    gauge.set(3.0, &label_values([("jobId", "a")])).unwrap();
    gauge.set(4.0, &label_values([("jobId", "b")])).unwrap();

    metrics.remove_measure_entries(&RemoveEntriesOptions {
        label_name: "jobId".into(),
        label_value: "a".into(),
        metrics_to_remove: vec!["jobs".into(), "load".into(), "not_registered".into()],
    });

    let text = metrics.metrics().unwrap();
    assert!(!text.contains("jobId=\"a\""));
    assert!(text.contains("jobs_counter{jobId=\"b\",status=\"ok\"} 1"));
    assert!(text.contains("load_gauge{jobId=\"b\"} 4"));
    assert_eq!(metrics.len(), 2);
}

#[test]
fn undeclared_label_is_rejected() {
    let metrics = Metrics::new();
    let counter = metrics
        .add_counter_measure(MeasureOptions::new("c").labels(["l1"]))
        .unwrap();
    let err = counter.inc(&label_values([("other", 1)])).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Validation);
}

#[test]
fn invalid_effective_name_is_rejected() {
    let metrics = Metrics::new();
    let err = metrics
        .add_counter_measure(MeasureOptions::new("bad-name"))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Validation);
}

#[test]
fn custom_buckets_and_description_are_exported() {
    let metrics = Metrics::new();
    let measure = metrics
        .add_time_measure(
            TimeMeasureOptions::from(MeasureOptions::new("q").description("queue wait"))
                .buckets(obskit_metrics::buckets::arithmetic(3, 10.0, 10.0)),
        )
        .unwrap();
    measure
        .retroactive(obskit_metrics::RetroactiveOptions::new(15.0))
        .unwrap();

    let text = metrics.metrics().unwrap();
    assert!(text.contains("# HELP q_histogram queue wait"));
    assert!(text.contains("q_histogram_bucket{le=\"10\"} 0"));
    assert!(text.contains("q_histogram_bucket{le=\"20\"} 1"));
    assert!(text.contains("q_histogram_bucket{le=\"30\"} 1"));
}

#[test]
fn summary_with_custom_percentiles() {
    let metrics = Metrics::new();
    let summary = metrics
        .add_summary_measure(SummaryOptions::from(MeasureOptions::new("lat")).percentiles(vec![0.5]))
        .unwrap();
    assert_eq!(summary.percentiles(), &[0.5]);
}
