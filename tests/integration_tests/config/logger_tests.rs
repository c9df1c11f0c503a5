use querygate::logger;
use querygate::query::telemetry;

#[test]
fn logger_config_builds_rolling_appenders() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("logs");
    logger::build_config(Some(&base), Some("debug"), Some(3)).unwrap();
    assert!(base.is_dir());
}

#[tokio::test]
async fn rejected_requests_are_counted() {
    use crate::integration_tests::support::product_engine;
    let before = telemetry::snapshot();
    let e = product_engine();
    let _ = e.find(None, true, None).await;
    let _ = e.find_by_id("nope", None, true, None).await;
    let after = telemetry::snapshot();
    assert!(after.rejected_total >= before.rejected_total + 2);
}
