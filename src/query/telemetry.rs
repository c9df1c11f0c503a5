use bson::Document as BsonDocument;
use parking_lot::RwLock;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

pub const AUDIT_TARGET: &str = "querygate::audit";
pub const METRICS_TARGET: &str = "querygate::metrics";

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub slow_query_ms: u64,
    pub structured_json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        let slow = std::env::var("QUERYGATE_SLOW_QUERY_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(500);
        Self { slow_query_ms: slow, structured_json: true }
    }
}

#[derive(Default)]
pub struct Metrics {
    pub queries_total: AtomicU64,
    pub queries_slow_total: AtomicU64,
    pub rejected_total: AtomicU64,
    pub redacted_fields_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queries_total: u64,
    pub queries_slow_total: u64,
    pub rejected_total: u64,
    pub redacted_fields_total: u64,
}

#[derive(Default)]
pub struct Telemetry {
    pub cfg: RwLock<TelemetryConfig>,
    pub metrics: Metrics,
}

pub(crate) static TELEMETRY: LazyLock<Telemetry> = LazyLock::new(Telemetry::default);

/// Queries at or above this duration count as slow. Defaults to `QUERYGATE_SLOW_QUERY_MS` or 500.
pub fn set_slow_query_ms(ms: u64) {
    TELEMETRY.cfg.write().slow_query_ms = ms;
}

/// Metrics lines as JSON objects (default) or `key=value` pairs.
pub fn set_structured_json(enabled: bool) {
    TELEMETRY.cfg.write().structured_json = enabled;
}

#[must_use]
pub fn snapshot() -> MetricsSnapshot {
    let m = &TELEMETRY.metrics;
    MetricsSnapshot {
        queries_total: m.queries_total.load(Ordering::Relaxed),
        queries_slow_total: m.queries_slow_total.load(Ordering::Relaxed),
        rejected_total: m.rejected_total.load(Ordering::Relaxed),
        redacted_fields_total: m.redacted_fields_total.load(Ordering::Relaxed),
    }
}

fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut h = Sha256::new();
    h.update(input.as_bytes());
    hex::encode(h.finalize())
}

/// Stable fingerprint of a filter, so rejected filters can be correlated without logging them.
#[must_use]
pub fn filter_hash(filter: &BsonDocument) -> String {
    sha256_hex(&filter.to_string())
}

pub fn log_query(collection: &str, op: &str, duration_ms: u128, returned: usize, total: Option<u64>) {
    TELEMETRY.metrics.queries_total.fetch_add(1, Ordering::Relaxed);
    let cfg = TELEMETRY.cfg.read().clone();
    let slow = u64::try_from(duration_ms).map_or(true, |ms| ms >= cfg.slow_query_ms);
    if slow {
        TELEMETRY.metrics.queries_slow_total.fetch_add(1, Ordering::Relaxed);
    }
    if cfg.structured_json {
        let line = serde_json::json!({
            "ts": now_ts(),
            "collection": collection,
            "op": op,
            "duration_ms": u64::try_from(duration_ms).unwrap_or(u64::MAX),
            "returned": returned,
            "total": total,
            "slow": slow,
        });
        log::info!(target: METRICS_TARGET, "{line}");
    } else {
        log::info!(
            target: METRICS_TARGET,
            "collection={collection} op={op} duration_ms={duration_ms} returned={returned} total={total:?} slow={slow}"
        );
    }
}

pub fn log_restricted_filter(collection: &str, op: &str, operator: &str, filter: &BsonDocument) {
    TELEMETRY.metrics.rejected_total.fetch_add(1, Ordering::Relaxed);
    log::warn!(
        target: AUDIT_TARGET,
        "{}",
        serde_json::json!({
            "ts": now_ts(),
            "collection": collection,
            "op": op,
            "reason": "restricted_operator",
            "operator": operator,
            "filter_hash": filter_hash(filter),
        })
    );
}

pub fn log_rejected(collection: &str, op: &str, kind: &str) {
    TELEMETRY.metrics.rejected_total.fetch_add(1, Ordering::Relaxed);
    log::warn!(
        target: AUDIT_TARGET,
        "{}",
        serde_json::json!({ "ts": now_ts(), "collection": collection, "op": op, "reason": kind })
    );
}

pub fn record_redactions(n: usize) {
    if n > 0 {
        TELEMETRY
            .metrics
            .redacted_fields_total
            .fetch_add(u64::try_from(n).unwrap_or(u64::MAX), Ordering::Relaxed);
    }
}
