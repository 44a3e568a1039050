//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 엔진은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logwarden_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logwarden_core::metrics::ENGINE_ALERTS_CREATED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 규칙명 레이블 키
pub const LABEL_RULE: &str = "rule";

/// 알림 유형 레이블 키 (BRUTE_FORCE, ERROR_LOG 등)
pub const LABEL_ALERT_TYPE: &str = "alert_type";

/// 심각도 레이블 키 (LOW, MEDIUM, HIGH, CRITICAL)
pub const LABEL_LEVEL: &str = "level";

/// 트리거 경로 레이블 키 (event, sweep)
pub const LABEL_TRIGGER: &str = "trigger";

// ─── Alert Engine 메트릭 ────────────────────────────────────────────

/// Engine: 수행된 평가 횟수 (counter, label: trigger)
pub const ENGINE_SCANS_TOTAL: &str = "logwarden_engine_scans_total";

/// Engine: 규칙이 낸 제안 수 (counter, label: rule)
pub const ENGINE_PROPOSALS_TOTAL: &str = "logwarden_engine_proposals_total";

/// Engine: 새로 생성된 알림 수 (counter, labels: alert_type, level)
pub const ENGINE_ALERTS_CREATED_TOTAL: &str = "logwarden_engine_alerts_created_total";

/// Engine: 기존 알림에 병합된 발화 수 (counter, label: alert_type)
pub const ENGINE_ALERTS_MERGED_TOTAL: &str = "logwarden_engine_alerts_merged_total";

/// Engine: 규칙 평가 실패 수 (counter, label: rule)
pub const ENGINE_RULE_FAILURES_TOTAL: &str = "logwarden_engine_rule_failures_total";

/// Engine: 알림 저장 실패 수 (counter, label: alert_type)
pub const ENGINE_STORE_FAILURES_TOTAL: &str = "logwarden_engine_store_failures_total";

/// Engine: 한 번의 평가에 걸린 시간 (histogram, 초)
pub const ENGINE_SCAN_DURATION_SECONDS: &str = "logwarden_engine_scan_duration_seconds";

/// Engine: 상관 키 락 테이블 크기 (gauge)
pub const ENGINE_KEY_LOCKS: &str = "logwarden_engine_key_locks";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 평가 소요 시간 히스토그램 버킷 (초)
///
/// 100us ~ 10s 범위, 로그 단위 분포
pub const SCAN_DURATION_BUCKETS: [f64; 10] = [
    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 10.0,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// `metrics::describe_counter!()` 등을 호출하여 Prometheus HELP 텍스트를
/// 설정합니다. 전역 레코더 설치 후 한 번만 호출해야 하며, 일반적으로
/// 엔진을 임베드하는 서비스의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        ENGINE_SCANS_TOTAL,
        "Total number of engine evaluations (event-triggered and scheduled)"
    );
    describe_counter!(
        ENGINE_PROPOSALS_TOTAL,
        "Total number of alert proposals emitted by detection rules"
    );
    describe_counter!(
        ENGINE_ALERTS_CREATED_TOTAL,
        "Total number of newly created alert records"
    );
    describe_counter!(
        ENGINE_ALERTS_MERGED_TOTAL,
        "Total number of rule firings merged into an existing open alert"
    );
    describe_counter!(
        ENGINE_RULE_FAILURES_TOTAL,
        "Total number of failed rule evaluations"
    );
    describe_counter!(
        ENGINE_STORE_FAILURES_TOTAL,
        "Total number of alert store failures during create/update"
    );
    describe_histogram!(
        ENGINE_SCAN_DURATION_SECONDS,
        "Time to complete a single engine evaluation in seconds"
    );
    describe_gauge!(
        ENGINE_KEY_LOCKS,
        "Number of correlation-key advisory locks currently tracked"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        ENGINE_SCANS_TOTAL,
        ENGINE_PROPOSALS_TOTAL,
        ENGINE_ALERTS_CREATED_TOTAL,
        ENGINE_ALERTS_MERGED_TOTAL,
        ENGINE_RULE_FAILURES_TOTAL,
        ENGINE_STORE_FAILURES_TOTAL,
        ENGINE_SCAN_DURATION_SECONDS,
        ENGINE_KEY_LOCKS,
    ];

    #[test]
    fn all_metrics_start_with_logwarden_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("logwarden_"),
                "Metric '{}' does not start with 'logwarden_' prefix",
                name
            );
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // describe_all() should not panic even without a recorder installed
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        let labels = [LABEL_RULE, LABEL_ALERT_TYPE, LABEL_LEVEL, LABEL_TRIGGER];
        for label in &labels {
            assert_eq!(
                label.to_lowercase(),
                *label,
                "Label key '{}' should be lowercase",
                label
            );
        }
    }

    #[test]
    fn scan_duration_buckets_are_sorted() {
        let buckets = SCAN_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
