//! 무차별 대입 탐지 규칙
//!
//! 윈도우 내 같은 IP에서 발생한 로그인 실패 횟수가 임계값 이상이면
//! `(BRUTE_FORCE, ip)` 키의 알림을 제안합니다. 임계값과 윈도우는
//! 런타임 설정에서 읽고, 없으면 기본값(5회 / 5분)을 사용합니다.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use logwarden_core::store::LogQuery;
use logwarden_core::types::{AlertLevel, AlertType, CorrelationKey, LogLevel};

use crate::config::{
    self, DEFAULT_BRUTE_FORCE_THRESHOLD, DEFAULT_BRUTE_FORCE_WINDOW_MINUTES, keys,
};
use crate::error::AlertEngineError;
use crate::pattern::MessagePattern;
use crate::rule::{AlertProposal, AlertRule, EvalContext, EvaluationTrigger};

/// 무차별 대입 탐지 규칙
///
/// 이벤트 경로와 주기 스캔 경로 모두에서 전체 윈도우를 다시 집계합니다.
/// 같은 IP의 열린 알림이 이미 있으면 병합 정책이 횟수를 누적합니다.
pub struct BruteForceRule {
    pattern: MessagePattern,
}

impl BruteForceRule {
    /// 기본 로그인 실패 패턴으로 규칙을 만듭니다.
    pub fn new() -> Self {
        Self {
            pattern: MessagePattern::login_failure(),
        }
    }

    /// 사용자 지정 패턴으로 규칙을 만듭니다.
    pub fn with_pattern(pattern: MessagePattern) -> Self {
        Self { pattern }
    }
}

impl Default for BruteForceRule {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertRule for BruteForceRule {
    fn name(&self) -> &str {
        "brute_force"
    }

    fn evaluate(
        &self,
        ctx: &EvalContext<'_>,
        _trigger: &EvaluationTrigger,
    ) -> Result<Vec<AlertProposal>, AlertEngineError> {
        let threshold = config::get_int(
            ctx.config,
            keys::BRUTE_FORCE_THRESHOLD,
            DEFAULT_BRUTE_FORCE_THRESHOLD,
        );
        let window_minutes = config::get_int(
            ctx.config,
            keys::BRUTE_FORCE_WINDOW_MINUTES,
            DEFAULT_BRUTE_FORCE_WINDOW_MINUTES,
        )
        .max(0) as u64;
        let window = Duration::from_secs(window_minutes * 60);
        let since = ctx
            .now
            .checked_sub(window)
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);

        let records = ctx
            .logs
            .query(&LogQuery::new().since(since).level(LogLevel::Error))
            .map_err(|source| AlertEngineError::EvidenceQuery {
                rule: self.name().to_owned(),
                source,
            })?;

        // IP별 실패 집계 (IP 없는 레코드는 상관 키를 만들 수 없으므로 제외)
        let mut groups: BTreeMap<String, BTreeSet<i64>> = BTreeMap::new();
        for record in &records {
            if !self.pattern.matches(&record.message) {
                continue;
            }
            let Some(ip) = record.ip.clone() else {
                continue;
            };
            groups.entry(ip).or_default().insert(record.id);
        }

        let mut proposals = Vec::new();
        for (ip, log_ids) in groups {
            let fail_count = log_ids.len() as i64;
            if fail_count < threshold {
                continue;
            }

            let level = if fail_count >= threshold.saturating_mul(2) {
                AlertLevel::High
            } else {
                AlertLevel::Medium
            };

            proposals.push(AlertProposal {
                alert_type: AlertType::BruteForce,
                key: CorrelationKey::Ip(ip.clone()),
                level,
                title: format!("Brute force attack detected - IP: {ip}"),
                description: format!(
                    "{fail_count} failed login attempts from {ip} \
                     in the last {window_minutes} minutes"
                ),
                related_ip: Some(ip),
                related_user: None,
                log_ids,
                extra: serde_json::json!({
                    "fail_count": fail_count,
                    "threshold": threshold,
                    "window_minutes": window_minutes,
                }),
                window,
            });
        }

        Ok(proposals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    use logwarden_core::types::LogRecord;

    use crate::memory::{MemoryConfigStore, MemoryLogStore};

    fn failed_login(ip: &str, age_secs: u64) -> LogRecord {
        let now = SystemTime::now();
        LogRecord {
            id: 0,
            source: "web_app".to_owned(),
            level: LogLevel::Error,
            timestamp: now - Duration::from_secs(age_secs),
            ip: Some(ip.to_owned()),
            user: Some("admin".to_owned()),
            message: format!("Login failed for admin from {ip}"),
            raw_data: None,
            created_at: now,
        }
    }

    fn evaluate(
        logs: &MemoryLogStore,
        config: &MemoryConfigStore,
    ) -> Vec<AlertProposal> {
        let ctx = EvalContext {
            logs,
            config,
            now: SystemTime::now(),
        };
        BruteForceRule::new()
            .evaluate(&ctx, &EvaluationTrigger::Sweep)
            .unwrap()
    }

    #[test]
    fn below_threshold_produces_nothing() {
        let logs = MemoryLogStore::new();
        let config = MemoryConfigStore::new();
        for _ in 0..4 {
            logs.insert(failed_login("10.0.0.1", 10));
        }
        assert!(evaluate(&logs, &config).is_empty());
    }

    #[test]
    fn at_threshold_produces_medium_proposal() {
        let logs = MemoryLogStore::new();
        let config = MemoryConfigStore::new();
        for _ in 0..5 {
            logs.insert(failed_login("10.0.0.1", 10));
        }

        let proposals = evaluate(&logs, &config);
        assert_eq!(proposals.len(), 1);
        let proposal = &proposals[0];
        assert_eq!(proposal.alert_type, AlertType::BruteForce);
        assert_eq!(proposal.key, CorrelationKey::Ip("10.0.0.1".to_owned()));
        assert_eq!(proposal.level, AlertLevel::Medium);
        assert_eq!(proposal.log_ids.len(), 5);
        assert_eq!(proposal.extra["fail_count"], 5);
        assert_eq!(proposal.extra["threshold"], 5);
    }

    #[test]
    fn double_threshold_escalates_to_high() {
        let logs = MemoryLogStore::new();
        let config = MemoryConfigStore::new();
        for _ in 0..10 {
            logs.insert(failed_login("10.0.0.1", 10));
        }

        let proposals = evaluate(&logs, &config);
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].level, AlertLevel::High);
    }

    #[test]
    fn events_outside_window_are_ignored() {
        let logs = MemoryLogStore::new();
        let config = MemoryConfigStore::new();
        // 기본 윈도우는 5분 — 10분 전 실패는 집계되지 않음
        for _ in 0..3 {
            logs.insert(failed_login("10.0.0.1", 600));
        }
        for _ in 0..3 {
            logs.insert(failed_login("10.0.0.1", 10));
        }
        assert!(evaluate(&logs, &config).is_empty());
    }

    #[test]
    fn groups_are_per_ip() {
        let logs = MemoryLogStore::new();
        let config = MemoryConfigStore::new();
        for _ in 0..5 {
            logs.insert(failed_login("10.0.0.1", 10));
        }
        for _ in 0..5 {
            logs.insert(failed_login("10.0.0.2", 10));
        }
        for _ in 0..2 {
            logs.insert(failed_login("10.0.0.3", 10));
        }

        let proposals = evaluate(&logs, &config);
        assert_eq!(proposals.len(), 2);
        let ips: Vec<_> = proposals
            .iter()
            .filter_map(|p| p.related_ip.as_deref())
            .collect();
        assert_eq!(ips, vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn records_without_ip_are_skipped() {
        let logs = MemoryLogStore::new();
        let config = MemoryConfigStore::new();
        for _ in 0..5 {
            let mut record = failed_login("10.0.0.1", 10);
            record.ip = None;
            logs.insert(record);
        }
        assert!(evaluate(&logs, &config).is_empty());
    }

    #[test]
    fn non_matching_messages_are_skipped() {
        let logs = MemoryLogStore::new();
        let config = MemoryConfigStore::new();
        for _ in 0..5 {
            let mut record = failed_login("10.0.0.1", 10);
            record.message = "disk full".to_owned();
            logs.insert(record);
        }
        assert!(evaluate(&logs, &config).is_empty());
    }

    #[test]
    fn configured_threshold_overrides_default() {
        let logs = MemoryLogStore::new();
        let config = MemoryConfigStore::new();
        config.set(keys::BRUTE_FORCE_THRESHOLD, "3");
        for _ in 0..3 {
            logs.insert(failed_login("10.0.0.1", 10));
        }

        let proposals = evaluate(&logs, &config);
        assert_eq!(proposals.len(), 1);
        // 3회는 임계값 3의 정확히 1배 — MEDIUM, 2배인 6회부터 HIGH
        assert_eq!(proposals[0].level, AlertLevel::Medium);
    }

    #[test]
    fn malformed_threshold_falls_back_to_default() {
        let logs = MemoryLogStore::new();
        let config = MemoryConfigStore::new();
        config.set(keys::BRUTE_FORCE_THRESHOLD, "abc");
        for _ in 0..4 {
            logs.insert(failed_login("10.0.0.1", 10));
        }
        // 기본 임계값 5가 적용되어 4회로는 발화하지 않음
        assert!(evaluate(&logs, &config).is_empty());
    }

    #[test]
    fn configured_window_overrides_default() {
        let logs = MemoryLogStore::new();
        let config = MemoryConfigStore::new();
        config.set(keys::BRUTE_FORCE_WINDOW_MINUTES, "30");
        for _ in 0..5 {
            logs.insert(failed_login("10.0.0.1", 600)); // 10분 전
        }

        let proposals = evaluate(&logs, &config);
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].window, Duration::from_secs(30 * 60));
    }

    #[test]
    fn runs_on_event_trigger_too() {
        let logs = MemoryLogStore::new();
        let config = MemoryConfigStore::new();
        let mut last = 0;
        for _ in 0..5 {
            last = logs.insert(failed_login("10.0.0.1", 10));
        }
        let ctx = EvalContext {
            logs: &logs,
            config: &config,
            now: SystemTime::now(),
        };
        let proposals = BruteForceRule::new()
            .evaluate(&ctx, &EvaluationTrigger::Record { log_id: last })
            .unwrap();
        assert_eq!(proposals.len(), 1);
    }
}
