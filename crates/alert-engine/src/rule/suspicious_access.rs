//! 의심 접근 탐지 규칙
//!
//! 고정 30분 윈도우 안에서 한 사용자가 로그인에 성공한 distinct IP 수를
//! 집계하여, 3개를 초과하면 `(SUSPICIOUS_ACCESS, user)` 키의 알림을
//! 제안합니다. 주기 스캔 경로에서만 동작합니다.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use logwarden_core::store::LogQuery;
use logwarden_core::types::{AlertLevel, AlertType, CorrelationKey};

use crate::error::AlertEngineError;
use crate::pattern::MessagePattern;
use crate::rule::{AlertProposal, AlertRule, EvalContext, EvaluationTrigger};

/// 스캔 윈도우 (고정 30분)
const SWEEP_WINDOW: Duration = Duration::from_secs(30 * 60);

/// distinct IP 임계값 — 이 값을 초과하면 발화
const DISTINCT_IP_THRESHOLD: usize = 3;

/// 의심 접근 탐지 규칙
///
/// 짧은 시간 안에 여러 IP에서 같은 계정으로 로그인한 경우를 찾습니다.
pub struct SuspiciousAccessRule {
    pattern: MessagePattern,
}

impl SuspiciousAccessRule {
    /// 기본 로그인 성공 패턴으로 규칙을 만듭니다.
    pub fn new() -> Self {
        Self {
            pattern: MessagePattern::login_success(),
        }
    }

    /// 사용자 지정 패턴으로 규칙을 만듭니다.
    pub fn with_pattern(pattern: MessagePattern) -> Self {
        Self { pattern }
    }
}

impl Default for SuspiciousAccessRule {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertRule for SuspiciousAccessRule {
    fn name(&self) -> &str {
        "suspicious_access"
    }

    fn evaluate(
        &self,
        ctx: &EvalContext<'_>,
        trigger: &EvaluationTrigger,
    ) -> Result<Vec<AlertProposal>, AlertEngineError> {
        // 윈도우 전체를 훑는 규칙이므로 주기 스캔 경로에서만 동작
        if *trigger != EvaluationTrigger::Sweep {
            return Ok(Vec::new());
        }

        let since = ctx
            .now
            .checked_sub(SWEEP_WINDOW)
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);

        let records = ctx
            .logs
            .query(&LogQuery::new().since(since))
            .map_err(|source| AlertEngineError::EvidenceQuery {
                rule: self.name().to_owned(),
                source,
            })?;

        // 사용자별 (distinct IP, 증거 로그 ID) 집계
        // 사용자나 IP가 없는 레코드는 집계할 수 없으므로 제외
        let mut groups: BTreeMap<String, (BTreeSet<String>, BTreeSet<i64>)> = BTreeMap::new();
        for record in &records {
            if !self.pattern.matches(&record.message) {
                continue;
            }
            let (Some(user), Some(ip)) = (record.user.clone(), record.ip.clone()) else {
                continue;
            };
            let entry = groups.entry(user).or_default();
            entry.0.insert(ip);
            entry.1.insert(record.id);
        }

        let mut proposals = Vec::new();
        for (user, (ips, log_ids)) in groups {
            if ips.len() <= DISTINCT_IP_THRESHOLD {
                continue;
            }

            let ip_list: Vec<String> = ips.into_iter().collect();
            proposals.push(AlertProposal {
                alert_type: AlertType::SuspiciousAccess,
                key: CorrelationKey::User(user.clone()),
                level: AlertLevel::High,
                title: format!("Suspicious access - user: {user}"),
                description: format!(
                    "user {user} logged in from {} distinct IPs within 30 minutes: {}",
                    ip_list.len(),
                    ip_list.join(", "),
                ),
                related_ip: None,
                related_user: Some(user),
                log_ids,
                extra: serde_json::json!({
                    "ip_count": ip_list.len(),
                    "ip_list": ip_list,
                }),
                window: SWEEP_WINDOW,
            });
        }

        Ok(proposals)
    }
}
