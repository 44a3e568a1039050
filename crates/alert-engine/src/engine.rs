//! 엔진 오케스트레이션 — 규칙 실행과 병합 정책 적용
//!
//! [`AlertEngine`]은 고정된 순서의 규칙 목록과 스토어 핸들을 소유합니다.
//! 호출 경로는 둘입니다: 새 로그 저장 직후의 [`run_on_event`]와
//! 주기 스캔의 [`run_scheduled`]. 두 경로 모두 모든 규칙을 실행하고,
//! 각 제안을 키 단위 어드바이저리 락 아래에서 병합 정책에 넘긴 뒤,
//! 생성/병합된 알림과 규칙 단위 실패를 [`EngineReport`]로 돌려줍니다.
//!
//! 규칙 순서는 정확성에 영향을 주지 않습니다 — 규칙은 서로 독립적이고
//! 키가 분리되어 있습니다. 한 규칙의 실패는 다른 규칙을 막지 않습니다.
//!
//! [`run_on_event`]: AlertEngine::run_on_event
//! [`run_scheduled`]: AlertEngine::run_scheduled

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Instant, SystemTime};

use metrics::{counter, gauge, histogram};
use tracing::{info, warn};

use logwarden_core::metrics::{
    ENGINE_ALERTS_CREATED_TOTAL, ENGINE_ALERTS_MERGED_TOTAL, ENGINE_KEY_LOCKS,
    ENGINE_PROPOSALS_TOTAL, ENGINE_RULE_FAILURES_TOTAL, ENGINE_SCANS_TOTAL,
    ENGINE_SCAN_DURATION_SECONDS, ENGINE_STORE_FAILURES_TOTAL, LABEL_ALERT_TYPE, LABEL_LEVEL,
    LABEL_RULE, LABEL_TRIGGER,
};
use logwarden_core::store::{AlertStore, ConfigStore, LogStore};
use logwarden_core::types::{Alert, AlertType, CorrelationKey};

use crate::config::EngineConfig;
use crate::dedup::{self, MergeOutcome};
use crate::error::AlertEngineError;
use crate::rule::{
    AlertProposal, AlertRule, BruteForceRule, ErrorLogRule, EvalContext, EvaluationTrigger,
    SuspiciousAccessRule,
};

/// 규칙 단위 실패 보고
#[derive(Debug)]
pub struct RuleFailure {
    /// 실패한 규칙명
    pub rule: String,
    /// 실패 원인
    pub error: AlertEngineError,
}

/// 한 번의 평가 결과
///
/// 빈 보고서는 정상적인 결과입니다 — "알림 없음"은 에러가 아닙니다.
#[derive(Debug, Default)]
pub struct EngineReport {
    /// 이번 평가에서 생성되거나 병합된 알림
    pub alerts: Vec<Alert>,
    /// 규칙 평가 실패와 제안 단위 저장 실패
    pub failures: Vec<RuleFailure>,
}

impl EngineReport {
    /// 알림도 실패도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty() && self.failures.is_empty()
    }
}

type KeyLockTable = HashMap<(AlertType, CorrelationKey), Arc<Mutex<()>>>;

/// 알림 상관분석 엔진
///
/// # 사용 예시
/// ```ignore
/// let engine = AlertEngineBuilder::new()
///     .log_store(logs)
///     .alert_store(alerts)
///     .config_store(settings)
///     .with_default_rules()
///     .build()?;
///
/// let report = engine.run_on_event(log_id);
/// ```
pub struct AlertEngine {
    config: EngineConfig,
    rules: Vec<Box<dyn AlertRule>>,
    logs: Arc<dyn LogStore>,
    alerts: Arc<dyn AlertStore>,
    settings: Arc<dyn ConfigStore>,
    /// 상관 키 단위 어드바이저리 락 — 병합의 읽기-확인-쓰기를 직렬화
    key_locks: Mutex<KeyLockTable>,
}

impl AlertEngine {
    /// 엔진 설정을 반환합니다.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 등록된 규칙 수를 반환합니다.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 새 로그 이벤트에 대해 평가를 수행합니다 (이벤트 경로).
    pub fn run_on_event(&self, log_id: i64) -> EngineReport {
        self.run(EvaluationTrigger::Record { log_id })
    }

    /// 주기 스캔 평가를 수행합니다 (스케줄러 경로).
    pub fn run_scheduled(&self) -> EngineReport {
        self.run(EvaluationTrigger::Sweep)
    }

    fn run(&self, trigger: EvaluationTrigger) -> EngineReport {
        let scan_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "alert_scan",
            scan_id = %scan_id,
            trigger = trigger.as_str(),
        );
        let _enter = span.enter();
        let started = Instant::now();
        counter!(ENGINE_SCANS_TOTAL, LABEL_TRIGGER => trigger.as_str()).increment(1);

        // 평가 기준 시각은 한 번만 읽어 모든 규칙과 병합에 공유
        let now = SystemTime::now();
        let ctx = EvalContext {
            logs: &*self.logs,
            config: &*self.settings,
            now,
        };

        let mut report = EngineReport::default();
        for rule in &self.rules {
            let proposals = match rule.evaluate(&ctx, &trigger) {
                Ok(proposals) => proposals,
                Err(error) => {
                    warn!(rule = rule.name(), %error, "rule evaluation failed");
                    counter!(ENGINE_RULE_FAILURES_TOTAL, LABEL_RULE => rule.name().to_owned())
                        .increment(1);
                    report.failures.push(RuleFailure {
                        rule: rule.name().to_owned(),
                        error,
                    });
                    continue;
                }
            };

            for proposal in proposals {
                counter!(ENGINE_PROPOSALS_TOTAL, LABEL_RULE => rule.name().to_owned())
                    .increment(1);
                match self.apply_proposal(&proposal, now) {
                    Ok(MergeOutcome::Created(alert)) => {
                        info!(
                            alert_id = alert.id,
                            alert_type = %alert.alert_type,
                            level = %alert.level,
                            key = %proposal.key,
                            "alert created"
                        );
                        counter!(
                            ENGINE_ALERTS_CREATED_TOTAL,
                            LABEL_ALERT_TYPE => alert.alert_type.as_str(),
                            LABEL_LEVEL => alert.level.to_string()
                        )
                        .increment(1);
                        report.alerts.push(alert);
                    }
                    Ok(MergeOutcome::Merged(alert)) => {
                        info!(
                            alert_id = alert.id,
                            trigger_count = alert.trigger_count,
                            key = %proposal.key,
                            "alert merged into open record"
                        );
                        counter!(
                            ENGINE_ALERTS_MERGED_TOTAL,
                            LABEL_ALERT_TYPE => alert.alert_type.as_str()
                        )
                        .increment(1);
                        report.alerts.push(alert);
                    }
                    Err(error) => {
                        warn!(key = %proposal.key, %error, "failed to persist proposal");
                        counter!(
                            ENGINE_STORE_FAILURES_TOTAL,
                            LABEL_ALERT_TYPE => proposal.alert_type.as_str()
                        )
                        .increment(1);
                        report.failures.push(RuleFailure {
                            rule: rule.name().to_owned(),
                            error,
                        });
                    }
                }
            }
        }

        histogram!(ENGINE_SCAN_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        report
    }

    /// 키 락을 잡은 채로 병합 정책을 적용합니다.
    fn apply_proposal(
        &self,
        proposal: &AlertProposal,
        now: SystemTime,
    ) -> Result<MergeOutcome, AlertEngineError> {
        let lock = self.key_lock(proposal.alert_type, &proposal.key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        dedup::apply(
            &*self.alerts,
            proposal,
            now,
            self.config.merge_retry_limit,
        )
    }

    /// `(alert_type, key)`에 대한 락 핸들을 가져오거나 만듭니다.
    fn key_lock(&self, alert_type: AlertType, key: &CorrelationKey) -> Arc<Mutex<()>> {
        let mut locks = self
            .key_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // 메모리 성장 제한: 현재 잡혀 있지 않은 락을 정리
        if locks.len() >= self.config.max_key_locks {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        gauge!(ENGINE_KEY_LOCKS).set(locks.len() as f64);

        locks
            .entry((alert_type, key.clone()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// 알림 엔진 빌더
///
/// 스토어 핸들과 규칙 목록을 구성합니다. 스토어 세 개는 필수입니다.
pub struct AlertEngineBuilder {
    config: EngineConfig,
    rules: Vec<Box<dyn AlertRule>>,
    logs: Option<Arc<dyn LogStore>>,
    alerts: Option<Arc<dyn AlertStore>>,
    settings: Option<Arc<dyn ConfigStore>>,
}

impl AlertEngineBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            rules: Vec::new(),
            logs: None,
            alerts: None,
            settings: None,
        }
    }

    /// 엔진 설정을 지정합니다.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 로그 저장소를 지정합니다.
    pub fn log_store(mut self, store: Arc<dyn LogStore>) -> Self {
        self.logs = Some(store);
        self
    }

    /// 알림 저장소를 지정합니다.
    pub fn alert_store(mut self, store: Arc<dyn AlertStore>) -> Self {
        self.alerts = Some(store);
        self
    }

    /// 런타임 설정 저장소를 지정합니다.
    pub fn config_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.settings = Some(store);
        self
    }

    /// 규칙을 추가합니다 (추가 순서대로 실행).
    pub fn rule(mut self, rule: Box<dyn AlertRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// 기본 규칙 세트를 등록합니다:
    /// 무차별 대입, ERROR 로그, 의심 접근.
    pub fn with_default_rules(self) -> Self {
        self.rule(Box::new(BruteForceRule::new()))
            .rule(Box::new(ErrorLogRule::new()))
            .rule(Box::new(SuspiciousAccessRule::new()))
    }

    /// 설정을 검증하고 엔진을 만듭니다.
    pub fn build(self) -> Result<AlertEngine, AlertEngineError> {
        self.config.validate()?;

        let logs = self.logs.ok_or_else(|| AlertEngineError::Config {
            field: "log_store".to_owned(),
            reason: "log store is required".to_owned(),
        })?;
        let alerts = self.alerts.ok_or_else(|| AlertEngineError::Config {
            field: "alert_store".to_owned(),
            reason: "alert store is required".to_owned(),
        })?;
        let settings = self.settings.ok_or_else(|| AlertEngineError::Config {
            field: "config_store".to_owned(),
            reason: "config store is required".to_owned(),
        })?;

        Ok(AlertEngine {
            config: self.config,
            rules: self.rules,
            logs,
            alerts,
            settings,
            key_locks: Mutex::new(HashMap::new()),
        })
    }
}

impl Default for AlertEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
