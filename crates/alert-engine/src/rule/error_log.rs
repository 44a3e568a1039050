//! ERROR 로그 알림 규칙
//!
//! 새로 저장된 로그 레코드가 ERROR 레벨이면 그 레코드 하나를 키로 하는
//! 알림을 제안합니다. 키가 이벤트 단위이므로 ERROR 이벤트마다 독립된
//! 알림이 만들어지며, 이벤트 간 병합은 일어나지 않습니다.

use std::collections::BTreeSet;
use std::time::Duration;

use logwarden_core::types::{AlertLevel, AlertType, CorrelationKey, LogLevel};

use crate::config::{self, DEFAULT_ERROR_LOG_ENABLED, keys};
use crate::error::AlertEngineError;
use crate::rule::{AlertProposal, AlertRule, EvalContext, EvaluationTrigger};

/// 알림 설명에 싣는 메시지 발췌 길이 (문자 수)
const MESSAGE_EXCERPT_CHARS: usize = 200;

/// 병합 매칭 윈도우
///
/// 키가 이벤트 단위이므로 다른 이벤트와는 어떤 윈도우에서도 병합되지
/// 않습니다. 윈도우를 두는 이유는 같은 이벤트가 중복 전달됐을 때
/// 두 번째 전달이 새 알림 대신 기존 알림에 흡수되게 하기 위함입니다.
const REDELIVERY_MERGE_WINDOW: Duration = Duration::from_secs(3600);

/// ERROR 로그 알림 규칙
///
/// 이벤트 경로에서만 동작합니다. `alert_error_log_enabled` 설정으로
/// 켜고 끌 수 있으며 기본값은 켜짐입니다.
#[derive(Debug, Default)]
pub struct ErrorLogRule;

impl ErrorLogRule {
    /// 규칙을 만듭니다.
    pub fn new() -> Self {
        Self
    }
}

impl AlertRule for ErrorLogRule {
    fn name(&self) -> &str {
        "error_log"
    }

    fn evaluate(
        &self,
        ctx: &EvalContext<'_>,
        trigger: &EvaluationTrigger,
    ) -> Result<Vec<AlertProposal>, AlertEngineError> {
        // 주기 스캔 경로에서는 동작하지 않음
        let Some(log_id) = trigger.log_id() else {
            return Ok(Vec::new());
        };

        if !config::get_bool(ctx.config, keys::ERROR_LOG_ENABLED, DEFAULT_ERROR_LOG_ENABLED) {
            return Ok(Vec::new());
        }

        let record = ctx
            .logs
            .find_by_id(log_id)
            .map_err(|source| AlertEngineError::EvidenceQuery {
                rule: self.name().to_owned(),
                source,
            })?;
        let Some(record) = record else {
            return Ok(Vec::new());
        };
        if record.level != LogLevel::Error {
            return Ok(Vec::new());
        }

        let excerpt: String = record.message.chars().take(MESSAGE_EXCERPT_CHARS).collect();

        Ok(vec![AlertProposal {
            alert_type: AlertType::ErrorLog,
            key: CorrelationKey::Record(log_id),
            level: AlertLevel::Medium,
            title: format!("ERROR log detected - {}", record.source),
            description: format!("ERROR-level log recorded: {excerpt}"),
            related_ip: record.ip.clone(),
            related_user: record.user.clone(),
            log_ids: BTreeSet::from([log_id]),
            extra: serde_json::json!({
                "log_id": log_id,
                "log_source": record.source,
                "log_level": record.level.to_string(),
            }),
            window: REDELIVERY_MERGE_WINDOW,
        }])
    }
}
