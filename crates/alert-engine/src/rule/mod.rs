//! 탐지 규칙 — 평가 계약과 규칙 구현
//!
//! 모든 규칙은 [`AlertRule`] trait을 구현하는 고정된 타입입니다.
//! 규칙은 로그/설정 저장소를 읽기 전용으로 조회하여
//! [`AlertProposal`](제안)을 내놓을 뿐, 알림 저장소에는 절대 쓰지 않습니다.
//! 제안을 기존 알림에 병합할지 새로 만들지는 엔진의 병합 정책이 결정합니다.
//!
//! # 규칙 목록
//! - [`BruteForceRule`]: 윈도우 내 IP별 로그인 실패 횟수 집계
//! - [`ErrorLogRule`]: ERROR 레벨 로그 이벤트당 알림
//! - [`SuspiciousAccessRule`]: 사용자별 distinct IP 로그인 집계

pub mod brute_force;
pub mod error_log;
pub mod suspicious_access;

pub use brute_force::BruteForceRule;
pub use error_log::ErrorLogRule;
pub use suspicious_access::SuspiciousAccessRule;

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime};

use logwarden_core::store::{ConfigStore, LogStore};
use logwarden_core::types::{AlertLevel, AlertType, CorrelationKey};

use crate::error::AlertEngineError;

/// 평가 트리거 — 무엇이 평가를 일으켰는지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationTrigger {
    /// 새 로그 레코드가 저장됨 (이벤트 경로)
    Record {
        /// 새로 저장된 로그 레코드 ID
        log_id: i64,
    },
    /// 주기 스캔 (스케줄러 경로)
    Sweep,
}

impl EvaluationTrigger {
    /// 이벤트 경로일 때 로그 ID를 반환합니다.
    pub fn log_id(&self) -> Option<i64> {
        match self {
            Self::Record { log_id } => Some(*log_id),
            Self::Sweep => None,
        }
    }

    /// 메트릭 레이블용 고정 문자열을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Record { .. } => "event",
            Self::Sweep => "sweep",
        }
    }
}

/// 평가 컨텍스트
///
/// 규칙이 필요로 하는 읽기 핸들과 평가 기준 시각을 명시적으로 전달합니다.
/// 전역 상태나 암묵적 시계는 사용하지 않습니다.
pub struct EvalContext<'a> {
    /// 로그 저장소 (읽기 전용)
    pub logs: &'a dyn LogStore,
    /// 런타임 설정 저장소
    pub config: &'a dyn ConfigStore,
    /// 평가 기준 시각 — 모든 윈도우 계산의 "지금"
    pub now: SystemTime,
}

/// 알림 제안 — 규칙의 출력, 아직 저장되지 않은 상태
///
/// `(alert_type, key)`가 중복 제거 키이며, `window`는 병합 대상을 찾을 때
/// 열린 알림의 `created_at` 하한을 정합니다.
#[derive(Debug, Clone)]
pub struct AlertProposal {
    /// 알림 유형
    pub alert_type: AlertType,
    /// 상관 키
    pub key: CorrelationKey,
    /// 심각도
    pub level: AlertLevel,
    /// 알림 제목
    pub title: String,
    /// 상세 설명 (현재 집계 기준으로 규칙이 생성)
    pub description: String,
    /// 관련 IP
    pub related_ip: Option<String>,
    /// 관련 사용자
    pub related_user: Option<String>,
    /// 증거 로그 ID 집합
    pub log_ids: BTreeSet<i64>,
    /// 규칙별 추가 증거 (횟수, 임계값, 윈도우 등)
    pub extra: serde_json::Value,
    /// 병합 매칭에 쓰는 시간 윈도우
    pub window: Duration,
}

impl AlertProposal {
    /// 병합 대상 조회의 `created_at` 하한을 계산합니다.
    pub fn dedup_since(&self, now: SystemTime) -> SystemTime {
        now.checked_sub(self.window)
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }
}

/// 탐지 규칙 trait
///
/// 새로운 탐지 규칙을 추가하려면 이 trait을 구현하고 엔진 빌더에
/// 등록합니다. 구현은 알림 저장소에 대해 부수 효과가 없어야 합니다.
pub trait AlertRule: Send + Sync {
    /// 규칙 이름 (로깅/메트릭 레이블)
    fn name(&self) -> &str;

    /// 트리거에 대해 규칙을 평가하고 0개 이상의 제안을 반환합니다.
    fn evaluate(
        &self,
        ctx: &EvalContext<'_>,
        trigger: &EvaluationTrigger,
    ) -> Result<Vec<AlertProposal>, AlertEngineError>;
}
