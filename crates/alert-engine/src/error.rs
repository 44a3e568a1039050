//! 알림 엔진 에러 타입
//!
//! [`AlertEngineError`]는 규칙 평가와 알림 병합 과정에서 발생하는 모든
//! 에러를 표현합니다. `From<AlertEngineError> for LogwardenError` 변환이
//! 구현되어 있어 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 한 규칙의 실패는 그 규칙의 평가만 중단시킵니다. 엔진은 에러를
//! [`EngineReport`](crate::engine::EngineReport)에 수집하고 나머지 규칙을
//! 계속 실행합니다.

use logwarden_core::error::{EngineError, LogwardenError, StorageError};

/// 알림 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum AlertEngineError {
    /// 증거 조회 실패 — 규칙의 읽기 스캔이 중단됨
    #[error("evidence query failed in rule '{rule}': {source}")]
    EvidenceQuery {
        /// 실패한 규칙명
        rule: String,
        /// 스토리지 에러
        source: StorageError,
    },

    /// 알림 생성/갱신 실패
    #[error("alert store error for key '{key}': {source}")]
    Persist {
        /// 중복 제거 키 (`유형/상관값`)
        key: String,
        /// 스토리지 에러
        source: StorageError,
    },

    /// 병합 충돌이 재시도 후에도 해소되지 않음
    #[error("merge conflict not resolved after retry for key '{key}'")]
    MergeConflict {
        /// 중복 제거 키
        key: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 정규식 컴파일 에러 (메시지 패턴)
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<AlertEngineError> for LogwardenError {
    fn from(err: AlertEngineError) -> Self {
        match err {
            AlertEngineError::MergeConflict { .. } => {
                LogwardenError::Engine(EngineError::Merge(err.to_string()))
            }
            other => LogwardenError::Engine(EngineError::Rule(other.to_string())),
        }
    }
}
