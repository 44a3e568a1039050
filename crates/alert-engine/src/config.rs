//! 엔진 설정 — 런타임 규칙 파라미터 조회와 엔진 자체 설정
//!
//! 규칙 파라미터(임계값, 윈도우, 활성화 플래그)는 운영 중 변경 가능한
//! key-value 저장소([`ConfigStore`])에서 읽습니다. 값이 없거나, 비활성이거나,
//! 파싱에 실패하면 항상 문서화된 기본값으로 폴백하며 에러를 내지 않습니다.
//!
//! [`EngineConfig`]는 core의
//! [`AlertEngineConfig`](logwarden_core::config::AlertEngineConfig)를
//! 기반으로 엔진 전용 확장 설정을 제공합니다.

use serde::{Deserialize, Serialize};
use tracing::debug;

use logwarden_core::store::ConfigStore;

use crate::error::AlertEngineError;

/// 런타임 설정 키 상수
pub mod keys {
    /// 무차별 대입 판정 임계값 (윈도우 내 실패 횟수)
    pub const BRUTE_FORCE_THRESHOLD: &str = "alert_brute_force_threshold";
    /// 무차별 대입 탐지 시간 윈도우 (분)
    pub const BRUTE_FORCE_WINDOW_MINUTES: &str = "alert_brute_force_window_minutes";
    /// ERROR 로그 알림 활성화 여부
    pub const ERROR_LOG_ENABLED: &str = "alert_error_log_enabled";
}

/// 무차별 대입 임계값 기본값
pub const DEFAULT_BRUTE_FORCE_THRESHOLD: i64 = 5;
/// 무차별 대입 윈도우 기본값 (분)
pub const DEFAULT_BRUTE_FORCE_WINDOW_MINUTES: i64 = 5;
/// ERROR 로그 알림 기본값
pub const DEFAULT_ERROR_LOG_ENABLED: bool = true;

/// 정수형 설정값을 조회합니다.
///
/// 엔트리가 없거나, 비활성이거나, 정수로 파싱되지 않거나, 저장소 조회가
/// 실패하면 `default`를 반환합니다. 절대 에러를 내지 않습니다.
pub fn get_int(store: &dyn ConfigStore, key: &str, default: i64) -> i64 {
    match store.get(key) {
        Ok(Some(entry)) if entry.is_active => match entry.value.trim().parse::<i64>() {
            Ok(value) => value,
            Err(_) => {
                debug!(key, value = entry.value.as_str(), "malformed int config, using default");
                default
            }
        },
        Ok(_) => default,
        Err(error) => {
            debug!(key, %error, "config store unavailable, using default");
            default
        }
    }
}

/// 불리언 설정값을 조회합니다.
///
/// `true`/`1`/`yes`와 `false`/`0`/`no`만 인식하며(대소문자 무관),
/// 그 외의 값은 모두 `default`로 폴백합니다.
pub fn get_bool(store: &dyn ConfigStore, key: &str, default: bool) -> bool {
    match store.get(key) {
        Ok(Some(entry)) if entry.is_active => {
            match entry.value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    debug!(
                        key,
                        value = entry.value.as_str(),
                        "malformed bool config, using default"
                    );
                    default
                }
            }
        }
        Ok(_) => default,
        Err(error) => {
            debug!(key, %error, "config store unavailable, using default");
            default
        }
    }
}

/// 알림 엔진 설정
///
/// core의 `AlertEngineConfig`에서 파생되며, 엔진 내부에서 사용하는
/// 추가 설정을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 주기 스캔 간격 (초)
    pub scan_interval_secs: u64,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 병합 충돌 시 재시도 횟수
    pub merge_retry_limit: u32,
    /// 상관 키 락 테이블 최대 항목 수 (메모리 성장 제한)
    pub max_key_locks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: 60,
            merge_retry_limit: 1,
            max_key_locks: 10_000,
        }
    }
}

impl EngineConfig {
    /// core의 `AlertEngineConfig`에서 엔진 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &logwarden_core::config::AlertEngineConfig) -> Self {
        Self {
            enabled: core.enabled,
            scan_interval_secs: core.scan_interval_secs,
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), AlertEngineError> {
        const MAX_SCAN_INTERVAL_SECS: u64 = 86_400; // 24 hours
        const MAX_MERGE_RETRY_LIMIT: u32 = 10;

        if self.enabled
            && (self.scan_interval_secs == 0 || self.scan_interval_secs > MAX_SCAN_INTERVAL_SECS)
        {
            return Err(AlertEngineError::Config {
                field: "scan_interval_secs".to_owned(),
                reason: format!("must be 1-{MAX_SCAN_INTERVAL_SECS}"),
            });
        }

        if self.merge_retry_limit > MAX_MERGE_RETRY_LIMIT {
            return Err(AlertEngineError::Config {
                field: "merge_retry_limit".to_owned(),
                reason: format!("must be 0-{MAX_MERGE_RETRY_LIMIT}"),
            });
        }

        if self.max_key_locks == 0 {
            return Err(AlertEngineError::Config {
                field: "max_key_locks".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 엔진 설정 빌더
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 활성화 여부를 설정합니다.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// 주기 스캔 간격(초)을 설정합니다.
    pub fn scan_interval_secs(mut self, secs: u64) -> Self {
        self.config.scan_interval_secs = secs;
        self
    }

    /// 병합 충돌 재시도 횟수를 설정합니다.
    pub fn merge_retry_limit(mut self, limit: u32) -> Self {
        self.config.merge_retry_limit = limit;
        self
    }

    /// 락 테이블 최대 항목 수를 설정합니다.
    pub fn max_key_locks(mut self, max: usize) -> Self {
        self.config.max_key_locks = max;
        self
    }

    /// 설정을 검증하고 `EngineConfig`를 생성합니다.
    pub fn build(self) -> Result<EngineConfig, AlertEngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
