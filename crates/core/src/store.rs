//! 스토리지 trait — 외부 서브시스템과의 경계 계약
//!
//! 엔진은 로그 저장소, 알림 저장소, 런타임 설정 저장소를 소유하지 않습니다.
//! 여기의 trait들은 그 경계에서 엔진이 요구하는 읽기/쓰기 계약만 정의하며,
//! 구현체는 SQL, 인메모리 등 무엇이든 될 수 있습니다.

use std::time::SystemTime;

use crate::error::StorageError;
use crate::types::{Alert, AlertType, CorrelationKey, LogLevel, LogRecord, NewAlert};

/// 런타임 설정 엔트리
///
/// 운영 중 변경 가능한 key-value 설정 한 건을 나타냅니다.
/// `is_active`가 꺼진 엔트리는 없는 것으로 취급됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    /// 설정 키 (유일)
    pub key: String,
    /// 설정 값 (문자열로 저장, 사용처에서 타입 변환)
    pub value: String,
    /// 활성화 여부
    pub is_active: bool,
}

/// 런타임 설정 저장소 계약
///
/// 규칙 임계값, 윈도우 크기, 활성화 플래그를 키 단위로 조회합니다.
/// 값 해석과 기본값 폴백은 호출 측의 책임입니다.
pub trait ConfigStore: Send + Sync {
    /// 키에 해당하는 설정 엔트리를 조회합니다.
    fn get(&self, key: &str) -> Result<Option<ConfigEntry>, StorageError>;
}

/// 로그 조회 조건
///
/// 필드를 지정하지 않으면 해당 조건은 적용되지 않습니다.
/// 집계(그룹화, distinct 카운트)는 규칙이 조회 결과 위에서 수행합니다.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    /// 이 시각 이후의 레코드만 (timestamp >= since)
    pub since: Option<SystemTime>,
    /// 이 시각 이전의 레코드만 (timestamp <= until)
    pub until: Option<SystemTime>,
    /// 로그 레벨 일치
    pub level: Option<LogLevel>,
    /// 출처 IP 일치
    pub ip: Option<String>,
    /// 사용자명 일치
    pub user: Option<String>,
    /// 메시지 부분 문자열 포함 (대소문자 구분 없음)
    pub message_contains: Option<String>,
}

impl LogQuery {
    /// 빈 조회 조건을 만듭니다 (모든 레코드 일치).
    pub fn new() -> Self {
        Self::default()
    }

    /// 시작 시각을 지정합니다.
    pub fn since(mut self, since: SystemTime) -> Self {
        self.since = Some(since);
        self
    }

    /// 종료 시각을 지정합니다.
    pub fn until(mut self, until: SystemTime) -> Self {
        self.until = Some(until);
        self
    }

    /// 로그 레벨을 지정합니다.
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// 출처 IP를 지정합니다.
    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// 사용자명을 지정합니다.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// 메시지 부분 문자열 조건을 지정합니다.
    pub fn message_contains(mut self, needle: impl Into<String>) -> Self {
        self.message_contains = Some(needle.into());
        self
    }

    /// 레코드가 이 조회 조건에 일치하는지 판정합니다.
    ///
    /// 스토어 구현체가 필터링에 그대로 사용할 수 있습니다.
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(since) = self.since
            && record.timestamp < since
        {
            return false;
        }
        if let Some(until) = self.until
            && record.timestamp > until
        {
            return false;
        }
        if let Some(level) = self.level
            && record.level != level
        {
            return false;
        }
        if let Some(ref ip) = self.ip
            && record.ip.as_deref() != Some(ip.as_str())
        {
            return false;
        }
        if let Some(ref user) = self.user
            && record.user.as_deref() != Some(user.as_str())
        {
            return false;
        }
        if let Some(ref needle) = self.message_contains
            && !record
                .message
                .to_lowercase()
                .contains(&needle.to_lowercase())
        {
            return false;
        }
        true
    }
}

/// 로그 저장소 계약 (읽기 전용)
///
/// 수집 서브시스템이 적재한 로그를 시간 범위/레벨/IP/사용자 조건으로
/// 조회합니다. 엔진은 이 계약을 통해서만 로그에 접근합니다.
pub trait LogStore: Send + Sync {
    /// ID로 단일 레코드를 조회합니다.
    fn find_by_id(&self, id: i64) -> Result<Option<LogRecord>, StorageError>;

    /// 조건에 일치하는 레코드를 조회합니다.
    fn query(&self, query: &LogQuery) -> Result<Vec<LogRecord>, StorageError>;
}

/// 알림 저장소 계약
///
/// 구현체는 SQL, redb, 인메모리 등 무엇이든 될 수 있습니다.
/// `update`는 낙관적 동시성을 사용하는 구현체에서
/// [`StorageError::Conflict`]를 반환할 수 있으며, 호출 측(병합 정책)이
/// 재조회 후 재적용으로 복구합니다.
pub trait AlertStore: Send + Sync {
    /// ID로 단일 알림을 조회합니다.
    fn find_by_id(&self, id: i64) -> Result<Option<Alert>, StorageError>;

    /// 열린 상태(UNHANDLED/HANDLING)이고 `created_at >= since`이며
    /// `(alert_type, key)`에 대응하는 알림을 조회합니다.
    fn find_open(
        &self,
        alert_type: AlertType,
        key: &CorrelationKey,
        since: SystemTime,
    ) -> Result<Option<Alert>, StorageError>;

    /// 새 알림을 저장하고 ID가 부여된 레코드를 반환합니다.
    fn create(&self, draft: NewAlert) -> Result<Alert, StorageError>;

    /// 기존 알림을 갱신합니다.
    fn update(&self, alert: &Alert) -> Result<(), StorageError>;
}
