//! 도메인 타입 — 로그 감사 시스템 전역에서 사용되는 공통 타입
//!
//! 로그 레코드와 알림 레코드, 그리고 둘을 잇는 상관 키를 정의합니다.
//! 로그 레코드는 수집 서브시스템이 소유하는 읽기 전용 입력이며,
//! 알림 레코드는 엔진의 유일한 출력입니다.

use std::collections::BTreeSet;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 로그 레벨
///
/// `Ord` 구현으로 레벨 비교가 가능합니다 (`Debug < Info < Warn < Error`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// 디버그
    Debug,
    /// 정보성 (기본값)
    #[default]
    Info,
    /// 경고
    Warn,
    /// 오류
    Error,
}

impl LogLevel {
    /// 문자열에서 로그 레벨을 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debug" | "dbg" => Some(Self::Debug),
            "info" | "informational" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "err" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 로그 레코드
///
/// 수집 서브시스템이 저장한 하나의 로그 이벤트를 나타냅니다.
/// 저장 이후에는 불변이며, 엔진은 이를 읽기 전용으로만 사용합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// 레코드 ID (스토어가 부여)
    pub id: i64,
    /// 로그 출처 (예: "nginx", "web_app", "firewall")
    pub source: String,
    /// 로그 레벨
    pub level: LogLevel,
    /// 로그 발생 시각 (입수 시각과 다를 수 있음)
    pub timestamp: SystemTime,
    /// 출처 IP (있을 경우)
    pub ip: Option<String>,
    /// 관련 사용자명 (있을 경우)
    pub user: Option<String>,
    /// 로그 메시지
    pub message: String,
    /// 원시 로그 데이터 (재파싱/추적용, 있을 경우)
    pub raw_data: Option<String>,
    /// 입수 시각
    pub created_at: SystemTime,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] #{} {}: {}",
            self.level, self.id, self.source, self.message,
        )
    }
}

/// 알림 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    /// 무차별 대입 공격
    BruteForce,
    /// ERROR 로그 발생
    ErrorLog,
    /// 의심스러운 접근
    SuspiciousAccess,
    /// 시스템 이상
    SystemAnomaly,
    /// 사용자 정의
    Custom,
}

impl AlertType {
    /// 메트릭 레이블 등에 쓰이는 고정 문자열을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BruteForce => "BRUTE_FORCE",
            Self::ErrorLog => "ERROR_LOG",
            Self::SuspiciousAccess => "SUSPICIOUS_ACCESS",
            Self::SystemAnomaly => "SYSTEM_ANOMALY",
            Self::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 알림 심각도
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    /// 낮음
    Low,
    /// 중간 (기본값)
    #[default]
    Medium,
    /// 높음
    High,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl AlertLevel {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// 알림 처리 상태
///
/// 엔진이 수행하는 전이는 생성(`Unhandled`)뿐입니다.
/// 그 외 모든 전이는 운영자 조치로만 일어납니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    /// 미처리 (기본값)
    #[default]
    Unhandled,
    /// 처리 중
    Handling,
    /// 해결됨
    Resolved,
    /// 무시됨
    Ignored,
}

impl AlertStatus {
    /// 열린 상태인지 — 병합 대상이 될 수 있는지 여부를 반환합니다.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Unhandled | Self::Handling)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unhandled => write!(f, "UNHANDLED"),
            Self::Handling => write!(f, "HANDLING"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Ignored => write!(f, "IGNORED"),
        }
    }
}

/// 상관 키 — 연관된 규칙 발화를 하나의 알림으로 묶는 값
///
/// `(AlertType, CorrelationKey)` 쌍이 중복 제거의 단위가 됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrelationKey {
    /// IP 주소 기준 (예: 무차별 대입)
    Ip(String),
    /// 사용자명 기준 (예: 의심 접근)
    User(String),
    /// 단일 로그 레코드 기준 — 이벤트마다 독립된 알림을 만듭니다
    Record(i64),
}

impl CorrelationKey {
    /// 기존 알림이 이 키에 대응하는지 판정합니다.
    ///
    /// `Record` 키는 증거가 정확히 해당 레코드 하나일 때만 일치하므로
    /// 서로 다른 이벤트의 알림은 병합되지 않습니다.
    pub fn matches(&self, alert: &Alert) -> bool {
        match self {
            Self::Ip(ip) => alert.related_ip.as_deref() == Some(ip.as_str()),
            Self::User(user) => alert.related_user.as_deref() == Some(user.as_str()),
            Self::Record(id) => {
                alert.related_log_ids.len() == 1 && alert.related_log_ids.contains(id)
            }
        }
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(ip) => write!(f, "ip:{ip}"),
            Self::User(user) => write!(f, "user:{user}"),
            Self::Record(id) => write!(f, "record:{id}"),
        }
    }
}

/// 알림 레코드
///
/// 엔진이 생성하고 병합하는 주 출력입니다. `trigger_count`는 단조 증가하며,
/// 상태 전이는 생성 시의 `Unhandled`를 제외하면 모두 엔진 밖에서 일어납니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// 알림 ID (스토어가 부여)
    pub id: i64,
    /// 알림 유형
    pub alert_type: AlertType,
    /// 심각도
    pub level: AlertLevel,
    /// 알림 제목
    pub title: String,
    /// 상세 설명 (병합 시 갱신)
    pub description: String,
    /// 관련 IP (있을 경우)
    pub related_ip: Option<String>,
    /// 관련 사용자 (있을 경우)
    pub related_user: Option<String>,
    /// 증거 로그 ID 집합 (병합 시 합집합으로 증가)
    pub related_log_ids: BTreeSet<i64>,
    /// 트리거 횟수 (병합마다 증가, 1 이상)
    pub trigger_count: u32,
    /// 처리 상태
    pub status: AlertStatus,
    /// 처리자 사용자 ID (운영자 조치 시에만 기록)
    pub handler_user_id: Option<i64>,
    /// 처리 메모 (운영자 조치 시에만 기록)
    pub handler_note: Option<String>,
    /// 처리 시각 (운영자 조치 시에만 기록)
    pub handled_at: Option<SystemTime>,
    /// 규칙별 추가 증거 (횟수, 임계값, 윈도우 등)
    pub extra: serde_json::Value,
    /// 생성 시각
    pub created_at: SystemTime,
    /// 마지막 갱신 시각
    pub updated_at: SystemTime,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} #{} {} (triggers: {})",
            self.level, self.alert_type, self.id, self.title, self.trigger_count,
        )
    }
}

/// 알림 생성 페이로드
///
/// ID를 제외한 알림의 모든 필드를 담습니다. ID는 스토어가 부여합니다.
#[derive(Debug, Clone)]
pub struct NewAlert {
    /// 알림 유형
    pub alert_type: AlertType,
    /// 심각도
    pub level: AlertLevel,
    /// 알림 제목
    pub title: String,
    /// 상세 설명
    pub description: String,
    /// 관련 IP
    pub related_ip: Option<String>,
    /// 관련 사용자
    pub related_user: Option<String>,
    /// 증거 로그 ID 집합
    pub related_log_ids: BTreeSet<i64>,
    /// 규칙별 추가 증거
    pub extra: serde_json::Value,
    /// 생성 시각
    pub created_at: SystemTime,
}

impl NewAlert {
    /// 스토어가 부여한 ID로 완전한 알림 레코드를 만듭니다.
    ///
    /// 상태는 `Unhandled`, 트리거 횟수는 1로 시작합니다.
    pub fn into_alert(self, id: i64) -> Alert {
        Alert {
            id,
            alert_type: self.alert_type,
            level: self.level,
            title: self.title,
            description: self.description,
            related_ip: self.related_ip,
            related_user: self.related_user,
            related_log_ids: self.related_log_ids,
            trigger_count: 1,
            status: AlertStatus::Unhandled,
            handler_user_id: None,
            handler_note: None,
            handled_at: None,
            extra: self.extra,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_alert() -> Alert {
        let now = SystemTime::now();
        Alert {
            id: 1,
            alert_type: AlertType::BruteForce,
            level: AlertLevel::High,
            title: "Brute force attack detected - IP: 192.168.1.100".to_owned(),
            description: "7 failed logins in the last 5 minutes".to_owned(),
            related_ip: Some("192.168.1.100".to_owned()),
            related_user: None,
            related_log_ids: BTreeSet::from([1, 2, 3]),
            trigger_count: 1,
            status: AlertStatus::Unhandled,
            handler_user_id: None,
            handler_note: None,
            handled_at: None,
            extra: serde_json::json!({ "fail_count": 7 }),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn log_level_from_str_loose() {
        assert_eq!(LogLevel::from_str_loose("ERROR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str_loose("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str_loose("Info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str_loose("dbg"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str_loose("verbose"), None);
    }

    #[test]
    fn log_level_display_matches_storage_format() {
        assert_eq!(LogLevel::Error.to_string(), "ERROR");
        assert_eq!(LogLevel::Warn.to_string(), "WARN");
    }

    #[test]
    fn alert_level_ordering() {
        assert!(AlertLevel::Low < AlertLevel::Medium);
        assert!(AlertLevel::Medium < AlertLevel::High);
        assert!(AlertLevel::High < AlertLevel::Critical);
    }

    #[test]
    fn alert_level_default_is_medium() {
        assert_eq!(AlertLevel::default(), AlertLevel::Medium);
    }

    #[test]
    fn alert_level_from_str_loose() {
        assert_eq!(AlertLevel::from_str_loose("HIGH"), Some(AlertLevel::High));
        assert_eq!(
            AlertLevel::from_str_loose("crit"),
            Some(AlertLevel::Critical)
        );
        assert_eq!(AlertLevel::from_str_loose("unknown"), None);
    }

    #[test]
    fn alert_status_default_is_unhandled() {
        assert_eq!(AlertStatus::default(), AlertStatus::Unhandled);
    }

    #[test]
    fn open_statuses() {
        assert!(AlertStatus::Unhandled.is_open());
        assert!(AlertStatus::Handling.is_open());
        assert!(!AlertStatus::Resolved.is_open());
        assert!(!AlertStatus::Ignored.is_open());
    }

    #[test]
    fn alert_type_display_is_screaming_snake() {
        assert_eq!(AlertType::BruteForce.to_string(), "BRUTE_FORCE");
        assert_eq!(AlertType::ErrorLog.to_string(), "ERROR_LOG");
        assert_eq!(AlertType::SuspiciousAccess.to_string(), "SUSPICIOUS_ACCESS");
    }

    #[test]
    fn alert_type_serde_roundtrip() {
        let json = serde_json::to_string(&AlertType::BruteForce).unwrap();
        assert_eq!(json, "\"BRUTE_FORCE\"");
        let back: AlertType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AlertType::BruteForce);
    }

    #[test]
    fn correlation_key_ip_matches_related_ip() {
        let alert = sample_alert();
        assert!(CorrelationKey::Ip("192.168.1.100".to_owned()).matches(&alert));
        assert!(!CorrelationKey::Ip("10.0.0.1".to_owned()).matches(&alert));
    }

    #[test]
    fn correlation_key_user_matches_related_user() {
        let mut alert = sample_alert();
        alert.related_user = Some("admin".to_owned());
        assert!(CorrelationKey::User("admin".to_owned()).matches(&alert));
        assert!(!CorrelationKey::User("guest".to_owned()).matches(&alert));
    }

    #[test]
    fn correlation_key_record_requires_single_evidence() {
        let mut alert = sample_alert();
        // 증거가 3건이면 Record 키와 일치하지 않음
        assert!(!CorrelationKey::Record(1).matches(&alert));

        alert.related_log_ids = BTreeSet::from([42]);
        assert!(CorrelationKey::Record(42).matches(&alert));
        assert!(!CorrelationKey::Record(43).matches(&alert));
    }

    #[test]
    fn correlation_key_display() {
        assert_eq!(
            CorrelationKey::Ip("1.2.3.4".to_owned()).to_string(),
            "ip:1.2.3.4"
        );
        assert_eq!(
            CorrelationKey::User("admin".to_owned()).to_string(),
            "user:admin"
        );
        assert_eq!(CorrelationKey::Record(7).to_string(), "record:7");
    }

    #[test]
    fn new_alert_into_alert_starts_unhandled() {
        let now = SystemTime::now();
        let draft = NewAlert {
            alert_type: AlertType::ErrorLog,
            level: AlertLevel::Medium,
            title: "ERROR log detected - nginx".to_owned(),
            description: "upstream timed out".to_owned(),
            related_ip: None,
            related_user: None,
            related_log_ids: BTreeSet::from([10]),
            extra: serde_json::json!({ "log_id": 10 }),
            created_at: now,
        };
        let alert = draft.into_alert(99);
        assert_eq!(alert.id, 99);
        assert_eq!(alert.status, AlertStatus::Unhandled);
        assert_eq!(alert.trigger_count, 1);
        assert_eq!(alert.created_at, alert.updated_at);
        assert!(alert.handled_at.is_none());
    }

    #[test]
    fn alert_display() {
        let alert = sample_alert();
        let display = alert.to_string();
        assert!(display.contains("HIGH"));
        assert!(display.contains("BRUTE_FORCE"));
        assert!(display.contains("192.168.1.100"));
    }

    #[test]
    fn log_record_display() {
        let record = LogRecord {
            id: 5,
            source: "nginx".to_owned(),
            level: LogLevel::Error,
            timestamp: SystemTime::now(),
            ip: Some("10.0.0.1".to_owned()),
            user: None,
            message: "login failed for admin".to_owned(),
            raw_data: None,
            created_at: SystemTime::now(),
        };
        let display = record.to_string();
        assert!(display.contains("ERROR"));
        assert!(display.contains("nginx"));
        assert!(display.contains("login failed"));
    }

    #[test]
    fn alert_serde_roundtrip() {
        let alert = sample_alert();
        let json = serde_json::to_string(&alert).unwrap();
        let back: Alert = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, alert.id);
        assert_eq!(back.alert_type, alert.alert_type);
        assert_eq!(back.related_log_ids, alert.related_log_ids);
        assert_eq!(back.extra, alert.extra);
    }
}
