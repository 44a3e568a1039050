//! 에러 타입 — 도메인별 에러 정의

/// Logwarden 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogwardenError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 알림 엔진 에러
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 알림 엔진 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 규칙 평가 에러
    #[error("rule error: {0}")]
    Rule(String),

    /// 알림 병합 에러
    #[error("merge error: {0}")]
    Merge(String),
}

/// 스토리지 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 쿼리 실패
    #[error("query failed: {0}")]
    Query(String),

    /// 낙관적 동시성 충돌 — 같은 키에 대한 경쟁 갱신
    #[error("write conflict on '{key}'")]
    Conflict { key: String },

    /// 대상 레코드 없음
    #[error("record not found: {id}")]
    NotFound { id: i64 },
}
