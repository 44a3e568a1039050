//! 인메모리 스토어 어댑터
//!
//! 테스트와 임베디드 사용을 위한 스토리지 trait 구현체입니다.
//! 모든 구현은 내부 `Mutex`로 동기화되며 `Send + Sync`입니다.
//! 프로덕션에서는 SQL 기반 구현체가 같은 trait을 대신 구현합니다.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use logwarden_core::error::StorageError;
use logwarden_core::store::{AlertStore, ConfigEntry, ConfigStore, LogQuery, LogStore};
use logwarden_core::types::{Alert, AlertType, CorrelationKey, LogRecord, NewAlert};

/// 인메모리 런타임 설정 저장소
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    entries: Mutex<HashMap<String, ConfigEntry>>,
}

impl MemoryConfigStore {
    /// 빈 설정 저장소를 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 활성 설정값을 넣습니다 (있으면 덮어씀).
    pub fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.to_owned(),
                ConfigEntry {
                    key: key.to_owned(),
                    value: value.to_owned(),
                    is_active: true,
                },
            );
    }

    /// 비활성 설정값을 넣습니다.
    pub fn set_inactive(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.to_owned(),
                ConfigEntry {
                    key: key.to_owned(),
                    value: value.to_owned(),
                    is_active: false,
                },
            );
    }

    /// 설정값을 제거합니다.
    pub fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Result<Option<ConfigEntry>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }
}

#[derive(Debug, Default)]
struct LogStoreInner {
    records: BTreeMap<i64, LogRecord>,
    next_id: i64,
}

/// 인메모리 로그 저장소
///
/// ID는 삽입 순서대로 1부터 부여됩니다.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    inner: Mutex<LogStoreInner>,
}

impl MemoryLogStore {
    /// 빈 로그 저장소를 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 레코드를 저장하고 부여된 ID를 반환합니다.
    ///
    /// 전달된 레코드의 `id` 필드는 무시되고 새 ID로 대체됩니다.
    pub fn insert(&self, mut record: LogRecord) -> i64 {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let id = inner.next_id;
        record.id = id;
        inner.records.insert(id, record);
        id
    }

    /// 저장된 레코드 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    /// 저장소가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogStore for MemoryLogStore {
    fn find_by_id(&self, id: i64) -> Result<Option<LogRecord>, StorageError> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .get(&id)
            .cloned())
    }

    fn query(&self, query: &LogQuery) -> Result<Vec<LogRecord>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .records
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct AlertStoreInner {
    alerts: BTreeMap<i64, Alert>,
    next_id: i64,
}

/// 인메모리 알림 저장소
#[derive(Debug, Default)]
pub struct MemoryAlertStore {
    inner: Mutex<AlertStoreInner>,
}

impl MemoryAlertStore {
    /// 빈 알림 저장소를 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 모든 알림을 ID 순으로 반환합니다.
    pub fn all(&self) -> Vec<Alert> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .alerts
            .values()
            .cloned()
            .collect()
    }

    /// 저장된 알림 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .alerts
            .len()
    }

    /// 저장소가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertStore for MemoryAlertStore {
    fn find_by_id(&self, id: i64) -> Result<Option<Alert>, StorageError> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .alerts
            .get(&id)
            .cloned())
    }

    fn find_open(
        &self,
        alert_type: AlertType,
        key: &CorrelationKey,
        since: SystemTime,
    ) -> Result<Option<Alert>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .alerts
            .values()
            .find(|alert| {
                alert.alert_type == alert_type
                    && alert.status.is_open()
                    && alert.created_at >= since
                    && key.matches(alert)
            })
            .cloned())
    }

    fn create(&self, draft: NewAlert) -> Result<Alert, StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let id = inner.next_id;
        let alert = draft.into_alert(id);
        inner.alerts.insert(id, alert.clone());
        Ok(alert)
    }

    fn update(&self, alert: &Alert) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !inner.alerts.contains_key(&alert.id) {
            return Err(StorageError::NotFound { id: alert.id });
        }
        inner.alerts.insert(alert.id, alert.clone());
        Ok(())
    }
}
