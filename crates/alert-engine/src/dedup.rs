//! 중복 제거 / 병합 정책 — 제안 하나를 알림 저장소에 반영하는 작업 단위
//!
//! 제안마다 명시적인 읽기-확인-쓰기 작업 단위를 수행합니다:
//! 같은 `(alert_type, key)`의 열린 알림이 윈도우 안에 있으면 거기에
//! 병합하고(횟수 증가, 증거 합집합, 설명 갱신), 없으면 `UNHANDLED`
//! 상태의 새 알림을 만듭니다. 키 단위 직렬화는 호출 측(엔진)의
//! 어드바이저리 락이 담당합니다.
//!
//! 저장소가 낙관적 동시성 충돌([`StorageError::Conflict`])을 보고하면
//! 재조회 후 누적 재적용으로 복구하며, 재시도 한도를 넘기면 해당
//! 제안만 실패로 보고합니다.

use std::time::SystemTime;

use tracing::debug;

use logwarden_core::error::StorageError;
use logwarden_core::store::AlertStore;
use logwarden_core::types::{Alert, NewAlert};

use crate::error::AlertEngineError;
use crate::rule::AlertProposal;

/// 병합 정책의 결과
#[derive(Debug, Clone)]
pub enum MergeOutcome {
    /// 새 알림이 생성됨
    Created(Alert),
    /// 기존 열린 알림에 병합됨
    Merged(Alert),
}

impl MergeOutcome {
    /// 결과 알림에 대한 참조를 반환합니다.
    pub fn alert(&self) -> &Alert {
        match self {
            Self::Created(alert) | Self::Merged(alert) => alert,
        }
    }

    /// 결과 알림을 소유권과 함께 반환합니다.
    pub fn into_alert(self) -> Alert {
        match self {
            Self::Created(alert) | Self::Merged(alert) => alert,
        }
    }

    /// 병합이었는지 여부를 반환합니다.
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged(_))
    }
}

/// 제안 하나를 저장소에 반영합니다.
///
/// 호출 전에 `(alert_type, key)`에 대한 락을 잡아야 합니다 — 엔진이
/// [`AlertEngine`](crate::engine::AlertEngine)에서 이를 보장합니다.
pub fn apply(
    store: &dyn AlertStore,
    proposal: &AlertProposal,
    now: SystemTime,
    retry_limit: u32,
) -> Result<MergeOutcome, AlertEngineError> {
    let key_label = format!("{}/{}", proposal.alert_type, proposal.key);
    let since = proposal.dedup_since(now);

    let existing = store
        .find_open(proposal.alert_type, &proposal.key, since)
        .map_err(|source| AlertEngineError::Persist {
            key: key_label.clone(),
            source,
        })?;

    match existing {
        Some(open) => merge_with_retry(store, open, proposal, now, retry_limit, key_label),
        None => {
            let draft = NewAlert {
                alert_type: proposal.alert_type,
                level: proposal.level,
                title: proposal.title.clone(),
                description: proposal.description.clone(),
                related_ip: proposal.related_ip.clone(),
                related_user: proposal.related_user.clone(),
                related_log_ids: proposal.log_ids.clone(),
                extra: proposal.extra.clone(),
                created_at: now,
            };
            let created = store
                .create(draft)
                .map_err(|source| AlertEngineError::Persist {
                    key: key_label,
                    source,
                })?;
            Ok(MergeOutcome::Created(created))
        }
    }
}

/// 기존 알림에 제안을 누적 적용한 사본을 만듭니다.
///
/// 상태와 심각도, 제목은 건드리지 않습니다. 설명은 제안의 최신 집계에
/// 누적 트리거 횟수를 덧붙여 다시 만듭니다.
fn merged_alert(mut alert: Alert, proposal: &AlertProposal, now: SystemTime) -> Alert {
    alert.trigger_count = alert.trigger_count.saturating_add(1);
    alert
        .related_log_ids
        .extend(proposal.log_ids.iter().copied());
    alert.description = format!(
        "{} (triggered {} times in total)",
        proposal.description, alert.trigger_count,
    );
    alert.extra = proposal.extra.clone();
    alert.updated_at = now;
    alert
}

fn merge_with_retry(
    store: &dyn AlertStore,
    mut current: Alert,
    proposal: &AlertProposal,
    now: SystemTime,
    retry_limit: u32,
    key_label: String,
) -> Result<MergeOutcome, AlertEngineError> {
    let mut attempts = 0;
    loop {
        let updated = merged_alert(current.clone(), proposal, now);
        match store.update(&updated) {
            Ok(()) => return Ok(MergeOutcome::Merged(updated)),
            Err(StorageError::Conflict { .. }) if attempts < retry_limit => {
                attempts += 1;
                debug!(
                    key = %key_label,
                    attempt = attempts,
                    "merge conflict, re-reading and re-applying"
                );
                // 경쟁 갱신의 결과 위에 누적 적용하기 위해 재조회
                current = store
                    .find_by_id(current.id)
                    .map_err(|source| AlertEngineError::Persist {
                        key: key_label.clone(),
                        source,
                    })?
                    .ok_or_else(|| AlertEngineError::Persist {
                        key: key_label.clone(),
                        source: StorageError::NotFound { id: updated.id },
                    })?;
            }
            Err(StorageError::Conflict { .. }) => {
                return Err(AlertEngineError::MergeConflict { key: key_label });
            }
            Err(source) => {
                return Err(AlertEngineError::Persist {
                    key: key_label,
                    source,
                });
            }
        }
    }
}
