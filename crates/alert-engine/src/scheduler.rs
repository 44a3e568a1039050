//! 주기 스캔 스케줄러 — 윈도우 스캔 규칙의 타이머 트리거
//!
//! [`ScanScheduler`]는 설정된 간격마다 엔진의 `run_scheduled()`를 호출하는
//! 백그라운드 태스크를 띄웁니다. 이벤트 경로는 이 스케줄러와 무관하게
//! 호출자가 직접 `run_on_event()`를 부릅니다.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::AlertEngine;

/// 주기 스캔 스케줄러
///
/// # 사용 예시
/// ```ignore
/// let scheduler = ScanScheduler::new(engine.clone(), Duration::from_secs(60));
/// let cancel = scheduler.cancellation_token();
/// let handle = scheduler.spawn();
///
/// // 종료 시
/// cancel.cancel();
/// handle.await?;
/// ```
pub struct ScanScheduler {
    engine: Arc<AlertEngine>,
    interval: Duration,
    cancel: CancellationToken,
}

impl ScanScheduler {
    /// 지정한 간격으로 스케줄러를 만듭니다.
    pub fn new(engine: Arc<AlertEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// 엔진 설정의 `scan_interval_secs`를 간격으로 사용합니다.
    pub fn from_engine_config(engine: Arc<AlertEngine>) -> Self {
        let interval = Duration::from_secs(engine.config().scan_interval_secs);
        Self::new(engine, interval)
    }

    /// 종료용 취소 토큰을 반환합니다.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 스캔 루프를 백그라운드 태스크로 띄웁니다.
    ///
    /// 토큰이 취소될 때까지 간격마다 `run_scheduled()`를 호출합니다.
    /// 밀린 틱은 건너뜁니다 (평가가 간격보다 오래 걸린 경우).
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // interval의 첫 틱은 즉시 발화하므로 소비하고 시작
            ticker.tick().await;

            info!(interval_secs = self.interval.as_secs(), "scan scheduler started");
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        info!("scan scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = self.engine.run_scheduled();
                        if report.is_empty() {
                            debug!("scheduled scan finished with no findings");
                        } else {
                            info!(
                                alerts = report.alerts.len(),
                                failures = report.failures.len(),
                                "scheduled scan finished"
                            );
                        }
                    }
                }
            }
        })
    }
}
