//! 규칙 평가 벤치마크
//!
//! 윈도우 집계 규칙의 스캔 성능과 메시지 패턴 매칭 성능을 측정합니다.

use std::time::{Duration, SystemTime};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use logwarden_core::types::{LogLevel, LogRecord};
use logwarden_alert_engine::pattern::MessagePattern;
use logwarden_alert_engine::rule::{AlertRule, BruteForceRule, EvalContext, EvaluationTrigger};
use logwarden_alert_engine::{MemoryConfigStore, MemoryLogStore};

fn failed_login(ip: &str) -> LogRecord {
    let now = SystemTime::now();
    LogRecord {
        id: 0,
        source: "web_app".to_owned(),
        level: LogLevel::Error,
        timestamp: now - Duration::from_secs(10),
        ip: Some(ip.to_owned()),
        user: Some("admin".to_owned()),
        message: format!("Login failed for admin from {ip}"),
        raw_data: None,
        created_at: now,
    }
}

fn seeded_store(ips: usize, per_ip: usize) -> MemoryLogStore {
    let store = MemoryLogStore::new();
    for ip_suffix in 0..ips {
        for _ in 0..per_ip {
            store.insert(failed_login(&format!("10.0.{}.{}", ip_suffix / 256, ip_suffix % 256)));
        }
    }
    store
}

fn bench_brute_force_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("brute_force_scan");

    for record_count in [100usize, 1_000, 10_000] {
        let logs = seeded_store(record_count / 10, 10);
        let config = MemoryConfigStore::new();
        let rule = BruteForceRule::new();

        group.throughput(Throughput::Elements(record_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(record_count),
            &record_count,
            |b, _| {
                b.iter(|| {
                    let ctx = EvalContext {
                        logs: &logs,
                        config: &config,
                        now: SystemTime::now(),
                    };
                    rule.evaluate(black_box(&ctx), black_box(&EvaluationTrigger::Sweep))
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

fn bench_pattern_matching(c: &mut Criterion) {
    let phrase_pattern = MessagePattern::login_failure();
    let regex_pattern =
        MessagePattern::with_regex(r"(?i)login.*failed|authentication.*failed").unwrap();
    let message = "Login failed for admin from 192.168.1.100 after 3 attempts";

    let mut group = c.benchmark_group("message_pattern");
    group.throughput(Throughput::Elements(1));

    group.bench_function("phrases", |b| {
        b.iter(|| phrase_pattern.matches(black_box(message)))
    });

    group.bench_function("regex", |b| {
        b.iter(|| regex_pattern.matches(black_box(message)))
    });

    group.finish();
}

criterion_group!(benches, bench_brute_force_scan, bench_pattern_matching);
criterion_main!(benches);
