use authcore::{AuthConfig, AuthServer, ManualClock};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

fn server_with_user(config: AuthConfig) -> (AuthServer, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let server = AuthServer::with_clock(config, clock.clone()).expect("valid config");
    let uid = server.create_user("bench", "bench-password").expect("fresh user");
    let role = server.create_role("reader").expect("fresh role");
    server.add_role_to_user(uid, role).expect("grant");
    (server, clock)
}

fn bench_authenticate(c: &mut Criterion) {
    let mut group = c.benchmark_group("authenticate");
    group.throughput(Throughput::Elements(1));

    let (server, _clock) = server_with_user(AuthConfig::default());
    group.bench_function("issue", |b| {
        b.iter(|| black_box(server.authenticate("bench", "bench-password").unwrap()));
    });

    group.bench_function("reject_unknown_user", |b| {
        b.iter(|| black_box(server.authenticate("nobody", "bench-password").is_err()));
    });
    group.finish();
}

fn bench_check_role(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_role");

    for &resident in &[1_000usize, 100_000] {
        let (server, _clock) = server_with_user(AuthConfig::default());
        let role = server.role_by_name("reader").unwrap().id;
        for _ in 0..resident {
            server.authenticate("bench", "bench-password").unwrap();
        }
        let token = server.authenticate("bench", "bench-password").unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(resident), &token, |b, token| {
            b.iter(|| black_box(server.check_role(token.as_str(), role).unwrap()));
        });
    }
    group.finish();
}

/// Issuance that crosses an epoch boundary with a full bucket to reclaim.
fn bench_epoch_rollover(c: &mut Criterion) {
    let config = AuthConfig {
        token_ttl_secs: 60,
        prune_window_secs: 60,
        ..AuthConfig::default()
    };
    let mut group = c.benchmark_group("epoch_rollover");

    for &per_epoch in &[100usize, 10_000] {
        group.throughput(Throughput::Elements(per_epoch as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(per_epoch),
            &per_epoch,
            |b, &per_epoch| {
                let (server, clock) = server_with_user(config.clone());
                b.iter(|| {
                    for _ in 0..per_epoch {
                        server.authenticate("bench", "bench-password").unwrap();
                    }
                    clock.advance(Duration::from_secs(180));
                    black_box(server.token_count())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_authenticate,
    bench_check_role,
    bench_epoch_rollover
);
criterion_main!(benches);
