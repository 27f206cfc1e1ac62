use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use service::auth::{AccountService, memory::InMemoryCredentialStore, password::PasswordHashing};

fn bench_issue_token(c: &mut Criterion) {
    let store = Arc::new(InMemoryCredentialStore::new(PasswordHashing::default()));
    let svc = AccountService::new(store);
    let body = serde_json::json!({"email": "bench@example.com", "password": "Benchmark1", "name": "Bench"});

    // pre-create user outside of the benchmark using a tokio runtime
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(svc.create_account(&body)).unwrap();

    c.bench_function("issue_token_verify", |b| {
        b.iter(|| {
            rt.block_on(svc.issue_token(&body)).unwrap();
        });
    });

    let unknown = serde_json::json!({"email": "nobody@example.com", "password": "Benchmark1"});
    c.bench_function("issue_token_unknown_email", |b| {
        b.iter(|| {
            let _ = rt.block_on(svc.issue_token(&unknown));
        });
    });
}

criterion_group!(benches, bench_issue_token);
criterion_main!(benches);
