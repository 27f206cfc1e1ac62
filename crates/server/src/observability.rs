use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

// Prometheus metrics (default registry)
pub static ACCOUNTS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("account_service_accounts_created_total", "Total accounts created")
        .expect("register accounts_created_total")
});

pub static TOKENS_ISSUED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("account_service_tokens_issued_total", "Total successful token requests")
        .expect("register tokens_issued_total")
});

pub static AUTH_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "account_service_auth_failures_total",
        "Total token requests rejected for bad credentials"
    )
    .expect("register auth_failures_total")
});

pub static TOKEN_REJECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "account_service_token_rejections_total",
        "Total requests rejected by token authentication"
    )
    .expect("register token_rejections_total")
});

pub static PROFILE_UPDATES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("account_service_profile_updates_total", "Total self-service profile updates")
        .expect("register profile_updates_total")
});

/// Touch every counter so it is exported before its first increment.
pub fn register_all() {
    Lazy::force(&ACCOUNTS_CREATED_TOTAL);
    Lazy::force(&TOKENS_ISSUED_TOTAL);
    Lazy::force(&AUTH_FAILURES_TOTAL);
    Lazy::force(&TOKEN_REJECTIONS_TOTAL);
    Lazy::force(&PROFILE_UPDATES_TOTAL);
}

pub fn encode_metrics() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}"));
    }
    (StatusCode::OK, String::from_utf8(buffer).unwrap_or_default())
}
