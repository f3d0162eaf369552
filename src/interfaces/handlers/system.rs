use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use humantime::format_duration;
use serde::Serialize;
use std::time::Duration;

use crate::{constants::START_TIME, AppState};

#[derive(Serialize)]
struct HealthCheckResponse {
    status: &'static str,
    uptime: String,
    timestamp: String,
    start_at: String,
    store_backend: &'static str,
    store_status: &'static str,
    version: &'static str,
}

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let now_utc = Utc::now();
    let uptime = now_utc.signed_duration_since(*START_TIME);
    let human_uptime = format_duration(Duration::from_secs(uptime.num_seconds().max(0) as u64));

    let store_status = match state.store.ping().await {
        Ok(()) => "OK",
        Err(e) => {
            tracing::warn!("Health check store ping failed: {}", e);
            "Unavailable"
        }
    };

    let response = HealthCheckResponse {
        status: if store_status == "OK" { "healthy" } else { "degraded" },
        uptime: human_uptime.to_string(),
        timestamp: now_utc.to_rfc3339(),
        start_at: START_TIME.to_rfc3339(),
        store_backend: state.store.backend(),
        store_status,
        version: env!("CARGO_PKG_VERSION"),
    };

    if store_status == "OK" {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
