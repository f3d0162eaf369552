use actix_web::{error::InternalError, web, HttpResponse};
use serde_json::json;

use crate::constants::MAX_JSON_PAYLOAD;

/// Malformed or oversized JSON bodies get the same error shape as the
/// contact pipeline's own failures.
pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(MAX_JSON_PAYLOAD)
            .error_handler(|err, _req| {
                let message = format!("Invalid request body: {}", err);
                let response = HttpResponse::BadRequest().json(json!({
                    "error": "invalid_json",
                    "message": message,
                }));
                InternalError::from_response(err, response).into()
            }),
    );
}
