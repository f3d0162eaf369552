use actix_web::web;

use crate::handlers::home::home;

mod contact;
mod json_error;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home);

    cfg.service(
        web::scope("/api/v1")
            .configure(json_error::config_routes)
            .configure(contact::config_routes)
    );
}
