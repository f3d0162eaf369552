use actix_web::web;

use crate::handlers::{contact, system};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(contact::csrf_token)
        .service(contact::submit_contact)
        .service(system::health_check);
}
