mod devices;
mod notifications;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(devices::init_routes)
            .configure(notifications::init_routes),
    );
}
