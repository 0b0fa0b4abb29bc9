use crate::app_container::Application;
use crate::configuration::Settings;
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use actix_web_opentelemetry::RequestTracing;
use anyhow::Context;
use sqlx_postgres::repository::Repository;
use tracing_actix_web::TracingLogger;

mod app_container;
mod authentication;
mod configuration;
mod errors;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shared_kernel::tracing::config_telemetry("clinic_http_server");

    let settings = Settings::parse()?;
    let repository = Repository::new().await?;
    let application = web::Data::new(Application::new(repository, &settings));

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(RequestTracing::new())
            .wrap(Cors::permissive())
            .configure(routes::config)
            .app_data(application.clone())
    })
    .bind("127.0.0.1:8080")?
    .run()
    .await
    .context("Server failed to run")?;

    shared_kernel::tracing::shutdown_global_tracer_provider();
    Ok(())
}
