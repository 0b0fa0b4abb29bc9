use actix_web::{web, HttpRequest, HttpResponse};
use notifications::background::PatientNotification;
use serde::Deserialize;

use crate::{
    app_container::Application,
    authentication::{AuthenticatedUserInfo, DISPATCH_NOTIFICATIONS},
    errors::ApiError,
};

#[derive(Debug, Deserialize)]
struct DailyDispatchRequest {
    window_days: Option<u16>,
}

/// Trigger for the daily reminder run, hit by the external scheduler. An
/// absent body or window falls back to the configured day range.
#[tracing::instrument(err, skip(app), level = "info")]
async fn send_daily_notifications(
    data: Option<web::Json<DailyDispatchRequest>>,
    app: web::Data<Application>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let user: AuthenticatedUserInfo = (&req).try_into()?;
    user.check_for_permission(DISPATCH_NOTIFICATIONS)?;

    let window_days = data.and_then(|data| data.window_days);
    app.dispatcher
        .send_daily_notifications(window_days)
        .await
        .map_err(ApiError::InternalServerError)?;

    Ok(HttpResponse::Ok().finish())
}

#[derive(Deserialize)]
struct PatientNotificationRequest {
    title: String,
    body: String,
}

/// Queues a one-off notification for a patient (e.g. their consultation
/// question was answered). Fire and forget: delivery happens on the
/// background worker and failures land in the logs.
#[tracing::instrument(err, skip(app, data), level = "info")]
async fn notify_patient(
    path: web::Path<uuid::Uuid>,
    data: web::Json<PatientNotificationRequest>,
    app: web::Data<Application>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let user: AuthenticatedUserInfo = (&req).try_into()?;
    user.check_for_permission(DISPATCH_NOTIFICATIONS)?;

    let data = data.into_inner();
    app.notification_tasks
        .submit(PatientNotification {
            patient_id: path.into_inner().into(),
            title: data.title,
            body: data.body,
        })
        .await
        .map_err(ApiError::InternalServerError)?;

    Ok(HttpResponse::Accepted().finish())
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .service(web::resource("/daily").route(web::post().to(send_daily_notifications))),
    );
    cfg.service(
        web::scope("/patients").service(
            web::resource("/{patient_id}/notifications").route(web::post().to(notify_patient)),
        ),
    );
}
