use actix_web::{web, HttpRequest, HttpResponse};
use entities::devices::DeviceId;
use entities::notifications::PushToken;
use serde::{Deserialize, Serialize};

use crate::{
    app_container::Application, authentication::AuthenticatedUserInfo, errors::ApiError,
};

#[derive(Deserialize)]
struct DeviceRegistrationRequest {
    device_name: String,
    push_token: String,
}

#[derive(Serialize)]
struct DeviceRegistrationResponse {
    device_id: DeviceId,
}

/// Called from the login/signup flow; the caller mints an access token
/// binding the patient to the returned device id.
#[tracing::instrument(err, skip(app, data), level = "info")]
async fn register_device(
    data: web::Json<DeviceRegistrationRequest>,
    app: web::Data<Application>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let user: AuthenticatedUserInfo = (&req).try_into()?;
    let patient_id = user.patient_id()?;

    let data = data.into_inner();
    let device_id = app
        .device_registry
        .register_device(
            patient_id,
            data.device_name,
            PushToken::from(data.push_token),
        )
        .await
        .map_err(ApiError::InternalServerError)?;

    Ok(HttpResponse::Ok().json(DeviceRegistrationResponse { device_id }))
}

#[tracing::instrument(err, skip(app), level = "info")]
async fn deregister_device(
    path: web::Path<uuid::Uuid>,
    app: web::Data<Application>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let user: AuthenticatedUserInfo = (&req).try_into()?;
    let _ = user.patient_id()?;

    let device_id = DeviceId::from(path.into_inner());
    user.check_device_access(device_id)?;

    app.device_registry
        .deregister_device(device_id)
        .await
        .map_err(ApiError::InternalServerError)?;

    Ok(HttpResponse::Ok().finish())
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/devices")
            .service(web::resource("").route(web::post().to(register_device)))
            .service(web::resource("/{device_id}").route(web::delete().to(deregister_device))),
    );
}
