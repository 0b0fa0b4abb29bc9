use actix_web::http::header::Header;
use actix_web::{web, HttpRequest};
use actix_web_httpauth::headers::authorization;
use anyhow::Context;
use entities::devices::DeviceId;
use entities::patients::PatientId;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde::{Deserialize, Serialize};

use crate::app_container::Application;
use crate::errors::ApiError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    /// Present on patient tokens, which are minted per login bound to the
    /// device the login registered.
    #[serde(default)]
    device_id: Option<uuid::Uuid>,
    /// Present on staff tokens issued by the web console.
    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Debug)]
pub struct AuthenticatedUserInfo {
    claims: Claims,
}

pub const DISPATCH_NOTIFICATIONS: &str = "notifications:dispatch";

impl AuthenticatedUserInfo {
    pub fn patient_id(&self) -> Result<PatientId, ApiError> {
        let id = uuid::Uuid::parse_str(&self.claims.sub)
            .map_err(|_| ApiError::Unauthorized("Token subject is not a patient id".to_string()))?;
        Ok(id.into())
    }

    /// Patient tokens are minted per login and carry the device that login
    /// registered; such a token may only act on its own device. Staff
    /// tokens carry no device claim and are unrestricted.
    pub fn check_device_access(&self, device_id: DeviceId) -> Result<(), ApiError> {
        match self.claims.device_id {
            None => Ok(()),
            Some(own) if own == device_id.inner() => Ok(()),
            Some(_) => Err(ApiError::Forbidden(
                "Token is not bound to this device".to_string(),
            )),
        }
    }

    pub fn check_for_permission(&self, permission: &str) -> Result<(), ApiError> {
        if self
            .claims
            .permissions
            .iter()
            .any(|granted| granted == permission)
        {
            return Ok(());
        }
        Err(ApiError::Forbidden(format!(
            "Missing permission {permission}"
        )))
    }
}

impl TryFrom<&HttpRequest> for AuthenticatedUserInfo {
    type Error = ApiError;

    fn try_from(req: &HttpRequest) -> Result<Self, Self::Error> {
        let token = authorization::Authorization::<authorization::Bearer>::parse(req)
            .context("Failed to extract bearer token")
            .map_err(|err| ApiError::Unauthorized(format!("{err:?}")))?;
        let token = token.as_ref().token().to_string();

        let app = req
            .app_data::<web::Data<Application>>()
            .ok_or_else(|| ApiError::Unauthorized("Application state is missing".to_string()))?;

        let claims = decode::<Claims>(
            &token,
            &app.jwt_decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|err| ApiError::Unauthorized(format!("{err:?}")))?
        .claims;

        Ok(Self { claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_device(device_id: Option<uuid::Uuid>) -> AuthenticatedUserInfo {
        AuthenticatedUserInfo {
            claims: Claims {
                sub: uuid::Uuid::new_v4().to_string(),
                exp: 0,
                device_id,
                permissions: vec![],
            },
        }
    }

    #[test]
    fn test_patient_token_may_only_touch_its_own_device() {
        let own_device = DeviceId::new();
        let user = user_with_device(Some(own_device.inner()));

        assert!(user.check_device_access(own_device).is_ok());
        assert!(matches!(
            user.check_device_access(DeviceId::new()),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_staff_token_without_device_claim_is_unrestricted() {
        let user = user_with_device(None);
        assert!(user.check_device_access(DeviceId::new()).is_ok());
    }
}
