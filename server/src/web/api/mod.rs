use std::fmt::Display;

mod endpoints_auth;
mod endpoints_feed;
mod endpoints_free_day;
mod endpoints_global_vars;
mod endpoints_guest;
mod endpoints_location;
mod endpoints_profile;
mod endpoints_reservation;
mod endpoints_restriction;
#[cfg(test)]
pub(super) mod tests;

use crate::auth_session::SessionToken;
use crate::data_store::auth_token::Privilege;
use crate::data_store::{LocationId, SlotFilter, StoreError};
use crate::web::ui::form_values::ValidateFromFormInput;
use actix_web::error::JsonPayloadError;
use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    web, HttpResponse,
};
use serde_json::json;

pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.service(get_api_service());
}

fn get_api_service() -> actix_web::Scope {
    let json_config =
        web::JsonConfig::default().error_handler(|err, _req| APIError::InvalidJson(err).into());
    web::scope("/api/v1")
        .app_data(json_config)
        .service(endpoints_auth::signup)
        .service(endpoints_auth::login)
        .service(endpoints_auth::get_own_profile)
        .service(endpoints_auth::update_password)
        .service(endpoints_location::list_locations)
        .service(endpoints_location::list_tables)
        .service(endpoints_location::list_reservations_of_day)
        .service(endpoints_feed::reservation_feed)
        .service(endpoints_reservation::create_reservation)
        .service(endpoints_reservation::cancel_reservation)
        .service(endpoints_reservation::list_own_reservations)
        .service(endpoints_guest::list_guest_invites)
        .service(endpoints_guest::create_guest_invite)
        .service(endpoints_guest::delete_guest_invite)
        .service(endpoints_restriction::list_restrictions)
        .service(endpoints_restriction::create_restriction)
        .service(endpoints_restriction::delete_restriction)
        .service(endpoints_free_day::list_free_days)
        .service(endpoints_free_day::create_or_update_free_day)
        .service(endpoints_free_day::delete_free_day)
        .service(endpoints_global_vars::get_global_vars)
        .service(endpoints_global_vars::update_global_vars)
        .service(endpoints_profile::list_profiles)
        .service(endpoints_profile::change_profile)
}

#[derive(Debug)]
pub enum APIError {
    NotExisting,
    AlreadyExisting,
    PermissionDenied {
        required_privilege: Privilege,
    },
    NoSessionToken,
    InvalidSessionToken,
    AuthenticationFailed,
    InvalidJson(actix_web::error::JsonPayloadError),
    InvalidData(String),
    /// A booking rule refused the reservation. Contains the human-readable reason.
    ReservationRejected(String),
    CancellationRejected(String),
    TransactionConflict,
    InternalError(String),
}

impl Display for APIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotExisting => f.write_str("Element does not exist")?,
            Self::AlreadyExisting => {
                f.write_str("Element already exists")?;
            },
            Self::PermissionDenied{required_privilege} => {
                write!(f, "Client is not authorized to perform this action. Authentication as {} is required.",
                       required_privilege
                           .qualifying_roles()
                           .iter()
                           .map(|role| role.name().to_owned())
                           .collect::<Vec<String>>()
                           .join(" or "))?;
            },
            Self::NoSessionToken => {
                f.write_str("This action requires authentication, but client did not send authentication session token.")?
            },
            Self::InvalidSessionToken => {
                f.write_str("This action requires authentication, but client authentication session given by the client is not valid.")?
            },
            Self::AuthenticationFailed => {
                f.write_str("Authentication with the given email address and password failed.")?;
            }
            Self::InternalError(s) => {
                f.write_str("Internal error: ")?;
                f.write_str(s)?;
            },
            Self::InvalidJson(e) => {
                write!(f, "Invalid JSON request data: {}", e)?;
            },
            Self::InvalidData(e) => {
                write!(f, "Invalid request data: {}", e)?;
            },
            Self::ReservationRejected(reason) | Self::CancellationRejected(reason) => {
                f.write_str(reason)?;
            },
            Self::TransactionConflict => {
                f.write_str("Concurrent database transaction conflict. Please retry request.")?;
            },
        };
        Ok(())
    }
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse {
        let message = format!("{}", self);

        if let Self::ReservationRejected(reason) = self {
            return HttpResponse::build(self.status_code()).json(
                rezervari_api_types::CreateReservationResult {
                    error: Some(reason.clone()),
                    reservation: None,
                },
            );
        }
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({
                "httpCode": self.status_code().as_u16(),
                "message": message
            }))
    }
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotExisting => StatusCode::NOT_FOUND,
            Self::AlreadyExisting => StatusCode::CONFLICT,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::NoSessionToken => StatusCode::FORBIDDEN,
            Self::InvalidSessionToken => StatusCode::FORBIDDEN,
            Self::AuthenticationFailed => StatusCode::FORBIDDEN,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidJson(e) => match e {
                JsonPayloadError::ContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                JsonPayloadError::Deserialize(json_error) if json_error.is_data() => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                _ => StatusCode::BAD_REQUEST,
            },
            Self::InvalidData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ReservationRejected(_) | Self::CancellationRejected(_) => StatusCode::CONFLICT,
            Self::TransactionConflict => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConnectionError(error) => {
                Self::InternalError(format!("Could not connect to database: {}", error))
            }
            StoreError::QueryError(diesel_error) => Self::InternalError(format!(
                "Error while executing database query: {}",
                diesel_error
            )),
            StoreError::TransactionConflict => Self::TransactionConflict,
            StoreError::NotExisting => Self::NotExisting,
            StoreError::ConflictEntityExists => Self::AlreadyExisting,
            StoreError::PermissionDenied { required_privilege } => {
                Self::PermissionDenied { required_privilege }
            }
            StoreError::AuthenticationFailed => Self::AuthenticationFailed,
            StoreError::ReservationRejected(reason) => Self::ReservationRejected(reason.to_string()),
            StoreError::CancellationRejected(reason) => {
                Self::CancellationRejected(reason.to_string())
            }
            StoreError::InvalidInputData(e) => Self::InvalidData(e),
            StoreError::InvalidDataInDatabase(e) => Self::InternalError(format!(
                "Data queried from database could not be deserialized: {}",
                e
            )),
            StoreError::RandomnessUnavailable => {
                Self::InternalError("Could not generate random bytes".to_owned())
            }
        }
    }
}

impl From<actix_web::error::BlockingError> for APIError {
    fn from(_e: actix_web::error::BlockingError) -> Self {
        APIError::InternalError(
            "Could not get thread from thread pool for synchronous database operation.".to_owned(),
        )
    }
}

impl From<crate::auth_session::SessionError> for APIError {
    fn from(_e: crate::auth_session::SessionError) -> Self {
        APIError::InvalidSessionToken
    }
}

/// Validate a single request field with the form validation rules of the web UI.
fn validate_field<T: ValidateFromFormInput>(field_name: &str, value: &str) -> Result<T, APIError> {
    T::from_form_value(value).map_err(|e| APIError::InvalidData(format!("{}: {}", field_name, e)))
}

/// Query parameters for filtering slot-bound entities (guest invites, restrictions)
#[derive(serde::Deserialize)]
struct SlotQuery {
    location_id: Option<LocationId>,
    date: Option<chrono::NaiveDate>,
    from_date: Option<chrono::NaiveDate>,
}

impl From<SlotQuery> for SlotFilter {
    fn from(query: SlotQuery) -> Self {
        let mut builder = SlotFilter::builder();
        if let Some(location_id) = query.location_id {
            builder = builder.at_location(location_id);
        }
        if let Some(date) = query.date {
            builder = builder.on_date(date);
        }
        if let Some(from_date) = query.from_date {
            builder = builder.from_date(from_date);
        }
        builder.build()
    }
}

/// Extract and check the session token from the optional `X-SESSION-TOKEN` header.
fn require_session_token(
    session_token_header: Option<web::Header<SessionTokenHeader>>,
    secret: &str,
) -> Result<SessionToken, APIError> {
    Ok(session_token_header
        .ok_or(APIError::NoSessionToken)?
        .into_inner()
        .session_token(secret)?)
}

pub(crate) struct SessionTokenHeader(String);
#[allow(clippy::identity_op)] // We want to explicitly state that it's "1" year
pub(crate) const SESSION_TOKEN_MAX_AGE: std::time::Duration =
    std::time::Duration::from_secs(1 * 86400 * 365);

impl SessionTokenHeader {
    fn session_token(
        &self,
        secret: &str,
    ) -> Result<crate::auth_session::SessionToken, crate::auth_session::SessionError> {
        SessionToken::from_string(&self.0, secret, SESSION_TOKEN_MAX_AGE)
    }
}

impl actix_web::http::header::TryIntoHeaderValue for SessionTokenHeader {
    type Error = actix_web::http::header::InvalidHeaderValue;

    fn try_into_value(self) -> Result<actix_web::http::header::HeaderValue, Self::Error> {
        self.0.parse()
    }
}

impl actix_web::http::header::Header for SessionTokenHeader {
    fn name() -> actix_web::http::header::HeaderName {
        "X-SESSION-TOKEN"
            .try_into()
            .expect("Session Token Header name should be a valid header name")
    }

    fn parse<M: actix_web::HttpMessage>(msg: &M) -> Result<Self, actix_web::error::ParseError> {
        Ok(Self(
            msg.headers()
                .get(Self::name())
                .ok_or(actix_web::error::ParseError::Header)?
                .to_str()
                .unwrap_or("")
                .to_owned(),
        ))
    }
}
