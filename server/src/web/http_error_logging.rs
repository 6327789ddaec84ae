use crate::web::api::APIError;
use crate::web::ui::error::AppError;
use log::{debug, error, warn};

/// Log failed requests: client errors with warning level (unless they are expected in normal
/// operation), server errors with error level.
pub async fn error_logging_middleware<B: actix_web::body::MessageBody>(
    req: actix_web::dev::ServiceRequest,
    next: actix_web::middleware::Next<B>,
) -> Result<actix_web::dev::ServiceResponse<B>, actix_web::Error> {
    let response = next.call(req).await?;

    if let Some(error) = response.response().error() {
        let client_addr = response
            .request()
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_owned();
        if let Some(app_error) = error.as_error::<AppError>() {
            match app_error {
                AppError::PageNotFound => {
                    warn!(
                        "HTTP {} page not found at <{}>",
                        response.response().status(),
                        response.request().uri()
                    );
                }
                AppError::NotLoggedIn { session_error } => {
                    if let Some(session_error) = session_error {
                        warn!(
                            "HTTP {} invalid session token at <{}>. Client: <{}> Cause: {:?}",
                            response.response().status(),
                            response.request().uri(),
                            client_addr,
                            session_error
                        );
                    } else {
                        debug!(
                            "Redirecting client without session from <{}> to login",
                            response.request().uri()
                        );
                    }
                }
                AppError::PermissionDenied { required_privilege } => {
                    warn!(
                        "HTTP {} permission denied at <{}>. Client: <{}> Requires privilege: {:?}",
                        response.response().status(),
                        response.request().uri(),
                        client_addr,
                        required_privilege,
                    );
                }
                AppError::EntityNotFound | AppError::TransactionConflict => {}
                AppError::DatabaseConnectionError(e) => {
                    error!(
                        "HTTP {} database connection error: {}",
                        response.response().status(),
                        e
                    );
                }
                AppError::InternalError(e) => {
                    error!(
                        "HTTP {} internal server error at <{}>: {}",
                        response.response().status(),
                        response.request().uri(),
                        e
                    );
                }
            }
        } else if let Some(api_error) = error.as_error::<APIError>() {
            match api_error {
                APIError::PermissionDenied { required_privilege } => {
                    warn!(
                        "HTTP {} permission denied at <{}>. Client: <{}> Requires privilege: {:?}",
                        response.response().status(),
                        response.request().uri(),
                        client_addr,
                        required_privilege,
                    );
                }
                APIError::NoSessionToken => {
                    warn!(
                        "HTTP {} permission denied at <{}>. Client: <{}> Cause: No session token",
                        response.response().status(),
                        response.request().uri(),
                        client_addr,
                    );
                }
                APIError::InvalidSessionToken => {
                    warn!(
                        "HTTP {} invalid session token. Client: <{}>",
                        response.response().status(),
                        client_addr,
                    );
                }
                APIError::AuthenticationFailed => {
                    warn!(
                        "HTTP {} authentication failed. Client: <{}>",
                        response.response().status(),
                        client_addr,
                    );
                }
                APIError::NotExisting
                | APIError::AlreadyExisting
                | APIError::InvalidJson(_)
                | APIError::InvalidData(_)
                | APIError::ReservationRejected(_)
                | APIError::CancellationRejected(_)
                | APIError::TransactionConflict => {}
                APIError::InternalError(e) => {
                    error!(
                        "HTTP {} internal server error at <{}>: {}",
                        response.response().status(),
                        response.request().uri(),
                        e
                    );
                }
            }
        } else if response.response().status().is_server_error() {
            error!(
                "HTTP {} unexpected error at <{}>: {:?}",
                response.response().status(),
                response.request().uri(),
                error
            );
        } else {
            warn!(
                "HTTP {} at <{}>: {}",
                response.response().status(),
                response.request().uri(),
                error
            );
        }
    }
    Ok(response)
}
