use crate::auth_session::SessionToken;
use crate::booking::schedule;
use crate::data_store::{LocationId, StoreError};
use crate::web::ui::error::AppError;
use crate::web::ui::flash::{FlashMessage, FlashType, FlashesInterface};
use crate::web::AppState;
use actix_web::error::UrlGenerationError;
use actix_web::http::header;
use actix_web::http::header::{ContentType, TryIntoHeaderValue};
use actix_web::{HttpRequest, HttpResponse};
use askama::Template;

#[allow(clippy::identity_op)] // We want to explicitly state that it's "1" year
pub const SESSION_COOKIE_MAX_AGE: std::time::Duration =
    std::time::Duration::from_secs(1 * 86400 * 365);
pub const SESSION_COOKIE_NAME: &str = "rezervari-session";

/// Extract the session token from the session token cookie and validate it
///
/// Returns [AppError::NotLoggedIn] if there is no (valid) session cookie, which makes the error page
/// middleware redirect to the login page.
pub fn extract_session_token(
    app_state: &AppState,
    request: &HttpRequest,
) -> Result<SessionToken, AppError> {
    SessionToken::from_string(
        request
            .cookie(SESSION_COOKIE_NAME)
            .ok_or(AppError::NotLoggedIn {
                session_error: None,
            })?
            .value(),
        &app_state.secret,
        SESSION_COOKIE_MAX_AGE,
    )
    .map_err(|session_error| AppError::NotLoggedIn {
        session_error: Some(session_error),
    })
}

/// Like [extract_session_token], but returns `None` when there is no valid session, for pages
/// that are reachable without logging in.
pub fn extract_session_token_if_present(
    app_state: &AppState,
    request: &HttpRequest,
) -> Option<SessionToken> {
    extract_session_token(app_state, request).ok()
}

pub fn create_session_cookie(
    session_token: SessionToken,
    secret: &str,
) -> actix_web::cookie::Cookie<'static> {
    let mut cookie =
        actix_web::cookie::Cookie::new(SESSION_COOKIE_NAME, session_token.as_string(secret));
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(actix_web::cookie::SameSite::Lax);
    cookie.set_expires(actix_web::cookie::time::OffsetDateTime::now_utc() + SESSION_COOKIE_MAX_AGE);
    cookie
}

/// Cookie for replacing and expiring the session cookie on logout
pub fn create_logout_cookie() -> actix_web::cookie::Cookie<'static> {
    let mut cookie = actix_web::cookie::Cookie::new(SESSION_COOKIE_NAME, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

/// Generate a URL that takes the member to the day view of the given location and date.
pub fn url_for_day_view(
    req: &HttpRequest,
    location_id: LocationId,
    date: chrono::NaiveDate,
) -> Result<String, UrlGenerationError> {
    Ok(day_view_url(req, location_id, date)?.to_string())
}

/// Like [url_for_day_view], but only the path, for use as `redirect_to` form value
pub fn path_for_day_view(
    req: &HttpRequest,
    location_id: LocationId,
    date: chrono::NaiveDate,
) -> Result<String, UrlGenerationError> {
    Ok(day_view_url(req, location_id, date)?.path().to_owned())
}

fn day_view_url(
    req: &HttpRequest,
    location_id: LocationId,
    date: chrono::NaiveDate,
) -> Result<url::Url, UrlGenerationError> {
    req.url_for(
        "day_view",
        [
            location_id.to_string(),
            schedule::date_to_iso_string(date),
        ],
    )
}

/// Only accept local redirect targets within the ui to avoid open redirects.
pub fn sanitize_redirect_target(target: Option<&str>) -> Option<&str> {
    target.filter(|t| t.starts_with("/ui/") && !t.starts_with("//"))
}

/// Outcome of storing the data of a submitted form
pub enum FormSubmitResult {
    Success,
    ValidationError,
    TransactionConflict,
    /// The data store refused the data. The message is shown to the user.
    Rejected(String),
    UnexpectedError(AppError),
}

impl<T> From<Result<T, StoreError>> for FormSubmitResult {
    fn from(value: Result<T, StoreError>) -> Self {
        match value {
            Ok(_) => FormSubmitResult::Success,
            Err(StoreError::TransactionConflict) => FormSubmitResult::TransactionConflict,
            Err(StoreError::ConflictEntityExists) => FormSubmitResult::Rejected(
                "Există deja o înregistrare cu aceste date.".to_owned(),
            ),
            Err(StoreError::InvalidInputData(e)) => FormSubmitResult::Rejected(e),
            Err(e) => FormSubmitResult::UnexpectedError(e.into()),
        }
    }
}

/// Create the HTTP response for a submitted create/edit form
///
/// On success, a success flash is added and the client is redirected to `success_url`. Otherwise,
/// an error flash is added and the given form template (which should contain the submitted form
/// data, including validation errors) is rendered with status 422.
///
/// `entity_name` is used in the flash messages, e.g. "Ziua liberă".
pub fn create_edit_form_response(
    result: FormSubmitResult,
    tmpl: &impl Template,
    entity_name: &str,
    success_url: String,
    req: &HttpRequest,
) -> Result<HttpResponse, AppError> {
    match result {
        FormSubmitResult::Success => {
            req.add_flash_message(FlashMessage::new(
                FlashType::Success,
                format!("{} a fost salvat(ă).", entity_name),
            ));
            return Ok(HttpResponse::SeeOther()
                .append_header((header::LOCATION, success_url))
                .finish());
        }
        FormSubmitResult::ValidationError => {
            req.add_flash_message(FlashMessage::new(
                FlashType::Error,
                "Datele introduse nu sunt valide. Verificați câmpurile marcate.",
            ));
        }
        FormSubmitResult::TransactionConflict => {
            req.add_flash_message(FlashMessage::new(
                FlashType::Error,
                format!(
                    "{} nu a putut fi salvat(ă) din cauza unui acces simultan la baza de date. Vă rugăm reîncercați.",
                    entity_name
                ),
            ));
        }
        FormSubmitResult::Rejected(message) => {
            req.add_flash_message(FlashMessage::new(FlashType::Error, message));
        }
        FormSubmitResult::UnexpectedError(e) => return Err(e),
    }
    Ok(html_response(
        HttpResponse::UnprocessableEntity(),
        tmpl.render()?,
    ))
}

/// Finish the given response builder with an HTML body
pub fn html_response(mut builder: actix_web::HttpResponseBuilder, body: String) -> HttpResponse {
    builder
        .append_header((
            header::CONTENT_TYPE,
            ContentType::html()
                .try_into_value()
                .expect("HTML content type should be a valid header value"),
        ))
        .body(body)
}

/// Redirect (303) to the given URL after a successful POST request
pub fn see_other(url: impl Into<String>) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, url.into()))
        .finish()
}
