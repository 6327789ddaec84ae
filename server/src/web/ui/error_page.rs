//! This module provides functionality to generate nice-looking error pages for errors returned from
//! handler functions.
//!
//! This is achieved by an actix-web middleware that replaces the body of the HTTP response in the
//! case of an error. In contrast to rendering the error page in our [actix_web::ResponseError]
//! implementation, this allows us to access the HTTP Request, e.g. for generating URLs to static
//! files and other pages.
use crate::web::ui::base_template::BaseTemplateContext;
use crate::web::ui::error::AppError;
use crate::web::ui::flash::{FlashMessage, FlashType, FlashesInterface};
use crate::web::ui::endpoints::auth::LoginQueryData;
use crate::web::ui::util;
use actix_web::body::EitherBody;
use actix_web::http::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use actix_web::http::{Method, StatusCode};
use actix_web::{HttpRequest, ResponseError};
use askama::Template;

/// An actix-web middleware for generating nice error pages
///
/// The middleware replaces the body of the existing HTTP response (typically generated from the
/// error's ResponseError implementation) with a nice error page, when an error has been returned by
/// the endpoint handler function. The error itself stays attached to the response, so that it can
/// still be logged by outer middlewares. The nice error page is generated from askama templates,
/// extending the "base.html" template to keep the application's look & feel. In case, rendering
/// the template fails, we fall back to a plain text representation of the error.
///
/// Two [AppError]s are not shown as error pages, but as redirects:
/// * [AppError::NotLoggedIn] redirects to the login page, which takes the member back to the
///   requested page afterwards.
/// * [AppError::PermissionDenied] redirects to the start page and shows an error flash message.
///
/// Typical usage:
/// ```ignore
/// use crate::web::ui::error::AppError;
///
/// let service = actix_web::web::scope("/ui")
///     .service(my_endpoint)
///     .wrap(actix_web::middleware::from_fn(error_page_middleware));
///
/// #[actix_web::get("/my_endpoint")]
/// async fn my_endpoint() -> Result<impl actix_web::Responder, AppError> {
///     todo!()
/// }
/// ```
pub async fn error_page_middleware<B: actix_web::body::MessageBody>(
    req: actix_web::dev::ServiceRequest,
    next: actix_web::middleware::Next<B>,
) -> Result<actix_web::dev::ServiceResponse<EitherBody<B, String>>, actix_web::Error> {
    let response = next.call(req).await?;

    if response.response().error().is_none() {
        return Ok(response.map_body(|_, body| EitherBody::left(body)));
    }

    let (req, res) = response.into_parts();
    let error = res
        .error()
        .expect("We checked that res has an error, above.");
    let replacement = match error.as_error::<AppError>() {
        Some(AppError::NotLoggedIn { .. }) => Replacement::Redirect(login_redirect_url(&req)),
        Some(AppError::PermissionDenied { .. }) => {
            req.add_flash_message(FlashMessage::new(
                FlashType::Error,
                "Nu aveți permisiunea de a accesa această pagină.",
            ));
            Replacement::Redirect(
                req.url_for_static("index")
                    .map(|url| url.to_string())
                    .unwrap_or_else(|_| "/".to_owned()),
            )
        }
        Some(app_error) => Replacement::Page(generate_app_error_page(app_error, &req)),
        None => Replacement::Page(generate_generic_error_page(error.as_response_error(), &req)),
    };

    let mut res = match replacement {
        Replacement::Redirect(url) => {
            let mut res = res.set_body(String::new());
            *res.status_mut() = StatusCode::SEE_OTHER;
            if let Ok(value) = HeaderValue::from_str(&url) {
                res.headers_mut().insert(LOCATION, value);
            }
            res
        }
        Replacement::Page((body, content_type)) => {
            let mut res = res.set_body(body);
            res.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            res
        }
    };
    res.headers_mut().remove(actix_web::http::header::CONTENT_LENGTH);
    Ok(actix_web::dev::ServiceResponse::new(
        req,
        res.map_body(|_, body| EitherBody::right(body)),
    ))
}

enum Replacement {
    Redirect(String),
    /// Response body and content type
    Page((String, &'static str)),
}

/// URL of the login page, taking the client back to the current page after logging in (only for
/// GET requests).
fn login_redirect_url(req: &HttpRequest) -> String {
    let login_url = req
        .url_for_static("login_form")
        .map(|url| url.to_string())
        .unwrap_or_else(|_| "/ui/login".to_owned());
    if req.method() != Method::GET {
        return login_url;
    }
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned());
    match serde_urlencoded::to_string(LoginQueryData {
        redirect_to: util::sanitize_redirect_target(target.as_deref()).map(|t| t.to_owned()),
    }) {
        Ok(query) if !query.is_empty() => format!("{}?{}", login_url, query),
        _ => login_url,
    }
}

/// Generate a nice error page with additional information and help for the given [AppError].
fn generate_app_error_page(
    app_error: &AppError,
    http_request: &HttpRequest,
) -> (String, &'static str) {
    let tmpl = AppErrorTemplate {
        base: BaseTemplateContext {
            request: http_request,
            page_title: "Eroare",
            auth_token: None,
            active_nav_button: None,
        },
        error: app_error,
        url: &http_request.full_url(),
        timestamp: chrono::Local::now(),
    };
    render_template_or_show_error_as_string(tmpl, app_error)
}

/// Generate a nice error page for the given `error`, using its string representation.
fn generate_generic_error_page(
    error: &dyn ResponseError,
    http_request: &HttpRequest,
) -> (String, &'static str) {
    let tmpl = ErrorTemplate {
        base: BaseTemplateContext {
            request: http_request,
            page_title: "Eroare",
            auth_token: None,
            active_nav_button: None,
        },
        error,
        url: &http_request.full_url(),
        timestamp: chrono::Local::now(),
    };
    render_template_or_show_error_as_string(tmpl, error)
}

/// Try to render the given [askama::Template] structure as an HTML error page body.
///
/// In case of an error while rendering the template, return a plain text body with the error's
/// string representation.
fn render_template_or_show_error_as_string(
    tmpl: impl Template,
    error: &dyn ResponseError,
) -> (String, &'static str) {
    match tmpl.render() {
        Ok(body) => (body, "text/html; charset=utf-8"),
        Err(err) => (
            format!(
                "Error: {}\n(Could not render nice error page: {})",
                error, err
            ),
            "text/plain; charset=utf-8",
        ),
    }
}

#[derive(Template)]
#[template(path = "app_error.html")]
struct AppErrorTemplate<'a> {
    base: BaseTemplateContext<'a>,
    error: &'a AppError,
    url: &'a url::Url,
    timestamp: chrono::DateTime<chrono::Local>,
}

impl AppErrorTemplate<'_> {
    fn is_transaction_conflict(&self) -> bool {
        matches!(self.error, AppError::TransactionConflict)
    }

    fn is_not_found(&self) -> bool {
        matches!(self.error, AppError::PageNotFound | AppError::EntityNotFound)
    }

    fn status_code(&self) -> u16 {
        self.error.status_code().as_u16()
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    base: BaseTemplateContext<'a>,
    error: &'a dyn ResponseError,
    url: &'a url::Url,
    timestamp: chrono::DateTime<chrono::Local>,
}

impl ErrorTemplate<'_> {
    fn status_code(&self) -> u16 {
        self.error.status_code().as_u16()
    }
}
