//! The HTML user interface, rendered on the server with askama templates
use crate::web::ui::error::AppError;
use crate::web::ui::error_page::error_page_middleware;
use crate::web::ui::flash::flash_middleware;
use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::middleware::from_fn;
use actix_web::{get, web, HttpResponse, Responder};
use rust_embed::Embed;

mod askama_filters;
mod base_template;
mod endpoints {
    pub mod auth;
    pub mod day_view;
    pub mod global_settings;
    pub mod help;
    pub mod index;
    pub mod manage_free_days;
    pub mod manage_guests;
    pub mod manage_members;
    pub mod manage_restrictions;
    pub mod my_reservations;
    pub mod password;
}
pub mod error;
mod error_page;
mod flash;
pub mod form_values;
mod sub_templates {
    pub mod form_inputs;
}
#[cfg(test)]
mod tests;
pub mod util;
pub mod validation;

pub fn configure_app(cfg: &mut web::ServiceConfig) {
    // The flash middleware must be the outer one, so that flash messages added by the error page
    // middleware are stored
    cfg.service(
        get_ui_service()
            .wrap(from_fn(error_page_middleware))
            .wrap(from_fn(flash_middleware)),
    );
}

fn get_ui_service() -> actix_web::Scope {
    web::scope("/ui")
        .service(static_resources)
        .service(endpoints::index::index)
        .service(endpoints::auth::login_form)
        .service(endpoints::auth::login)
        .service(endpoints::auth::signup_form)
        .service(endpoints::auth::signup)
        .service(endpoints::auth::logout)
        .service(endpoints::password::forgot_password_form)
        .service(endpoints::password::forgot_password)
        .service(endpoints::password::reset_password_form)
        .service(endpoints::password::reset_password)
        .service(endpoints::password::change_password_form)
        .service(endpoints::password::change_password)
        .service(endpoints::day_view::day_view)
        .service(endpoints::day_view::roster_fragment)
        .service(endpoints::day_view::reserve)
        .service(crate::web::ical::reservations_ical)
        .service(endpoints::my_reservations::my_reservations)
        .service(endpoints::my_reservations::cancel_own_reservation)
        .service(endpoints::help::help)
        .service(endpoints::manage_free_days::manage_free_days)
        .service(endpoints::manage_free_days::save_free_day)
        .service(endpoints::manage_free_days::delete_free_day)
        .service(endpoints::manage_restrictions::manage_restrictions)
        .service(endpoints::manage_restrictions::create_restriction)
        .service(endpoints::manage_restrictions::delete_restriction)
        .service(endpoints::manage_guests::manage_guests)
        .service(endpoints::manage_guests::create_guest_invite)
        .service(endpoints::manage_guests::delete_guest_invite)
        .service(endpoints::manage_members::manage_members)
        .service(endpoints::manage_members::edit_member_form)
        .service(endpoints::manage_members::edit_member)
        .service(endpoints::manage_members::set_member_password)
        .service(endpoints::global_settings::global_settings_form)
        .service(endpoints::global_settings::global_settings)
        .default_service(web::to(not_found_handler))
}

#[derive(Embed)]
#[folder = "static/"]
struct Resources;

impl Resources {
    fn handle_embedded_file(path: &str) -> HttpResponse {
        match Self::get(path) {
            Some(content) => HttpResponse::Ok()
                .content_type(mime_guess::from_path(path).first_or_octet_stream().as_ref())
                .append_header(CacheControl(vec![CacheDirective::MaxAge(86400 * 365)]))
                .body(content.data.into_owned()),
            None => {
                HttpResponse::NotFound().body(format!("Static resource file '{}' not found", path))
            }
        }
    }
}

#[get("/static/{_:.*}")]
async fn static_resources(path: web::Path<String>) -> impl Responder {
    Resources::handle_embedded_file(path.as_str())
}

async fn not_found_handler() -> Result<&'static str, AppError> {
    Err(AppError::PageNotFound)
}
