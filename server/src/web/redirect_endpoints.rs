use crate::web::ui::error::AppError;
use actix_web::web::Redirect;
use actix_web::{get, HttpRequest, Responder};

/// The web ui lives under `/ui`. Take visitors of the bare host name there.
#[get("/")]
async fn root_redirect(req: HttpRequest) -> Result<impl Responder, AppError> {
    Ok(Redirect::to(req.url_for_static("index")?.to_string()).see_other())
}
