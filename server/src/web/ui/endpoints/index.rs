use crate::web::ui::error::AppError;
use crate::web::ui::flash::{FlashMessage, FlashType, FlashesInterface};
use crate::web::ui::util;
use crate::web::AppState;
use actix_web::web::Redirect;
use actix_web::{get, web, HttpRequest, Responder};

/// Start page: today's day view of the first location
#[get("/")]
async fn index(state: web::Data<AppState>, req: HttpRequest) -> Result<impl Responder, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let today = state.settings.today();
    let locations = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        Ok(store.get_locations(&auth)?)
    })
    .await??;

    match locations.first() {
        Some(location) => {
            Ok(Redirect::to(util::url_for_day_view(&req, location.id, today)?).see_other())
        }
        None => {
            req.add_flash_message(FlashMessage::new(
                FlashType::Warning,
                "Nu este configurată nicio locație. Contactați un fondator al clubului.",
            ));
            Ok(Redirect::to(req.url_for_static("help")?.to_string()).see_other())
        }
    }
}
