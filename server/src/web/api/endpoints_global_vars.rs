use crate::data_store::auth_token::Privilege;
use crate::web::api::{require_session_token, APIError, SessionTokenHeader};
use crate::web::AppState;
use actix_web::{get, put, web, HttpResponse, Responder};
use log::info;

/// Get the maintenance flag and the entrance code. Members only get to see the entrance code in
/// the web UI on days with an approved reservation, so this endpoint is reserved to founders.
#[get("/global-vars")]
async fn get_global_vars(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let global_vars = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageGlobalVars)?;
        Ok(store.get_global_vars(&auth)?)
    })
    .await??;
    Ok(web::Json(rezervari_api_types::GlobalVars::from(global_vars)))
}

#[put("/global-vars")]
async fn update_global_vars(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
    data: web::Json<rezervari_api_types::GlobalVars>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let global_vars = data.into_inner().into();
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        store.update_global_vars(&auth, global_vars)?;
        info!("Global settings updated by {}", session_token.profile_id());
        Ok(())
    })
    .await??;
    Ok(HttpResponse::NoContent())
}
