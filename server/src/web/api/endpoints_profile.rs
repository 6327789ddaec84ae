use crate::data_store::models::ProfilePatch;
use crate::data_store::ProfileId;
use crate::web::api::{require_session_token, validate_field, APIError, SessionTokenHeader};
use crate::web::ui::validation::MemberName;
use crate::web::AppState;
use actix_web::{get, patch, web, Responder};

#[get("/profiles")]
async fn list_profiles(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let profiles = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        Ok(store.get_profiles(&auth)?)
    })
    .await??;
    Ok(web::Json(
        profiles
            .into_iter()
            .map(rezervari_api_types::Profile::from)
            .collect::<Vec<_>>(),
    ))
}

#[patch("/profiles/{profile_id}")]
async fn change_profile(
    path: web::Path<ProfileId>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
    data: web::Json<rezervari_api_types::ProfilePatch>,
) -> Result<impl Responder, APIError> {
    let profile_id = path.into_inner();
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let mut patch = ProfilePatch::from(data.into_inner());
    if let Some(name) = &patch.name {
        patch.name = Some(validate_field::<MemberName>("name", name)?.into_inner());
    }
    let profile = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        Ok(store.update_profile(&auth, profile_id, patch)?)
    })
    .await??;
    Ok(web::Json(rezervari_api_types::Profile::from(profile)))
}
