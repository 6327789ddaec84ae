use crate::data_store::auth_token::Privilege;
use crate::data_store::models::NewGuestInvite;
use crate::data_store::GuestInviteId;
use crate::web::api::{
    require_session_token, validate_field, APIError, SessionTokenHeader, SlotQuery,
};
use crate::web::ui::validation::{GuestName, Hour};
use crate::web::AppState;
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use log::info;

#[get("/guests")]
async fn list_guest_invites(
    query: web::Query<SlotQuery>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let filter = query.into_inner().into();
    let guest_invites = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageGuests)?;
        Ok(store.get_guest_invites(&auth, filter)?)
    })
    .await??;
    Ok(web::Json(
        guest_invites
            .into_iter()
            .map(rezervari_api_types::GuestInvite::from)
            .collect::<Vec<_>>(),
    ))
}

#[post("/guests")]
async fn create_guest_invite(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
    data: web::Json<rezervari_api_types::NewGuestInvite>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let mut guest_invite = NewGuestInvite::from(data.into_inner());
    guest_invite.guest_name =
        validate_field::<GuestName>("guest_name", &guest_invite.guest_name)?.into_inner();
    validate_field::<Hour>("start_hour", &guest_invite.start_hour.to_string())?;
    let guest_invite = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        Ok(store.create_guest_invite(&auth, guest_invite)?)
    })
    .await??;
    info!(
        "Guest invite {} created by {}",
        guest_invite.id, guest_invite.user_id
    );
    Ok(HttpResponse::Created().json(rezervari_api_types::GuestInvite::from(guest_invite)))
}

#[delete("/guests/{guest_invite_id}")]
async fn delete_guest_invite(
    path: web::Path<GuestInviteId>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let guest_invite_id = path.into_inner();
    let session_token = require_session_token(session_token_header, &state.secret)?;
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        store.delete_guest_invite(&auth, guest_invite_id)?;
        Ok(())
    })
    .await??;
    Ok(HttpResponse::NoContent())
}
