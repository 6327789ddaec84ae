use crate::data_store::auth_token::Privilege;
use crate::data_store::models::NewReservationRestriction;
use crate::data_store::RestrictionId;
use crate::web::api::{
    require_session_token, validate_field, APIError, SessionTokenHeader, SlotQuery,
};
use crate::web::ui::validation::{Hour, NonEmptyString};
use crate::web::AppState;
use actix_web::{delete, get, post, web, HttpResponse, Responder};

#[get("/restrictions")]
async fn list_restrictions(
    query: web::Query<SlotQuery>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let filter = query.into_inner().into();
    let restrictions = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageRestrictions)?;
        Ok(store.get_restrictions(&auth, filter)?)
    })
    .await??;
    Ok(web::Json(
        restrictions
            .into_iter()
            .map(rezervari_api_types::ReservationRestriction::from)
            .collect::<Vec<_>>(),
    ))
}

#[post("/restrictions")]
async fn create_restriction(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
    data: web::Json<rezervari_api_types::NewReservationRestriction>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let mut restriction = NewReservationRestriction::from(data.into_inner());
    restriction.message =
        validate_field::<NonEmptyString>("message", &restriction.message)?.into_inner();
    validate_field::<Hour>("start_hour", &restriction.start_hour.to_string())?;
    let restriction = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        Ok(store.create_restriction(&auth, restriction)?)
    })
    .await??;
    Ok(HttpResponse::Created().json(rezervari_api_types::ReservationRestriction::from(
        restriction,
    )))
}

#[delete("/restrictions/{restriction_id}")]
async fn delete_restriction(
    path: web::Path<RestrictionId>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let restriction_id = path.into_inner();
    let session_token = require_session_token(session_token_header, &state.secret)?;
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        store.delete_restriction(&auth, restriction_id)?;
        Ok(())
    })
    .await??;
    Ok(HttpResponse::NoContent())
}
