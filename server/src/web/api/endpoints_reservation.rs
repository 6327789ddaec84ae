use crate::data_store::models::ReservationRequest;
use crate::data_store::ReservationId;
use crate::web::api::{require_session_token, validate_field, APIError, SessionTokenHeader};
use crate::web::ui::validation::Hour;
use crate::web::AppState;
use actix_web::{get, post, web, HttpResponse, Responder};
use rezervari_api_types::{ChangeKind, CreateReservationRequest, CreateReservationResult};

/// The reservation procedure: book a slot for the logged-in member.
///
/// Answers with `201 {error: null, reservation}` on success and with `409 {error: "<reason>"}` if
/// a booking rule refused the reservation.
#[post("/rpc/create_reservation")]
async fn create_reservation(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
    data: web::Json<CreateReservationRequest>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let request = ReservationRequest::from(data.into_inner());
    validate_field::<Hour>("start_hour_input", &request.hour.to_string())?;
    let store_state = state.clone();
    let update = web::block(move || -> Result<_, APIError> {
        let mut store = store_state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        Ok(store.create_reservation(&auth, &store_state.settings, request)?)
    })
    .await??;
    state.announce_reservation_update(&update, ChangeKind::Insert);
    Ok(HttpResponse::Created().json(CreateReservationResult {
        error: None,
        reservation: Some(update.reservation.into()),
    }))
}

#[post("/reservations/{reservation_id}/cancel")]
async fn cancel_reservation(
    path: web::Path<ReservationId>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let reservation_id = path.into_inner();
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let store_state = state.clone();
    let update = web::block(move || -> Result<_, APIError> {
        let mut store = store_state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        Ok(store.cancel_reservation(&auth, &store_state.settings, reservation_id)?)
    })
    .await??;
    state.announce_reservation_update(&update, ChangeKind::Update);
    Ok(web::Json(rezervari_api_types::Reservation::from(
        update.reservation,
    )))
}

/// The logged-in member's reservations from today on
#[get("/reservations/mine")]
async fn list_own_reservations(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let today = state.settings.today();
    let reservations = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        Ok(store.get_reservations_of_member(&auth, session_token.profile_id(), today)?)
    })
    .await??;
    Ok(web::Json(
        reservations
            .into_iter()
            .map(rezervari_api_types::Reservation::from)
            .collect::<Vec<_>>(),
    ))
}
