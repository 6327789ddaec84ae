use crate::data_store::LocationId;
use crate::web::api::{require_session_token, APIError, SessionTokenHeader};
use crate::web::AppState;
use actix_web::{get, web, Responder};
use chrono::NaiveDate;

/// List all locations including their tables
#[get("/locations")]
async fn list_locations(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let locations = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        let locations = store.get_locations(&auth)?;
        let mut result = Vec::with_capacity(locations.len());
        for location in locations {
            let tables = store.get_tables(&auth, location.id)?;
            result.push(location.into_api(tables));
        }
        Ok(result)
    })
    .await??;
    Ok(web::Json(locations))
}

#[get("/locations/{location_id}/tables")]
async fn list_tables(
    path: web::Path<LocationId>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let location_id = path.into_inner();
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let tables = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        // Distinguish unknown locations from locations without tables
        store.get_location(&auth, location_id)?;
        Ok(store.get_tables(&auth, location_id)?)
    })
    .await??;
    Ok(web::Json(
        tables
            .into_iter()
            .map(rezervari_api_types::ClubTable::from)
            .collect::<Vec<_>>(),
    ))
}

/// The roster of one location and day: all reservations (active ones first) with member names
#[get("/locations/{location_id}/reservations/{date}")]
async fn list_reservations_of_day(
    path: web::Path<(LocationId, NaiveDate)>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let (location_id, date) = path.into_inner();
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let reservations = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        store.get_location(&auth, location_id)?;
        Ok(store.get_reservations_for_day(&auth, location_id, date)?)
    })
    .await??;
    Ok(web::Json(
        reservations
            .into_iter()
            .map(rezervari_api_types::Reservation::from)
            .collect::<Vec<_>>(),
    ))
}
