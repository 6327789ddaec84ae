use crate::data_store::models::FreeDay;
use crate::web::api::{require_session_token, APIError, SessionTokenHeader};
use crate::web::AppState;
use actix_web::{delete, get, put, web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Deserialize)]
struct FreeDayQuery {
    from_date: Option<NaiveDate>,
}

#[get("/free-days")]
async fn list_free_days(
    query: web::Query<FreeDayQuery>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let from_date = query.from_date;
    let free_days = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        Ok(store.get_free_days(&auth, from_date)?)
    })
    .await??;
    Ok(web::Json(
        free_days
            .into_iter()
            .map(rezervari_api_types::FreeDay::from)
            .collect::<Vec<_>>(),
    ))
}

#[put("/free-days/{date}")]
async fn create_or_update_free_day(
    path: web::Path<NaiveDate>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
    data: web::Json<rezervari_api_types::FreeDay>,
) -> Result<impl Responder, APIError> {
    let date = path.into_inner();
    let free_day: FreeDay = data.into_inner().into();
    if free_day.date != date {
        return Err(APIError::InvalidData(
            "Date in given data does not match URL".to_owned(),
        ));
    }
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let created = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        Ok(store.create_or_update_free_day(&auth, free_day)?)
    })
    .await??;
    if created {
        Ok(HttpResponse::Created())
    } else {
        Ok(HttpResponse::NoContent())
    }
}

#[delete("/free-days/{date}")]
async fn delete_free_day(
    path: web::Path<NaiveDate>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let date = path.into_inner();
    let session_token = require_session_token(session_token_header, &state.secret)?;
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        store.delete_free_day(&auth, date)?;
        Ok(())
    })
    .await??;
    Ok(HttpResponse::NoContent())
}
