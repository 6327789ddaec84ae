use crate::auth_session::SessionToken;
use crate::data_store::auth_token::Privilege;
use crate::data_store::LocationId;
use crate::web::api::{APIError, SessionTokenHeader, SESSION_TOKEN_MAX_AGE};
use crate::web::AppState;
use actix_web::http::header::{CacheControl, CacheDirective};
use crate::web::ui::util::{SESSION_COOKIE_MAX_AGE, SESSION_COOKIE_NAME};
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDate;
use futures::StreamExt;
use serde::Deserialize;

#[derive(Deserialize)]
struct FeedQuery {
    /// Session token, for clients that cannot set request headers (e.g. the browser's EventSource)
    token: Option<String>,
}

/// Server-Sent Events stream of reservation changes at the given location and day
///
/// Each event only identifies the changed reservation. Clients are expected to reload the roster
/// on every `change` and `resync` event.
///
/// The session is taken from the `X-SESSION-TOKEN` header, the `token` query parameter or the
/// web UI's session cookie, in this order.
#[get("/locations/{location_id}/reservations/{date}/feed")]
async fn reservation_feed(
    path: web::Path<(LocationId, NaiveDate)>,
    query: web::Query<FeedQuery>,
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let (location_id, date) = path.into_inner();
    let session_token = match (session_token_header, &query.token) {
        (Some(header), _) => header.into_inner().session_token(&state.secret)?,
        (None, Some(token)) => SessionToken::from_string(token, &state.secret, SESSION_TOKEN_MAX_AGE)?,
        (None, None) => match req.cookie(SESSION_COOKIE_NAME) {
            Some(cookie) => {
                SessionToken::from_string(cookie.value(), &state.secret, SESSION_COOKIE_MAX_AGE)?
            }
            None => return Err(APIError::NoSessionToken),
        },
    };
    let store_state = state.clone();
    web::block(move || -> Result<_, APIError> {
        let mut store = store_state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ShowReservations)?;
        store.get_location(&auth, location_id)?;
        Ok(())
    })
    .await??;

    let events = state
        .feed
        .subscribe(location_id, date)
        .map(|event| Ok::<_, actix_web::Error>(event.to_sse_message()));
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(CacheControl(vec![CacheDirective::NoCache]))
        .streaming(events))
}
