use crate::auth_session::SessionToken;
use crate::booking::schedule::slot_start;
use crate::data_store::models::{ClubTable, Location, Reservation};
use crate::data_store::{LocationId, TableId};
use crate::setup::ClubSettings;
use crate::web::ui::error::AppError;
use crate::web::ui::util;
use crate::web::AppState;
use actix_web::http::header::DispositionParam;
use actix_web::http::StatusCode;
use actix_web::{get, web, HttpRequest, HttpResponseBuilder, Responder};
use icalendar::{Component, EventLike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Calendar export of the member's upcoming reservations
///
/// Calendar apps cannot send the session cookie, so the session token may be given as `token`
/// query parameter instead.
#[get("/reservations/calendar.ics")]
async fn reservations_ical(
    state: web::Data<AppState>,
    query: web::Query<ICalQueryParams>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let session_token = match &query.session_token {
        Some(token) => SessionToken::from_string(token, &state.secret, util::SESSION_COOKIE_MAX_AGE)
            .map_err(|session_error| AppError::NotLoggedIn {
                session_error: Some(session_error),
            })?,
        None => util::extract_session_token(&state, &req)?,
    };
    let today = state.settings.today();

    let store_state = state.clone();
    let (reservations, locations, tables) = web::block(move || -> Result<_, AppError> {
        let mut store = store_state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        let reservations =
            store.get_reservations_of_member(&auth, session_token.profile_id(), today)?;
        let locations = store.get_locations(&auth)?;
        let mut tables = Vec::new();
        for location in locations.iter() {
            tables.extend(store.get_tables(&auth, location.id)?);
        }
        Ok((reservations, locations, tables))
    })
    .await??;

    Ok(HttpResponseBuilder::new(StatusCode::OK)
        .content_type("text/calendar; charset=utf-8")
        .append_header(actix_web::http::header::ContentDisposition {
            disposition: actix_web::http::header::DispositionType::Inline,
            parameters: vec![DispositionParam::Filename(String::from("rezervari.ics"))],
        })
        .body(generate_ical(
            &reservations,
            &locations,
            &tables,
            &state.settings,
        )))
}

#[derive(Deserialize, Serialize, Default)]
pub struct ICalQueryParams {
    #[serde(rename = "token")]
    pub session_token: Option<String>,
}

fn generate_ical(
    reservations: &[Reservation],
    locations: &[Location],
    tables: &[ClubTable],
    settings: &ClubSettings,
) -> String {
    let mut calendar = icalendar::Calendar::new().name("Rezervări").done();
    let locations_by_id: BTreeMap<LocationId, &Location> =
        locations.iter().map(|l| (l.id, l)).collect();
    let tables_by_id: BTreeMap<TableId, &ClubTable> = tables.iter().map(|t| (t.id, t)).collect();

    for reservation in reservations {
        if !reservation.status.is_active() {
            continue;
        }
        let Some(begin) = slot_start(
            reservation.start_date,
            reservation.start_hour,
            &settings.timezone,
        ) else {
            continue;
        };
        let end = begin + chrono::Duration::hours(reservation.duration as i64);
        let location_name = locations_by_id
            .get(&reservation.location_id)
            .map(|l| l.name.as_str())
            .unwrap_or_default();

        let event = icalendar::Event::new()
            .uid(&reservation.id.to_string())
            .summary(&format!("Rezervare {}", location_name))
            .starts(begin)
            .ends(end)
            .description(&generate_ical_description(reservation))
            .location(&generate_ical_location(
                location_name,
                reservation,
                &tables_by_id,
            ))
            .done();
        calendar.push(event);
    }

    calendar.to_string()
}

fn generate_ical_description(reservation: &Reservation) -> String {
    format!("Stare: {}", reservation.status.name())
}

fn generate_ical_location(
    location_name: &str,
    reservation: &Reservation,
    tables: &BTreeMap<TableId, &ClubTable>,
) -> String {
    match reservation.table_id.and_then(|id| tables.get(&id)) {
        Some(table) => format!("{} ({})", location_name, table.name),
        None => location_name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_store::models::ReservationStatus;
    use uuid::Uuid;

    fn reservation(hour: i32, table_id: Option<i32>, status: ReservationStatus) -> Reservation {
        Reservation {
            id: Uuid::now_v7(),
            created_at: chrono::Utc::now(),
            user_id: Uuid::now_v7(),
            location_id: 1,
            table_id,
            start_date: chrono::NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            start_hour: hour,
            duration: 2,
            status,
        }
    }

    #[test]
    fn test_generate_ical() {
        let locations = vec![Location {
            id: 1,
            name: "Sala mare".to_owned(),
            weekday_open_hour: 8,
            weekday_close_hour: 22,
            weekend_open_hour: 10,
            weekend_close_hour: 18,
            slot_duration: 2,
            sort_key: 0,
        }];
        let tables = vec![ClubTable {
            id: 3,
            location_id: 1,
            name: "Masa 3".to_owned(),
        }];
        let approved = reservation(18, Some(3), ReservationStatus::Approved);
        let cancelled = reservation(10, None, ReservationStatus::Cancelled);

        let ical = generate_ical(
            &[approved.clone(), cancelled.clone()],
            &locations,
            &tables,
            &ClubSettings::default(),
        );
        assert!(ical.contains(&approved.id.to_string()));
        assert!(!ical.contains(&cancelled.id.to_string()));
        // 18:00 in Bucharest (summer time) is 15:00 UTC
        assert!(ical.contains("DTSTART:20250701T150000Z"));
        assert!(ical.contains("DTEND:20250701T170000Z"));
        assert!(ical.contains("Sala mare (Masa 3)"));
    }
}
