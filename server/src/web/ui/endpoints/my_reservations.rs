use crate::booking::rules::evaluate_cancellation;
use crate::booking::schedule::date_to_iso_string;
use crate::data_store::models::{Reservation, ReservationStatus};
use crate::data_store::{ReservationId, StoreError};
use crate::web::ui::base_template::{BaseTemplateContext, NavButton};
use crate::web::ui::error::AppError;
use crate::web::ui::flash::{FlashMessage, FlashType, FlashesInterface};
use crate::web::ui::util;
use crate::web::ical::ICalQueryParams;
use crate::web::AppState;
use actix_web::web::Html;
use actix_web::{get, post, web, HttpRequest, Responder};
use askama::Template;
use chrono::Utc;
use rezervari_api_types::ChangeKind;
use serde::Deserialize;
use std::collections::HashMap;

#[get("/reservations")]
async fn my_reservations(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let calendar_token = session_token.as_string(&state.secret);
    let today = state.settings.today();
    let store_state = state.clone();
    let (auth, reservations, location_names, table_names, global_vars) =
        web::block(move || -> Result<_, AppError> {
            let mut store = store_state.store.get_facade()?;
            let auth = store.get_auth_token_for_session(&session_token)?;
            let reservations =
                store.get_reservations_of_member(&auth, session_token.profile_id(), today)?;
            let mut location_names = HashMap::new();
            let mut table_names = HashMap::new();
            for location in store.get_locations(&auth)? {
                for table in store.get_tables(&auth, location.id)? {
                    table_names.insert(table.id, table.name);
                }
                location_names.insert(location.id, location.name);
            }
            let global_vars = store.get_global_vars(&auth)?;
            Ok((auth, reservations, location_names, table_names, global_vars))
        })
        .await??;

    let now = Utc::now();
    let entries: Vec<ReservationEntry> = reservations
        .iter()
        .filter(|r| r.status.is_active())
        .map(|reservation| -> Result<ReservationEntry, AppError> {
            let cancel_url = if evaluate_cancellation(reservation, &auth, &state.settings, now)
                .is_ok()
            {
                Some(
                    req.url_for("cancel_own_reservation", [reservation.id.to_string()])?
                        .to_string(),
                )
            } else {
                None
            };
            Ok(ReservationEntry {
                date: reservation.start_date.format("%d.%m.%Y").to_string(),
                time: format!(
                    "{:02}:00 - {:02}:00",
                    reservation.start_hour,
                    reservation.start_hour + reservation.duration
                ),
                location: location_names
                    .get(&reservation.location_id)
                    .cloned()
                    .unwrap_or_default(),
                table: reservation
                    .table_id
                    .and_then(|id| table_names.get(&id).cloned()),
                status: reservation.status,
                day_url: util::url_for_day_view(
                    &req,
                    reservation.location_id,
                    reservation.start_date,
                )?,
                cancel_url,
            })
        })
        .collect::<Result<_, _>>()?;

    let tmpl = MyReservationsTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Rezervările mele",
            auth_token: Some(&auth),
            active_nav_button: Some(NavButton::OwnReservations),
        },
        entrance_code: entrance_code_for_today(&reservations, today, &global_vars.entrance_code),
        calendar_url: calendar_url(&req, calendar_token)?,
        return_path: req.url_for_static("my_reservations")?.path().to_owned(),
        entries,
    };
    Ok(Html::new(tmpl.render()?))
}

/// Subscription link for calendar apps, which authenticates through the session token in the
/// query string
fn calendar_url(req: &HttpRequest, session_token: String) -> Result<String, AppError> {
    let mut url = req.url_for_static("reservations_ical")?;
    url.set_query(Some(&serde_urlencoded::to_string(ICalQueryParams {
        session_token: Some(session_token),
    })?));
    Ok(url.to_string())
}

/// The entrance code is only revealed to members with an approved reservation for today.
fn entrance_code_for_today<'a>(
    reservations: &[Reservation],
    today: chrono::NaiveDate,
    entrance_code: &'a str,
) -> Option<&'a str> {
    let approved_today = reservations
        .iter()
        .any(|r| r.start_date == today && r.status == ReservationStatus::Approved);
    if approved_today && !entrance_code.is_empty() {
        Some(entrance_code)
    } else {
        None
    }
}

struct ReservationEntry {
    date: String,
    time: String,
    location: String,
    table: Option<String>,
    status: ReservationStatus,
    day_url: String,
    cancel_url: Option<String>,
}

impl ReservationEntry {
    fn status_label(&self) -> &'static str {
        match self.status {
            ReservationStatus::Approved => "Confirmată",
            ReservationStatus::Pending => "În așteptarea unui membru cu cheie",
            ReservationStatus::Cancelled => "Anulată",
        }
    }
}

#[derive(Template)]
#[template(path = "my_reservations.html")]
struct MyReservationsTemplate<'a> {
    base: BaseTemplateContext<'a>,
    entries: Vec<ReservationEntry>,
    entrance_code: Option<&'a str>,
    calendar_url: String,
    return_path: String,
}

#[derive(Deserialize)]
struct CancelFormData {
    redirect_to: Option<String>,
}

#[post("/reservations/{reservation_id}/cancel")]
async fn cancel_own_reservation(
    path: web::Path<ReservationId>,
    state: web::Data<AppState>,
    data: web::Form<CancelFormData>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let reservation_id = path.into_inner();
    let session_token = util::extract_session_token(&state, &req)?;
    let store_state = state.clone();
    let result = web::block(move || -> Result<_, AppError> {
        let mut store = store_state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        Ok(store.cancel_reservation(&auth, &store_state.settings, reservation_id))
    })
    .await??;

    match result {
        Ok(update) => {
            state.announce_reservation_update(&update, ChangeKind::Update);
            req.add_flash_message(FlashMessage::new(
                FlashType::Success,
                format!(
                    "Rezervarea din {} de la {:02}:00 a fost anulată.",
                    date_to_iso_string(update.reservation.start_date),
                    update.reservation.start_hour
                ),
            ));
        }
        Err(StoreError::CancellationRejected(rejection)) => {
            req.add_flash_message(FlashMessage::new(FlashType::Error, rejection.to_string()));
        }
        Err(StoreError::TransactionConflict) => {
            req.add_flash_message(FlashMessage::new(
                FlashType::Error,
                "Anularea nu a putut fi salvată din cauza unei modificări simultane. Încercați din \
                nou.",
            ));
        }
        Err(e) => return Err(e.into()),
    }

    let target = match util::sanitize_redirect_target(data.redirect_to.as_deref()) {
        Some(target) => target.to_owned(),
        None => req.url_for_static("my_reservations")?.to_string(),
    };
    Ok(util::see_other(target))
}
