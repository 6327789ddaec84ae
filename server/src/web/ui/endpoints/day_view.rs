use crate::auth_session::SessionToken;
use crate::booking::schedule::{date_to_iso_string, slot_start};
use crate::data_store::auth_token::{AuthToken, Privilege};
use crate::data_store::models::{
    ClubTable, FreeDay, FullReservation, GuestInvite, Location, ReservationRequest,
    ReservationRestriction, ReservationStatus,
};
use crate::data_store::{
    LocationId, ProfileId, ReservationId, ReservationStoreFacade, SlotFilter, StoreError,
};
use crate::setup::ClubSettings;
use crate::web::ui::base_template::{BaseTemplateContext, NavButton};
use crate::web::ui::error::AppError;
use crate::web::ui::flash::{FlashMessage, FlashType, FlashesInterface};
use crate::web::ui::form_values::FormValue;
use crate::web::ui::sub_templates::form_inputs::{
    InputConfiguration, SelectEntry, SelectTemplate,
};
use crate::web::ui::util;
use crate::web::ui::validation::Int32FromList;
use crate::web::AppState;
use actix_web::web::Html;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use askama::Template;
use chrono::{DateTime, NaiveDate, Utc};
use rezervari_api_types::ChangeKind;
use serde::Deserialize;

#[get("/locations/{location_id}/{date}")]
async fn day_view(
    path: web::Path<(LocationId, NaiveDate)>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let (location_id, date) = path.into_inner();
    let session_token = util::extract_session_token(&state, &req)?;
    let store_state = state.clone();
    let day = web::block(move || -> Result<_, AppError> {
        let mut store = store_state.store.get_facade()?;
        Ok(load_day_data(
            &mut *store,
            &session_token,
            location_id,
            date,
        )?)
    })
    .await??;

    let form_data = ReserveFormData::default();
    Ok(Html::new(render_day_view(&req, &day, &state.settings, &form_data)?))
}

/// The roster of a day view as HTML fragment, for refreshing the page upon live feed events
#[get("/locations/{location_id}/{date}/roster")]
async fn roster_fragment(
    path: web::Path<(LocationId, NaiveDate)>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let (location_id, date) = path.into_inner();
    let session_token = util::extract_session_token(&state, &req)?;
    let store_state = state.clone();
    let day = web::block(move || -> Result<_, AppError> {
        let mut store = store_state.store.get_facade()?;
        Ok(load_day_data(
            &mut *store,
            &session_token,
            location_id,
            date,
        )?)
    })
    .await??;

    let tmpl = RosterTemplate {
        roster: roster_with_urls(&req, &day, &state.settings)?,
        return_path: util::path_for_day_view(&req, location_id, date)?,
    };
    Ok(Html::new(tmpl.render()?))
}

#[post("/locations/{location_id}/{date}/reserve")]
async fn reserve(
    path: web::Path<(LocationId, NaiveDate)>,
    state: web::Data<AppState>,
    data: web::Form<ReserveFormData>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let (location_id, date) = path.into_inner();
    let session_token = util::extract_session_token(&state, &req)?;
    let mut form_data = data.into_inner();
    let store_state = state.clone();
    let (day, form_data, result) = web::block(move || -> Result<_, AppError> {
        let mut store = store_state.store.get_facade()?;
        let day = load_day_data(&mut *store, &session_token, location_id, date)?;
        day.auth.check_privilege(Privilege::CreateReservation)?;
        let result = match form_data.validate(&day) {
            Some(request) => {
                Some(store.create_reservation(&day.auth, &store_state.settings, request))
            }
            None => None,
        };
        Ok((day, form_data, result))
    })
    .await??;

    let day_url = util::url_for_day_view(&req, location_id, date)?;
    match result {
        Some(Ok(update)) => {
            state.announce_reservation_update(&update, ChangeKind::Insert);
            let reservation = &update.reservation;
            let message = match reservation.status {
                ReservationStatus::Approved => format!(
                    "Rezervarea pentru {} la {:02}:00 a fost confirmată.",
                    date_to_iso_string(date),
                    reservation.start_hour
                ),
                _ => format!(
                    "Rezervarea pentru {} la {:02}:00 a fost înregistrată. Va fi confirmată când \
                    un membru cu cheie rezervă același interval.",
                    date_to_iso_string(date),
                    reservation.start_hour
                ),
            };
            req.add_flash_message(FlashMessage::new(FlashType::Success, message));
            Ok(util::see_other(day_url))
        }
        Some(Err(StoreError::ReservationRejected(rejection))) => {
            req.add_flash_message(FlashMessage::new(FlashType::Error, rejection.to_string()));
            Ok(util::see_other(day_url))
        }
        Some(Err(StoreError::TransactionConflict)) => {
            req.add_flash_message(FlashMessage::new(
                FlashType::Error,
                "Rezervarea nu a putut fi salvată din cauza unei modificări simultane. Încercați \
                din nou.",
            ));
            Ok(util::see_other(day_url))
        }
        Some(Err(e)) => Err(e.into()),
        None => {
            req.add_flash_message(FlashMessage::new(
                FlashType::Error,
                "Datele introduse nu sunt valide.",
            ));
            Ok(util::html_response(
                HttpResponse::UnprocessableEntity(),
                render_day_view(&req, &day, &state.settings, &form_data)?,
            ))
        }
    }
}

/// Everything shown on the day view of one location
struct DayData {
    auth: AuthToken,
    date: NaiveDate,
    locations: Vec<Location>,
    location: Location,
    tables: Vec<ClubTable>,
    reservations: Vec<FullReservation>,
    guests: Vec<GuestInvite>,
    restrictions: Vec<ReservationRestriction>,
    free_day: Option<FreeDay>,
    maintenance: bool,
}

fn load_day_data(
    store: &mut dyn ReservationStoreFacade,
    session_token: &SessionToken,
    location_id: LocationId,
    date: NaiveDate,
) -> Result<DayData, StoreError> {
    let auth = store.get_auth_token_for_session(session_token)?;
    let locations = store.get_locations(&auth)?;
    let location = locations
        .iter()
        .find(|l| l.id == location_id)
        .cloned()
        .ok_or(StoreError::NotExisting)?;
    let tables = store.get_tables(&auth, location_id)?;
    let reservations = store.get_reservations_for_day(&auth, location_id, date)?;
    let filter = SlotFilter::builder()
        .at_location(location_id)
        .on_date(date)
        .build();
    let guests = store.get_guest_invites(&auth, filter.clone())?;
    let restrictions = store.get_restrictions(&auth, filter)?;
    let free_day = store
        .get_free_days(&auth, Some(date))?
        .into_iter()
        .find(|f| f.date == date);
    let maintenance = store.get_global_vars(&auth)?.maintenance;
    Ok(DayData {
        auth,
        date,
        locations,
        location,
        tables,
        reservations,
        guests,
        restrictions,
        free_day,
        maintenance,
    })
}

/// Input data for calculating the roster of a day
struct RosterInput<'a> {
    location: &'a Location,
    date: NaiveDate,
    tables: &'a [ClubTable],
    reservations: &'a [FullReservation],
    guests: &'a [GuestInvite],
    restrictions: &'a [ReservationRestriction],
    free_day: Option<&'a FreeDay>,
    maintenance: bool,
    /// The member looking at the roster
    viewer: Option<ProfileId>,
    settings: &'a ClubSettings,
}

/// One row of the roster, representing a bookable slot of the day
#[derive(Debug)]
struct SlotRow {
    hour: i32,
    label: String,
    capacity: usize,
    occupied: usize,
    holders: Vec<HolderEntry>,
    guests: Vec<String>,
    special_guest: Option<String>,
    restriction: Option<String>,
    /// Active reservation of the viewing member in this slot
    own_reservation: Option<ReservationId>,
    /// Cancel URL of `own_reservation`, filled in by the endpoint
    cancel_url: Option<String>,
    /// The slot looks bookable for the viewer. The booking rules are checked again when
    /// submitting.
    can_reserve: bool,
}

#[derive(Debug)]
struct HolderEntry {
    name: String,
    table: Option<String>,
    status: ReservationStatus,
}

impl HolderEntry {
    fn status_label(&self) -> &'static str {
        match self.status {
            ReservationStatus::Approved => "confirmată",
            ReservationStatus::Pending => "în așteptare",
            ReservationStatus::Cancelled => "anulată",
        }
    }

    fn css_class(&self) -> &'static str {
        match self.status {
            ReservationStatus::Approved => "status-approved",
            ReservationStatus::Pending => "status-pending",
            ReservationStatus::Cancelled => "status-cancelled",
        }
    }
}

impl SlotRow {
    fn is_full(&self) -> bool {
        self.special_guest.is_some() || self.occupied >= self.capacity
    }
}

fn build_roster(input: &RosterInput, now: DateTime<Utc>) -> Vec<SlotRow> {
    let settings = input.settings;
    let today = now.with_timezone(&settings.timezone).date_naive();
    let within_booking_window = input.date <= settings.last_bookable_date(today);
    let day_closed = input.maintenance || input.free_day.is_some() || !within_booking_window;

    input
        .location
        .slots(input.date)
        .into_iter()
        .map(|hour| {
            let holders: Vec<HolderEntry> = input
                .reservations
                .iter()
                .filter(|r| r.reservation.start_hour == hour && r.reservation.status.is_active())
                .map(|r| HolderEntry {
                    name: r.user_name.clone(),
                    table: r.reservation.table_id.and_then(|table_id| {
                        input
                            .tables
                            .iter()
                            .find(|t| t.id == table_id)
                            .map(|t| t.name.clone())
                    }),
                    status: r.reservation.status,
                })
                .collect();
            let guests: Vec<&GuestInvite> = input
                .guests
                .iter()
                .filter(|g| g.start_hour == hour)
                .collect();
            let special_guest = guests
                .iter()
                .find(|g| g.special)
                .map(|g| g.guest_name.clone());
            let restriction = input
                .restrictions
                .iter()
                .find(|r| r.start_hour == hour)
                .map(|r| r.message.clone());
            let own_reservation = input.viewer.and_then(|viewer| {
                input
                    .reservations
                    .iter()
                    .find(|r| {
                        r.reservation.start_hour == hour
                            && r.reservation.status.is_active()
                            && r.reservation.user_id == viewer
                    })
                    .map(|r| r.reservation.id)
            });
            let in_future = slot_start(input.date, hour, &settings.timezone)
                .is_some_and(|start| start > now);

            let mut row = SlotRow {
                hour,
                label: format!(
                    "{:02}:00 - {:02}:00",
                    hour,
                    hour + input.location.slot_duration
                ),
                capacity: input.tables.len(),
                occupied: holders.len() + guests.len(),
                holders,
                guests: guests.iter().map(|g| g.guest_name.clone()).collect(),
                special_guest,
                restriction,
                own_reservation,
                cancel_url: None,
                can_reserve: false,
            };
            row.can_reserve = !day_closed
                && in_future
                && row.restriction.is_none()
                && row.own_reservation.is_none()
                && !row.is_full();
            row
        })
        .collect()
}

fn roster_with_urls(
    req: &HttpRequest,
    day: &DayData,
    settings: &ClubSettings,
) -> Result<Vec<SlotRow>, AppError> {
    let mut roster = build_roster(
        &RosterInput {
            location: &day.location,
            date: day.date,
            tables: &day.tables,
            reservations: &day.reservations,
            guests: &day.guests,
            restrictions: &day.restrictions,
            free_day: day.free_day.as_ref(),
            maintenance: day.maintenance,
            viewer: day.auth.profile_id(),
            settings,
        },
        Utc::now(),
    );
    for row in roster.iter_mut() {
        if let Some(reservation_id) = row.own_reservation {
            row.cancel_url = Some(
                req.url_for("cancel_own_reservation", [reservation_id.to_string()])?
                    .to_string(),
            );
        }
    }
    Ok(roster)
}

#[derive(Deserialize, Default)]
struct ReserveFormData {
    #[serde(default)]
    hour: FormValue<Int32FromList>,
    /// Empty for "any table"
    #[serde(default)]
    table_id: FormValue<Int32FromList>,
}

impl ReserveFormData {
    fn validate(&mut self, day: &DayData) -> Option<ReservationRequest> {
        let hour = self.hour.validate_with(&day.location.slots(day.date));
        let table_id = if self.table_id.string_value().is_empty() {
            Some(None)
        } else {
            let table_ids: Vec<i32> = day.tables.iter().map(|t| t.id).collect();
            self.table_id
                .validate_with(&table_ids)
                .map(|table_id| Some(table_id.into_inner()))
        };
        Some(ReservationRequest {
            location_id: day.location.id,
            table_id: table_id?,
            date: day.date,
            hour: hour?.into_inner(),
        })
    }
}

/// A link of the location or day navigation of the day view
struct DayLink {
    url: String,
    label: String,
    active: bool,
}

fn render_day_view(
    req: &HttpRequest,
    day: &DayData,
    settings: &ClubSettings,
    form_data: &ReserveFormData,
) -> Result<String, AppError> {
    let title = format!(
        "{}, {}",
        day.location.name,
        day.date.format("%d.%m.%Y")
    );
    let location_links = day
        .locations
        .iter()
        .map(|location| -> Result<DayLink, AppError> {
            Ok(DayLink {
                url: util::url_for_day_view(req, location.id, day.date)?,
                label: location.name.clone(),
                active: location.id == day.location.id,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;
    let today = settings.today();
    let day_links = [
        (day.date.pred_opt(), "« Ziua precedentă"),
        (Some(today), "Astăzi"),
        (day.date.succ_opt(), "Ziua următoare »"),
    ]
    .into_iter()
    .filter_map(|(date, label)| date.map(|date| (date, label)))
    .map(|(date, label)| -> Result<DayLink, AppError> {
        Ok(DayLink {
            url: util::url_for_day_view(req, day.location.id, date)?,
            label: label.to_owned(),
            active: date == day.date,
        })
    })
    .collect::<Result<Vec<_>, AppError>>()?;

    let location_id = day.location.id.to_string();
    let date = date_to_iso_string(day.date);
    let tmpl = DayViewTemplate {
        base: BaseTemplateContext {
            request: req,
            page_title: &title,
            auth_token: Some(&day.auth),
            active_nav_button: Some(NavButton::Reservations),
        },
        location_links,
        day_links,
        roster: roster_with_urls(req, day, settings)?,
        return_path: util::path_for_day_view(req, day.location.id, day.date)?,
        roster_url: req
            .url_for("roster_fragment", [&location_id, &date])?
            .to_string(),
        feed_url: req
            .url_for("reservation_feed", [&location_id, &date])?
            .to_string(),
        reserve_url: req.url_for("reserve", [&location_id, &date])?.to_string(),
        free_day: day.free_day.as_ref(),
        maintenance: day.maintenance,
        can_create_reservation: day.auth.has_privilege(Privilege::CreateReservation),
        tables: &day.tables,
        form_data,
    };
    Ok(tmpl.render()?)
}

#[derive(Template)]
#[template(path = "day_view.html")]
struct DayViewTemplate<'a> {
    base: BaseTemplateContext<'a>,
    location_links: Vec<DayLink>,
    day_links: Vec<DayLink>,
    roster: Vec<SlotRow>,
    return_path: String,
    roster_url: String,
    feed_url: String,
    reserve_url: String,
    free_day: Option<&'a FreeDay>,
    maintenance: bool,
    can_create_reservation: bool,
    tables: &'a [ClubTable],
    form_data: &'a ReserveFormData,
}

impl DayViewTemplate<'_> {
    fn has_bookable_slots(&self) -> bool {
        self.roster.iter().any(|row| row.can_reserve)
    }

    fn hour_select(&self) -> SelectTemplate<'_, Int32FromList> {
        SelectTemplate::new(
            &self.form_data.hour,
            "hour",
            self.roster
                .iter()
                .filter(|row| row.can_reserve)
                .map(|row| SelectEntry {
                    value: row.hour.to_string().into(),
                    text: row.label.as_str().into(),
                })
                .collect(),
            "Interval",
            InputConfiguration::default(),
        )
    }

    fn table_select(&self) -> SelectTemplate<'_, Int32FromList> {
        SelectTemplate::new(
            &self.form_data.table_id,
            "table_id",
            std::iter::once(SelectEntry {
                value: "".into(),
                text: "Oricare masă liberă".into(),
            })
            .chain(self.tables.iter().map(|table| SelectEntry {
                value: table.id.to_string().into(),
                text: table.name.as_str().into(),
            }))
            .collect(),
            "Masa",
            InputConfiguration::builder().optional().build(),
        )
    }
}

/// Standalone rendering of the roster, as loaded by the live update script
#[derive(Template)]
#[template(path = "roster.html")]
struct RosterTemplate {
    roster: Vec<SlotRow>,
    return_path: String,
}
