use crate::booking::rules;
use crate::cli_error::CliError;
use crate::data_store::models::ReservationUpdate;
use crate::data_store::{get_store_from_env, ReservationStore};
use crate::live_feed::LiveFeed;
use crate::setup::{
    get_listen_address_from_env, get_listen_port_from_env, get_public_base_url_from_env,
    get_secret_from_env, ClubSettings,
};
use actix_web::middleware::from_fn;
use actix_web::{middleware, web, App, HttpServer};
use log::info;
use rezervari_api_types::ChangeKind;
use std::sync::Arc;

mod api;
mod http_error_logging;
mod ical;
mod redirect_endpoints;
pub(crate) mod ui;

pub fn serve() -> Result<(), CliError> {
    let state = AppState::new()?;
    let listen_address = get_listen_address_from_env()?;
    let listen_port = get_listen_port_from_env()?;
    info!(
        "Starting rezervari server {} on {}:{}",
        crate::get_version(),
        listen_address,
        listen_port
    );
    actix_web::rt::System::new()
        .block_on(
            HttpServer::new(move || {
                App::new()
                    .configure(api::configure_app)
                    .configure(ui::configure_app)
                    .service(redirect_endpoints::root_redirect)
                    .app_data(web::Data::new(state.clone()))
                    .wrap(from_fn(http_error_logging::error_logging_middleware))
                    .wrap(middleware::Compress::default())
            })
            .bind((listen_address, listen_port))
            .map_err(CliError::BindError)?
            .run(),
        )
        .map_err(CliError::ServerError)
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ReservationStore>,
    secret: String,
    settings: ClubSettings,
    feed: Arc<LiveFeed>,
    /// Base URL for links leaving the application (password reset links). When not configured,
    /// the URL is derived from the request.
    public_base_url: Option<String>,
}

impl AppState {
    pub fn new() -> Result<Self, CliError> {
        Ok(Self {
            store: Arc::new(get_store_from_env()?),
            secret: get_secret_from_env()?,
            settings: ClubSettings::from_env()?,
            feed: Arc::new(LiveFeed::new()),
            public_base_url: get_public_base_url_from_env()?,
        })
    }

    /// Log a committed reservation creation or cancellation and notify the live feed subscribers
    /// of the slot.
    fn announce_reservation_update(&self, update: &ReservationUpdate, kind: ChangeKind) {
        let reservation = &update.reservation;
        let slot = rules::slot_description(
            reservation.location_id,
            reservation.start_date,
            reservation.start_hour,
        );
        match kind {
            ChangeKind::Insert => info!(
                "Reservation {} created by member {} for {} ({})",
                reservation.id,
                reservation.user_id,
                slot,
                reservation.status.name()
            ),
            _ => info!(
                "Reservation {} of member {} for {} cancelled",
                reservation.id, reservation.user_id, slot
            ),
        }
        if !update.changed_status.is_empty() {
            info!(
                "Status of {} further reservation(s) for {} changed",
                update.changed_status.len(),
                slot
            );
        }
        self.feed.publish_update(update, kind);
    }
}
