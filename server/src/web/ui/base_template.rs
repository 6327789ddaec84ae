use crate::data_store::auth_token::{AuthToken, Privilege};
use crate::web::ui;
use crate::web::ui::flash::FlashesInterface;
use crate::web::ui::Resources;
use actix_web::error::UrlGenerationError;
use actix_web::HttpRequest;
use std::fmt::Write;

/// Common template data for all ui templates extending the `base.html` template
///
/// This struct must be a part of the template data structure, as the field `base`.
/// The contained data and functions can be used by the individual template's code, as well.
#[derive(Debug)]
pub struct BaseTemplateContext<'a> {
    /// The HTTP request the template is used to respond to. Used for creating ressource urls and
    /// extracting the flash messages
    pub request: &'a HttpRequest,
    /// HTML title
    pub page_title: &'a str,
    /// The logged-in member, if any. Used for rendering the navigation bar.
    pub auth_token: Option<&'a AuthToken>,
    pub active_nav_button: Option<NavButton>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavButton {
    Reservations,
    OwnReservations,
    Help,
    FreeDays,
    Restrictions,
    Guests,
    Members,
    Settings,
    Account,
}

/// An entry of the navigation bar, as passed to the template
pub struct NavLink {
    pub url: String,
    pub label: &'static str,
    pub active: bool,
}

/// Navigation entries: endpoint name, label, nav button and the privilege required for showing it
const NAV_ENTRIES: [(&str, &str, NavButton, Privilege); 9] = [
    (
        "index",
        "Rezervări",
        NavButton::Reservations,
        Privilege::ShowReservations,
    ),
    (
        "my_reservations",
        "Rezervările mele",
        NavButton::OwnReservations,
        Privilege::CreateReservation,
    ),
    (
        "manage_free_days",
        "Zile libere",
        NavButton::FreeDays,
        Privilege::ManageFreeDays,
    ),
    (
        "manage_restrictions",
        "Restricții",
        NavButton::Restrictions,
        Privilege::ManageRestrictions,
    ),
    (
        "manage_guests",
        "Invitați",
        NavButton::Guests,
        Privilege::ManageGuests,
    ),
    (
        "manage_members",
        "Membri",
        NavButton::Members,
        Privilege::ManageMembers,
    ),
    (
        "global_settings_form",
        "Setări",
        NavButton::Settings,
        Privilege::ManageGlobalVars,
    ),
    (
        "change_password_form",
        "Parola",
        NavButton::Account,
        Privilege::ShowReservations,
    ),
    ("help", "Ajutor", NavButton::Help, Privilege::ShowReservations),
];

impl BaseTemplateContext<'_> {
    pub fn url_for_static(&self, file: &str) -> Result<String, UrlGenerationError> {
        let mut url = self.request.url_for("static_resources", [file])?;
        url.query_pairs_mut().append_pair(
            "hash",
            &Resources::get(file)
                .map(|f| bytes_to_hex(&f.metadata.sha256_hash()))
                .unwrap_or("unknown".to_string()),
        );
        Ok(url.to_string())
    }

    pub fn url_for(&self, endpoint: &str) -> Result<String, UrlGenerationError> {
        Ok(self.request.url_for_static(endpoint)?.to_string())
    }

    pub fn get_flashes(&self) -> Vec<ui::flash::FlashMessage> {
        self.request.get_and_clear_flashes()
    }

    /// Navigation bar entries, filtered by the privileges of the logged-in member. Empty when
    /// nobody is logged in.
    pub fn nav_links(&self) -> Result<Vec<NavLink>, UrlGenerationError> {
        let Some(auth_token) = self.auth_token else {
            return Ok(vec![]);
        };
        NAV_ENTRIES
            .iter()
            .filter(|(_, _, _, privilege)| auth_token.has_privilege(*privilege))
            .map(|(endpoint, label, button, _)| {
                Ok(NavLink {
                    url: self.url_for(endpoint)?,
                    label: *label,
                    active: self.active_nav_button == Some(*button),
                })
            })
            .collect()
    }

    pub fn is_logged_in(&self) -> bool {
        self.auth_token.is_some()
    }
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut output, b| {
        let _ = write!(output, "{:02x}", b);
        output
    })
}
