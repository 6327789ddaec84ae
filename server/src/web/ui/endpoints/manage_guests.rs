use crate::data_store::auth_token::{AuthToken, Privilege};
use crate::data_store::models::{GuestInvite, Location, NewGuestInvite};
use crate::data_store::{GuestInviteId, SlotFilter, StoreError};
use crate::web::ui::base_template::{BaseTemplateContext, NavButton};
use crate::web::ui::error::AppError;
use crate::web::ui::flash::{FlashMessage, FlashType, FlashesInterface};
use crate::web::ui::form_values::{BoolFormValue, FormValue};
use crate::web::ui::sub_templates::form_inputs::{
    CheckboxTemplate, FormFieldTemplate, InputConfiguration, InputType, SelectEntry,
    SelectTemplate,
};
use crate::web::ui::util;
use crate::web::ui::validation::{GuestName, Hour, Int32FromList, IsoDate};
use crate::web::AppState;
use actix_web::web::Html;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use askama::Template;
use serde::Deserialize;

#[get("/admin/guests")]
async fn manage_guests(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let today = state.settings.today();
    let (auth, locations, guests) = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageGuests)?;
        let locations = store.get_locations(&auth)?;
        let guests =
            store.get_guest_invites(&auth, SlotFilter::builder().from_date(today).build())?;
        Ok((auth, locations, guests))
    })
    .await??;

    let form_data = GuestFormData::default();
    let tmpl = ManageGuestsTemplate {
        base: base_context(&req, &auth),
        locations: &locations,
        guests: &guests,
        form_data: &form_data,
    };
    Ok(Html::new(tmpl.render()?))
}

#[post("/admin/guests")]
async fn create_guest_invite(
    state: web::Data<AppState>,
    data: web::Form<GuestFormData>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let today = state.settings.today();
    let mut form_data = data.into_inner();

    let (auth, locations, guests, form_data, result) =
        web::block(move || -> Result<_, AppError> {
            let mut store = state.store.get_facade()?;
            let auth = store.get_auth_token_for_session(&session_token)?;
            auth.check_privilege(Privilege::ManageGuests)?;
            let locations = store.get_locations(&auth)?;
            let result: util::FormSubmitResult = match form_data.validate(&locations) {
                Some(guest_invite) => store.create_guest_invite(&auth, guest_invite).into(),
                None => util::FormSubmitResult::ValidationError,
            };
            let guests =
                store.get_guest_invites(&auth, SlotFilter::builder().from_date(today).build())?;
            Ok((auth, locations, guests, form_data, result))
        })
        .await??;

    let tmpl = ManageGuestsTemplate {
        base: base_context(&req, &auth),
        locations: &locations,
        guests: &guests,
        form_data: &form_data,
    };
    util::create_edit_form_response(
        result,
        &tmpl,
        "Invitația",
        req.url_for_static("manage_guests")?.to_string(),
        &req,
    )
}

#[post("/admin/guests/{guest_invite_id}/delete")]
async fn delete_guest_invite(
    path: web::Path<GuestInviteId>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let guest_invite_id = path.into_inner();
    let session_token = util::extract_session_token(&state, &req)?;
    let result = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageGuests)?;
        Ok(store.delete_guest_invite(&auth, guest_invite_id))
    })
    .await??;

    match result {
        Ok(()) => req.add_flash_message(FlashMessage::new(
            FlashType::Success,
            "Invitația a fost ștearsă.",
        )),
        Err(StoreError::NotExisting) => req.add_flash_message(FlashMessage::new(
            FlashType::Warning,
            "Invitația nu mai există.",
        )),
        Err(e) => return Err(e.into()),
    }
    Ok(util::see_other(
        req.url_for_static("manage_guests")?.to_string(),
    ))
}

fn base_context<'a>(req: &'a HttpRequest, auth: &'a AuthToken) -> BaseTemplateContext<'a> {
    BaseTemplateContext {
        request: req,
        page_title: "Invitați",
        auth_token: Some(auth),
        active_nav_button: Some(NavButton::Guests),
    }
}

#[derive(Deserialize, Default)]
struct GuestFormData {
    #[serde(default)]
    location_id: FormValue<Int32FromList>,
    #[serde(default)]
    guest_name: FormValue<GuestName>,
    #[serde(default)]
    start_date: FormValue<IsoDate>,
    #[serde(default)]
    start_hour: FormValue<Hour>,
    #[serde(default)]
    special: BoolFormValue,
}

impl GuestFormData {
    fn validate(&mut self, locations: &[Location]) -> Option<NewGuestInvite> {
        let location_ids: Vec<i32> = locations.iter().map(|l| l.id).collect();
        let location_id = self.location_id.validate_with(&location_ids);
        let guest_name = self.guest_name.validate();
        let start_date = self.start_date.validate();
        let start_hour = self.start_hour.validate();
        Some(NewGuestInvite {
            location_id: location_id?.into_inner(),
            guest_name: guest_name?.into_inner(),
            start_date: start_date?.into_inner(),
            start_hour: start_hour?.into_inner(),
            special: self.special.get_value(),
        })
    }
}

#[derive(Template)]
#[template(path = "admin/manage_guests.html")]
struct ManageGuestsTemplate<'a> {
    base: BaseTemplateContext<'a>,
    locations: &'a [Location],
    guests: &'a [GuestInvite],
    form_data: &'a GuestFormData,
}

impl ManageGuestsTemplate<'_> {
    fn location_name(&self, guest: &GuestInvite) -> &str {
        self.locations
            .iter()
            .find(|l| l.id == guest.location_id)
            .map(|l| l.name.as_str())
            .unwrap_or_default()
    }

    fn slot_label(&self, guest: &GuestInvite) -> String {
        format!(
            "{}, {:02}:00",
            guest.start_date.format("%d.%m.%Y"),
            guest.start_hour
        )
    }

    fn delete_url(&self, guest: &GuestInvite) -> Result<String, AppError> {
        Ok(self
            .base
            .request
            .url_for("delete_guest_invite", [guest.id.to_string()])?
            .to_string())
    }

    fn location_select(&self) -> SelectTemplate<'_, Int32FromList> {
        SelectTemplate::new(
            &self.form_data.location_id,
            "location_id",
            self.locations
                .iter()
                .map(|l| SelectEntry {
                    value: l.id.to_string().into(),
                    text: l.name.as_str().into(),
                })
                .collect(),
            "Locația",
            InputConfiguration::default(),
        )
    }

    fn guest_name_field(&self) -> FormFieldTemplate<'_, GuestName> {
        FormFieldTemplate::new(
            &self.form_data.guest_name,
            "guest_name",
            "Numele invitatului",
            InputConfiguration::default(),
        )
    }

    fn start_date_field(&self) -> FormFieldTemplate<'_, IsoDate> {
        FormFieldTemplate::new(
            &self.form_data.start_date,
            "start_date",
            "Data",
            InputConfiguration::builder()
                .input_type(InputType::Date)
                .build(),
        )
    }

    fn start_hour_field(&self) -> FormFieldTemplate<'_, Hour> {
        FormFieldTemplate::new(
            &self.form_data.start_hour,
            "start_hour",
            "Ora de început",
            InputConfiguration::builder()
                .input_type(InputType::Integer)
                .build(),
        )
    }

    fn special_checkbox(&self) -> CheckboxTemplate<'_> {
        CheckboxTemplate::new(
            &self.form_data.special,
            "special",
            "Invitat special",
            Some("Un invitat special rezervă integral intervalul."),
        )
    }
}
