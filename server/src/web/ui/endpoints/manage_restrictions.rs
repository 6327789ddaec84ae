use crate::data_store::auth_token::{AuthToken, Privilege};
use crate::data_store::models::{Location, NewReservationRestriction, ReservationRestriction};
use crate::data_store::{RestrictionId, SlotFilter, StoreError};
use crate::web::ui::base_template::{BaseTemplateContext, NavButton};
use crate::web::ui::error::AppError;
use crate::web::ui::flash::{FlashMessage, FlashType, FlashesInterface};
use crate::web::ui::form_values::FormValue;
use crate::web::ui::sub_templates::form_inputs::{
    FormFieldTemplate, InputConfiguration, InputType, SelectEntry, SelectTemplate,
};
use crate::web::ui::util;
use crate::web::ui::validation::{Hour, Int32FromList, IsoDate, NonEmptyString};
use crate::web::AppState;
use actix_web::web::Html;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use askama::Template;
use serde::Deserialize;

#[get("/admin/restrictions")]
async fn manage_restrictions(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let today = state.settings.today();
    let (auth, locations, restrictions) = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageRestrictions)?;
        let locations = store.get_locations(&auth)?;
        let restrictions =
            store.get_restrictions(&auth, SlotFilter::builder().from_date(today).build())?;
        Ok((auth, locations, restrictions))
    })
    .await??;

    let form_data = RestrictionFormData::default();
    let tmpl = ManageRestrictionsTemplate {
        base: base_context(&req, &auth),
        locations: &locations,
        restrictions: &restrictions,
        form_data: &form_data,
    };
    Ok(Html::new(tmpl.render()?))
}

#[post("/admin/restrictions")]
async fn create_restriction(
    state: web::Data<AppState>,
    data: web::Form<RestrictionFormData>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let today = state.settings.today();
    let mut form_data = data.into_inner();

    let (auth, locations, restrictions, form_data, result) =
        web::block(move || -> Result<_, AppError> {
            let mut store = state.store.get_facade()?;
            let auth = store.get_auth_token_for_session(&session_token)?;
            auth.check_privilege(Privilege::ManageRestrictions)?;
            let locations = store.get_locations(&auth)?;
            let result: util::FormSubmitResult = match form_data.validate(&locations) {
                Some(restriction) => store.create_restriction(&auth, restriction).into(),
                None => util::FormSubmitResult::ValidationError,
            };
            let restrictions =
                store.get_restrictions(&auth, SlotFilter::builder().from_date(today).build())?;
            Ok((auth, locations, restrictions, form_data, result))
        })
        .await??;

    let tmpl = ManageRestrictionsTemplate {
        base: base_context(&req, &auth),
        locations: &locations,
        restrictions: &restrictions,
        form_data: &form_data,
    };
    util::create_edit_form_response(
        result,
        &tmpl,
        "Restricția",
        req.url_for_static("manage_restrictions")?.to_string(),
        &req,
    )
}

#[post("/admin/restrictions/{restriction_id}/delete")]
async fn delete_restriction(
    path: web::Path<RestrictionId>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let restriction_id = path.into_inner();
    let session_token = util::extract_session_token(&state, &req)?;
    let result = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageRestrictions)?;
        Ok(store.delete_restriction(&auth, restriction_id))
    })
    .await??;

    match result {
        Ok(()) => req.add_flash_message(FlashMessage::new(
            FlashType::Success,
            "Restricția a fost ștearsă.",
        )),
        Err(StoreError::NotExisting) => req.add_flash_message(FlashMessage::new(
            FlashType::Warning,
            "Restricția nu mai există.",
        )),
        Err(e) => return Err(e.into()),
    }
    Ok(util::see_other(
        req.url_for_static("manage_restrictions")?.to_string(),
    ))
}

fn base_context<'a>(req: &'a HttpRequest, auth: &'a AuthToken) -> BaseTemplateContext<'a> {
    BaseTemplateContext {
        request: req,
        page_title: "Restricții",
        auth_token: Some(auth),
        active_nav_button: Some(NavButton::Restrictions),
    }
}

#[derive(Deserialize, Default)]
struct RestrictionFormData {
    #[serde(default)]
    location_id: FormValue<Int32FromList>,
    #[serde(default)]
    date: FormValue<IsoDate>,
    #[serde(default)]
    start_hour: FormValue<Hour>,
    #[serde(default)]
    message: FormValue<NonEmptyString>,
}

impl RestrictionFormData {
    fn validate(&mut self, locations: &[Location]) -> Option<NewReservationRestriction> {
        let location_ids: Vec<i32> = locations.iter().map(|l| l.id).collect();
        let location_id = self.location_id.validate_with(&location_ids);
        let date = self.date.validate();
        let start_hour = self.start_hour.validate();
        let message = self.message.validate();
        Some(NewReservationRestriction {
            location_id: location_id?.into_inner(),
            date: date?.into_inner(),
            start_hour: start_hour?.into_inner(),
            message: message?.into_inner(),
        })
    }
}

#[derive(Template)]
#[template(path = "admin/manage_restrictions.html")]
struct ManageRestrictionsTemplate<'a> {
    base: BaseTemplateContext<'a>,
    locations: &'a [Location],
    restrictions: &'a [ReservationRestriction],
    form_data: &'a RestrictionFormData,
}

impl ManageRestrictionsTemplate<'_> {
    fn location_name(&self, restriction: &ReservationRestriction) -> &str {
        self.locations
            .iter()
            .find(|l| l.id == restriction.location_id)
            .map(|l| l.name.as_str())
            .unwrap_or_default()
    }

    fn slot_label(&self, restriction: &ReservationRestriction) -> String {
        format!(
            "{}, {:02}:00",
            restriction.date.format("%d.%m.%Y"),
            restriction.start_hour
        )
    }

    fn delete_url(&self, restriction: &ReservationRestriction) -> Result<String, AppError> {
        Ok(self
            .base
            .request
            .url_for("delete_restriction", [restriction.id.to_string()])?
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

    fn date_field(&self) -> FormFieldTemplate<'_, IsoDate> {
        FormFieldTemplate::new(
            &self.form_data.date,
            "date",
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
                .info("Ora de început a intervalului de rezervare (0-23).")
                .build(),
        )
    }

    fn message_field(&self) -> FormFieldTemplate<'_, NonEmptyString> {
        FormFieldTemplate::new(
            &self.form_data.message,
            "message",
            "Mesaj",
            InputConfiguration::builder()
                .info("Motivul restricției, afișat membrilor în lista de rezervări.")
                .build(),
        )
    }
}
