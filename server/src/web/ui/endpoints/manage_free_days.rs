use crate::booking::schedule::date_to_iso_string;
use crate::data_store::auth_token::{AuthToken, Privilege};
use crate::data_store::models::FreeDay;
use crate::data_store::StoreError;
use crate::web::ui::base_template::{BaseTemplateContext, NavButton};
use crate::web::ui::error::AppError;
use crate::web::ui::flash::{FlashMessage, FlashType, FlashesInterface};
use crate::web::ui::form_values::FormValue;
use crate::web::ui::sub_templates::form_inputs::{
    FormFieldTemplate, InputConfiguration, InputType,
};
use crate::web::ui::util;
use crate::web::ui::validation::{IsoDate, NonEmptyString};
use crate::web::AppState;
use actix_web::web::Html;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use askama::Template;
use chrono::NaiveDate;
use serde::Deserialize;

#[get("/admin/free-days")]
async fn manage_free_days(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let today = state.settings.today();
    let (auth, free_days) = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageFreeDays)?;
        let free_days = store.get_free_days(&auth, Some(today))?;
        Ok((auth, free_days))
    })
    .await??;

    let form_data = FreeDayFormData::default();
    let tmpl = ManageFreeDaysTemplate {
        base: base_context(&req, &auth),
        free_days: &free_days,
        form_data: &form_data,
    };
    Ok(Html::new(tmpl.render()?))
}

#[post("/admin/free-days")]
async fn save_free_day(
    state: web::Data<AppState>,
    data: web::Form<FreeDayFormData>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let today = state.settings.today();
    let mut form_data = data.into_inner();
    let free_day = form_data.validate();

    let (auth, free_days, result) = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageFreeDays)?;
        let result: util::FormSubmitResult = match free_day {
            Some(free_day) => store.create_or_update_free_day(&auth, free_day).into(),
            None => util::FormSubmitResult::ValidationError,
        };
        let free_days = store.get_free_days(&auth, Some(today))?;
        Ok((auth, free_days, result))
    })
    .await??;

    let tmpl = ManageFreeDaysTemplate {
        base: base_context(&req, &auth),
        free_days: &free_days,
        form_data: &form_data,
    };
    util::create_edit_form_response(
        result,
        &tmpl,
        "Ziua liberă",
        req.url_for_static("manage_free_days")?.to_string(),
        &req,
    )
}

#[post("/admin/free-days/{date}/delete")]
async fn delete_free_day(
    path: web::Path<NaiveDate>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let date = path.into_inner();
    let session_token = util::extract_session_token(&state, &req)?;
    let result = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageFreeDays)?;
        Ok(store.delete_free_day(&auth, date))
    })
    .await??;

    match result {
        Ok(()) => req.add_flash_message(FlashMessage::new(
            FlashType::Success,
            format!(
                "Ziua liberă din {} a fost ștearsă.",
                date_to_iso_string(date)
            ),
        )),
        Err(StoreError::NotExisting) => req.add_flash_message(FlashMessage::new(
            FlashType::Warning,
            "Ziua liberă nu mai există.",
        )),
        Err(e) => return Err(e.into()),
    }
    Ok(util::see_other(
        req.url_for_static("manage_free_days")?.to_string(),
    ))
}

fn base_context<'a>(req: &'a HttpRequest, auth: &'a AuthToken) -> BaseTemplateContext<'a> {
    BaseTemplateContext {
        request: req,
        page_title: "Zile libere",
        auth_token: Some(auth),
        active_nav_button: Some(NavButton::FreeDays),
    }
}

#[derive(Deserialize, Default)]
struct FreeDayFormData {
    #[serde(default)]
    date: FormValue<IsoDate>,
    #[serde(default)]
    description: FormValue<NonEmptyString>,
}

impl FreeDayFormData {
    fn validate(&mut self) -> Option<FreeDay> {
        let date = self.date.validate();
        let description = self.description.validate();
        Some(FreeDay {
            date: date?.into_inner(),
            description: description?.into_inner(),
        })
    }
}

#[derive(Template)]
#[template(path = "admin/manage_free_days.html")]
struct ManageFreeDaysTemplate<'a> {
    base: BaseTemplateContext<'a>,
    free_days: &'a [FreeDay],
    form_data: &'a FreeDayFormData,
}

impl ManageFreeDaysTemplate<'_> {
    fn delete_url(&self, free_day: &FreeDay) -> Result<String, AppError> {
        Ok(self
            .base
            .request
            .url_for("delete_free_day", [date_to_iso_string(free_day.date)])?
            .to_string())
    }

    fn format_date(&self, free_day: &FreeDay) -> String {
        free_day.date.format("%d.%m.%Y").to_string()
    }

    fn date_field(&self) -> FormFieldTemplate<'_, IsoDate> {
        FormFieldTemplate::new(
            &self.form_data.date,
            "date",
            "Data",
            InputConfiguration::builder()
                .input_type(InputType::Date)
                .info("Dacă data există deja, descrierea ei este actualizată.")
                .build(),
        )
    }

    fn description_field(&self) -> FormFieldTemplate<'_, NonEmptyString> {
        FormFieldTemplate::new(
            &self.form_data.description,
            "description",
            "Descriere",
            InputConfiguration::default(),
        )
    }
}
