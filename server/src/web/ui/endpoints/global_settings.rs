use crate::data_store::auth_token::Privilege;
use crate::data_store::models::GlobalVars;
use crate::web::ui::base_template::{BaseTemplateContext, NavButton};
use crate::web::ui::error::AppError;
use crate::web::ui::form_values::{BoolFormValue, FormValue};
use crate::web::ui::sub_templates::form_inputs::{
    CheckboxTemplate, FormFieldTemplate, InputConfiguration,
};
use crate::web::ui::util;
use crate::web::AppState;
use actix_web::web::Html;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use askama::Template;
use log::info;
use serde::Deserialize;

#[get("/admin/settings")]
async fn global_settings_form(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let (auth, global_vars) = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageGlobalVars)?;
        let global_vars = store.get_global_vars(&auth)?;
        Ok((auth, global_vars))
    })
    .await??;

    let form_data = GlobalSettingsFormData::from(global_vars);
    let tmpl = GlobalSettingsTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Setări",
            auth_token: Some(&auth),
            active_nav_button: Some(NavButton::Settings),
        },
        form_data: &form_data,
    };
    Ok(Html::new(tmpl.render()?))
}

#[post("/admin/settings")]
async fn global_settings(
    state: web::Data<AppState>,
    data: web::Form<GlobalSettingsFormData>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let mut form_data = data.into_inner();
    let global_vars = form_data.validate();

    let (auth, result) = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageGlobalVars)?;
        let result: util::FormSubmitResult = match global_vars {
            Some(global_vars) => {
                let maintenance = global_vars.maintenance;
                let result = store.update_global_vars(&auth, global_vars);
                if result.is_ok() {
                    info!(
                        "Global settings updated by member {:?} (maintenance: {})",
                        auth.profile_id(),
                        maintenance
                    );
                }
                result.into()
            }
            None => util::FormSubmitResult::ValidationError,
        };
        Ok((auth, result))
    })
    .await??;

    let tmpl = GlobalSettingsTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Setări",
            auth_token: Some(&auth),
            active_nav_button: Some(NavButton::Settings),
        },
        form_data: &form_data,
    };
    util::create_edit_form_response(
        result,
        &tmpl,
        "Setările",
        req.url_for_static("global_settings_form")?.to_string(),
        &req,
    )
}

#[derive(Deserialize, Default)]
struct GlobalSettingsFormData {
    #[serde(default)]
    maintenance: BoolFormValue,
    #[serde(default)]
    entrance_code: FormValue<String>,
}

impl GlobalSettingsFormData {
    fn validate(&mut self) -> Option<GlobalVars> {
        let entrance_code = self.entrance_code.validate()?;
        Some(GlobalVars {
            maintenance: self.maintenance.get_value(),
            entrance_code: entrance_code.trim().to_owned(),
        })
    }
}

impl From<GlobalVars> for GlobalSettingsFormData {
    fn from(value: GlobalVars) -> Self {
        Self {
            maintenance: value.maintenance.into(),
            entrance_code: value.entrance_code.into(),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/global_settings.html")]
struct GlobalSettingsTemplate<'a> {
    base: BaseTemplateContext<'a>,
    form_data: &'a GlobalSettingsFormData,
}

impl GlobalSettingsTemplate<'_> {
    fn maintenance_checkbox(&self) -> CheckboxTemplate<'_> {
        CheckboxTemplate::new(
            &self.form_data.maintenance,
            "maintenance",
            "Mod întreținere",
            Some("Cât timp este activ, nu se pot face rezervări noi."),
        )
    }

    fn entrance_code_field(&self) -> FormFieldTemplate<'_, String> {
        FormFieldTemplate::new(
            &self.form_data.entrance_code,
            "entrance_code",
            "Cod de acces",
            InputConfiguration::builder()
                .info("Afișat doar membrilor cu o rezervare confirmată în ziua respectivă.")
                .optional()
                .build(),
        )
    }
}
