use crate::data_store::StoreError;
use crate::web::ui::base_template::{BaseTemplateContext, NavButton};
use crate::web::ui::error::AppError;
use crate::web::ui::flash::{FlashMessage, FlashType, FlashesInterface};
use crate::web::ui::form_values::FormValue;
use crate::web::ui::sub_templates::form_inputs::{FormFieldTemplate, InputConfiguration, InputType};
use crate::web::ui::util;
use crate::web::ui::validation::{Email, Password};
use crate::web::AppState;
use actix_web::web::Html;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use askama::Template;
use log::info;
use serde::Deserialize;

#[get("/password/forgot")]
async fn forgot_password_form(req: HttpRequest) -> Result<impl Responder, AppError> {
    let form_data = ForgotPasswordFormData::default();
    let tmpl = ForgotPasswordFormTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Resetare parolă",
            auth_token: None,
            active_nav_button: None,
        },
        form_data: &form_data,
    };
    Ok(Html::new(tmpl.render()?))
}

/// Create a password reset token for the given email address.
///
/// There is no mail delivery: the reset link is written to the log, from where an administrator
/// can pass it on. The response is the same for known and unknown email addresses.
#[post("/password/forgot")]
async fn forgot_password(
    state: web::Data<AppState>,
    data: web::Form<ForgotPasswordFormData>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let mut form_data = data.into_inner();
    let Some(email) = form_data.email.validate() else {
        let tmpl = ForgotPasswordFormTemplate {
            base: BaseTemplateContext {
                request: &req,
                page_title: "Resetare parolă",
                auth_token: None,
                active_nav_button: None,
            },
            form_data: &form_data,
        };
        return util::create_edit_form_response(
            util::FormSubmitResult::ValidationError,
            &tmpl,
            "Cererea",
            String::new(),
            &req,
        );
    };

    let store = state.store.clone();
    let result = web::block(move || -> Result<_, AppError> {
        let mut store = store.get_facade()?;
        Ok(store.create_password_reset_token(&email.into_inner())?)
    })
    .await??;

    match result {
        Some((profile, token)) => {
            let link = reset_link(&state, &req, &token)?;
            info!(
                "Password reset requested for member {} <{}>. Reset link: {}",
                profile.id, profile.email, link
            );
        }
        None => {
            info!("Password reset requested for unknown email address");
        }
    }

    req.add_flash_message(FlashMessage::new(
        FlashType::Info,
        "Dacă există un cont cu această adresă de email, a fost generat un link de resetare a parolei. Un fondator al clubului vi-l poate transmite.",
    ));
    Ok(util::see_other(req.url_for_static("login_form")?.to_string()))
}

/// Absolute URL of the password reset form for the given token. Uses the configured public base
/// URL, if any, and the request's host otherwise.
fn reset_link(state: &AppState, req: &HttpRequest, token: &str) -> Result<String, AppError> {
    let url = req.url_for("reset_password_form", [token])?;
    Ok(match &state.public_base_url {
        Some(base_url) => format!("{}{}", base_url.trim_end_matches('/'), url.path()),
        None => url.to_string(),
    })
}

#[derive(Deserialize, Default)]
struct ForgotPasswordFormData {
    #[serde(default)]
    email: FormValue<Email>,
}

#[derive(Template)]
#[template(path = "password_forgot_form.html")]
struct ForgotPasswordFormTemplate<'a> {
    base: BaseTemplateContext<'a>,
    form_data: &'a ForgotPasswordFormData,
}

impl ForgotPasswordFormTemplate<'_> {
    fn email_field(&self) -> FormFieldTemplate<'_, Email> {
        FormFieldTemplate::new(
            &self.form_data.email,
            "email",
            "Adresa de email",
            InputConfiguration::builder()
                .input_type(InputType::Email)
                .autocomplete("email")
                .build(),
        )
    }
}

#[get("/password/reset/{token}")]
async fn reset_password_form(
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let token = path.into_inner();
    let form_data = NewPasswordFormData::default();
    let tmpl = ResetPasswordFormTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Parolă nouă",
            auth_token: None,
            active_nav_button: None,
        },
        post_url: req.url_for("reset_password", [&token])?.to_string(),
        form_data: &form_data,
    };
    Ok(Html::new(tmpl.render()?))
}

#[post("/password/reset/{token}")]
async fn reset_password(
    path: web::Path<String>,
    state: web::Data<AppState>,
    data: web::Form<NewPasswordFormData>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();
    let mut form_data = data.into_inner();
    let new_password = form_data.validate();

    let result = if let Some(new_password) = new_password {
        let store = state.store.clone();
        let token = token.clone();
        let result = web::block(move || -> Result<_, StoreError> {
            let mut store = store.get_facade()?;
            store.reset_password_with_token(&token, &new_password)
        })
        .await?;
        match result {
            Ok(profile_id) => {
                info!("Member {} has reset their password", profile_id);
                req.add_flash_message(FlashMessage::new(
                    FlashType::Success,
                    "Parola a fost schimbată. Vă puteți autentifica cu parola nouă.",
                ));
                return Ok(util::see_other(
                    req.url_for_static("login_form")?.to_string(),
                ));
            }
            Err(StoreError::NotExisting) => util::FormSubmitResult::Rejected(
                "Linkul de resetare este invalid sau a expirat. Vă rugăm solicitați unul nou."
                    .to_owned(),
            ),
            Err(e) => util::FormSubmitResult::UnexpectedError(e.into()),
        }
    } else {
        util::FormSubmitResult::ValidationError
    };

    form_data.clear_passwords();
    let tmpl = ResetPasswordFormTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Parolă nouă",
            auth_token: None,
            active_nav_button: None,
        },
        post_url: req.url_for("reset_password", [&token])?.to_string(),
        form_data: &form_data,
    };
    util::create_edit_form_response(
        result,
        &tmpl,
        "Parola",
        req.url_for_static("change_password_form")?.to_string(),
        &req,
    )
}

#[get("/account/password")]
async fn change_password_form(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let auth = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        Ok(store.get_auth_token_for_session(&session_token)?)
    })
    .await??;

    let form_data = ChangePasswordFormData::default();
    let tmpl = ChangePasswordFormTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Schimbare parolă",
            auth_token: Some(&auth),
            active_nav_button: Some(NavButton::Account),
        },
        form_data: &form_data,
    };
    Ok(Html::new(tmpl.render()?))
}

/// Change the own password. All other sessions of the member are signed out, the current client
/// gets a fresh session cookie.
#[post("/account/password")]
async fn change_password(
    state: web::Data<AppState>,
    data: web::Form<ChangePasswordFormData>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let store = state.store.clone();
    let auth = web::block(move || -> Result<_, AppError> {
        let mut store = store.get_facade()?;
        Ok(store.get_auth_token_for_session(&session_token)?)
    })
    .await??;

    let mut form_data = data.into_inner();
    let current_password = form_data.current_password.validate();
    let new_password =
        validate_new_password(&mut form_data.password, &mut form_data.password_confirmation);

    let result = if let (Some(current_password), Some(new_password)) =
        (current_password, new_password)
    {
        let store = state.store.clone();
        let auth_clone = auth.clone();
        let result = web::block(move || -> Result<_, StoreError> {
            let mut store = store.get_facade()?;
            store.update_password(&auth_clone, &current_password, &new_password)
        })
        .await?;
        match result {
            Ok(new_session_token) => {
                info!(
                    "Member {} changed their password",
                    new_session_token.profile_id()
                );
                req.add_flash_message(FlashMessage::new(
                    FlashType::Success,
                    "Parola a fost schimbată. Celelalte sesiuni au fost deconectate.",
                ));
                return Ok(HttpResponse::SeeOther()
                    .cookie(util::create_session_cookie(
                        new_session_token,
                        &state.secret,
                    ))
                    .append_header((
                        actix_web::http::header::LOCATION,
                        req.url_for_static("change_password_form")?.to_string(),
                    ))
                    .finish());
            }
            Err(StoreError::AuthenticationFailed) => {
                form_data
                    .current_password
                    .add_error("Parola curentă este greșită.".to_owned());
                util::FormSubmitResult::ValidationError
            }
            Err(e) => util::FormSubmitResult::UnexpectedError(e.into()),
        }
    } else {
        util::FormSubmitResult::ValidationError
    };

    form_data.current_password.clear();
    form_data.password.clear();
    form_data.password_confirmation.clear();
    let tmpl = ChangePasswordFormTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Schimbare parolă",
            auth_token: Some(&auth),
            active_nav_button: Some(NavButton::Account),
        },
        form_data: &form_data,
    };
    util::create_edit_form_response(
        result,
        &tmpl,
        "Parola",
        req.url_for_static("change_password_form")?.to_string(),
        &req,
    )
}

/// A new password together with its confirmation
#[derive(Deserialize, Default)]
pub struct NewPasswordFormData {
    #[serde(default)]
    password: FormValue<Password>,
    #[serde(default)]
    password_confirmation: FormValue<String>,
}

impl NewPasswordFormData {
    pub fn validate(&mut self) -> Option<String> {
        validate_new_password(&mut self.password, &mut self.password_confirmation)
    }

    pub fn clear_passwords(&mut self) {
        self.password.clear();
        self.password_confirmation.clear();
    }

    pub fn password_field(&self) -> FormFieldTemplate<'_, Password> {
        new_password_field(&self.password)
    }

    pub fn password_confirmation_field(&self) -> FormFieldTemplate<'_, String> {
        password_confirmation_field(&self.password_confirmation)
    }
}

/// Validate a new password and check that the confirmation matches
fn validate_new_password(
    password: &mut FormValue<Password>,
    confirmation: &mut FormValue<String>,
) -> Option<String> {
    let password_value = password.validate()?.into_inner();
    let confirmation_value = confirmation.validate()?;
    if password_value != confirmation_value {
        confirmation.add_error("Parolele nu coincid.".to_owned());
        return None;
    }
    Some(password_value)
}

fn new_password_field(data: &FormValue<Password>) -> FormFieldTemplate<'_, Password> {
    FormFieldTemplate::new(
        data,
        "password",
        "Parola nouă",
        InputConfiguration::builder()
            .input_type(InputType::Password)
            .autocomplete("new-password")
            .info("Cel puțin 8 caractere.")
            .build(),
    )
}

fn password_confirmation_field(data: &FormValue<String>) -> FormFieldTemplate<'_, String> {
    FormFieldTemplate::new(
        data,
        "password_confirmation",
        "Confirmare parolă nouă",
        InputConfiguration::builder()
            .input_type(InputType::Password)
            .autocomplete("new-password")
            .build(),
    )
}

#[derive(Template)]
#[template(path = "password_reset_form.html")]
struct ResetPasswordFormTemplate<'a> {
    base: BaseTemplateContext<'a>,
    post_url: String,
    form_data: &'a NewPasswordFormData,
}

impl ResetPasswordFormTemplate<'_> {
    fn password_field(&self) -> FormFieldTemplate<'_, Password> {
        self.form_data.password_field()
    }

    fn password_confirmation_field(&self) -> FormFieldTemplate<'_, String> {
        self.form_data.password_confirmation_field()
    }
}

#[derive(Deserialize, Default)]
struct ChangePasswordFormData {
    #[serde(default)]
    current_password: FormValue<String>,
    #[serde(default)]
    password: FormValue<Password>,
    #[serde(default)]
    password_confirmation: FormValue<String>,
}

#[derive(Template)]
#[template(path = "account_password_form.html")]
struct ChangePasswordFormTemplate<'a> {
    base: BaseTemplateContext<'a>,
    form_data: &'a ChangePasswordFormData,
}

impl ChangePasswordFormTemplate<'_> {
    fn current_password_field(&self) -> FormFieldTemplate<'_, String> {
        FormFieldTemplate::new(
            &self.form_data.current_password,
            "current_password",
            "Parola curentă",
            InputConfiguration::builder()
                .input_type(InputType::Password)
                .autocomplete("current-password")
                .build(),
        )
    }

    fn password_field(&self) -> FormFieldTemplate<'_, Password> {
        new_password_field(&self.form_data.password)
    }

    fn password_confirmation_field(&self) -> FormFieldTemplate<'_, String> {
        password_confirmation_field(&self.form_data.password_confirmation)
    }
}
