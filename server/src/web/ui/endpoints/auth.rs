use crate::data_store::models::NewProfile;
use crate::data_store::StoreError;
use crate::web::ui::base_template::BaseTemplateContext;
use crate::web::ui::error::AppError;
use crate::web::ui::flash::{FlashMessage, FlashType, FlashesInterface};
use crate::web::ui::form_values::FormValue;
use crate::web::ui::sub_templates::form_inputs::{FormFieldTemplate, InputConfiguration, InputType};
use crate::web::ui::util;
use crate::web::ui::validation::{Email, MemberName, Password};
use crate::web::AppState;
use actix_web::web::Html;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use askama::Template;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Default)]
pub struct LoginQueryData {
    pub redirect_to: Option<String>,
}

#[get("/login")]
async fn login_form(
    req: HttpRequest,
    query: web::Query<LoginQueryData>,
) -> Result<impl Responder, AppError> {
    let form_data = LoginFormData::default();
    let tmpl = LoginFormTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Autentificare",
            auth_token: None,
            active_nav_button: None,
        },
        post_url: login_post_url(&req, &query)?,
        form_data: &form_data,
        error: None,
    };
    Ok(Html::new(tmpl.render()?))
}

#[post("/login")]
async fn login(
    state: web::Data<AppState>,
    data: web::Form<LoginFormData>,
    query: web::Query<LoginQueryData>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let mut form_data = data.into_inner();
    let email = form_data.email.string_value().to_owned();
    let password = form_data.password.string_value().to_owned();
    let store = state.store.clone();
    let result = web::block(move || -> Result<_, StoreError> {
        let mut store = store.get_facade()?;
        store.authenticate_with_password(&email, &password)
    })
    .await?;

    match result {
        Ok(session_token) => {
            let target = match util::sanitize_redirect_target(query.redirect_to.as_deref()) {
                Some(target) => target.to_owned(),
                None => req.url_for_static("index")?.to_string(),
            };
            Ok(HttpResponse::SeeOther()
                .cookie(util::create_session_cookie(session_token, &state.secret))
                .append_header((actix_web::http::header::LOCATION, target))
                .finish())
        }
        Err(StoreError::AuthenticationFailed) => {
            form_data.password.clear();
            let tmpl = LoginFormTemplate {
                base: BaseTemplateContext {
                    request: &req,
                    page_title: "Autentificare",
                    auth_token: None,
                    active_nav_button: None,
                },
                post_url: login_post_url(&req, &query)?,
                form_data: &form_data,
                error: Some("Adresa de email sau parola este greșită."),
            };
            Ok(util::html_response(
                HttpResponse::UnprocessableEntity(),
                tmpl.render()?,
            ))
        }
        Err(e) => Err(e.into()),
    }
}

fn login_post_url(req: &HttpRequest, query: &LoginQueryData) -> Result<String, AppError> {
    let mut url = req.url_for_static("login")?;
    if let Some(target) = util::sanitize_redirect_target(query.redirect_to.as_deref()) {
        url.set_query(Some(&serde_urlencoded::to_string(LoginQueryData {
            redirect_to: Some(target.to_owned()),
        })?));
    }
    Ok(url.to_string())
}

#[derive(Deserialize, Default)]
struct LoginFormData {
    #[serde(default)]
    email: FormValue<String>,
    #[serde(default)]
    password: FormValue<String>,
}

#[derive(Template)]
#[template(path = "login_form.html")]
struct LoginFormTemplate<'a> {
    base: BaseTemplateContext<'a>,
    post_url: String,
    form_data: &'a LoginFormData,
    error: Option<&'a str>,
}

impl LoginFormTemplate<'_> {
    fn email_field(&self) -> FormFieldTemplate<'_, String> {
        FormFieldTemplate::new(
            &self.form_data.email,
            "email",
            "Adresa de email",
            InputConfiguration::builder()
                .input_type(InputType::Email)
                .autocomplete("username")
                .build(),
        )
    }

    fn password_field(&self) -> FormFieldTemplate<'_, String> {
        FormFieldTemplate::new(
            &self.form_data.password,
            "password",
            "Parola",
            InputConfiguration::builder()
                .input_type(InputType::Password)
                .autocomplete("current-password")
                .build(),
        )
    }
}

#[get("/signup")]
async fn signup_form(req: HttpRequest) -> Result<impl Responder, AppError> {
    let form_data = SignupFormData::default();
    let tmpl = SignupFormTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Înregistrare",
            auth_token: None,
            active_nav_button: None,
        },
        form_data: &form_data,
    };
    Ok(Html::new(tmpl.render()?))
}

#[post("/signup")]
async fn signup(
    state: web::Data<AppState>,
    data: web::Form<SignupFormData>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let mut form_data = data.into_inner();
    let new_profile = form_data.validate();

    let result: util::FormSubmitResult = if let Some(new_profile) = new_profile {
        let store = state.store.clone();
        let result = web::block(move || -> Result<_, StoreError> {
            let mut store = store.get_facade()?;
            let email = new_profile.email.clone();
            let password = new_profile.password.clone();
            let profile = store.create_profile(new_profile)?;
            info!("New member {} signed up", profile.id);
            store.authenticate_with_password(&email, &password)
        })
        .await?;
        match result {
            Ok(session_token) => {
                req.add_flash_message(FlashMessage::new(
                    FlashType::Success,
                    "Bine ați venit! Contul a fost creat.",
                ));
                return Ok(HttpResponse::SeeOther()
                    .cookie(util::create_session_cookie(session_token, &state.secret))
                    .append_header((
                        actix_web::http::header::LOCATION,
                        req.url_for_static("index")?.to_string(),
                    ))
                    .finish());
            }
            Err(StoreError::ConflictEntityExists) => {
                form_data
                    .email
                    .add_error("Există deja un cont cu această adresă de email.".to_owned());
                util::FormSubmitResult::ValidationError
            }
            Err(e) => util::FormSubmitResult::UnexpectedError(e.into()),
        }
    } else {
        util::FormSubmitResult::ValidationError
    };

    form_data.password.clear();
    form_data.password_confirmation.clear();
    let tmpl = SignupFormTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Înregistrare",
            auth_token: None,
            active_nav_button: None,
        },
        form_data: &form_data,
    };
    util::create_edit_form_response(
        result,
        &tmpl,
        "Contul",
        req.url_for_static("index")?.to_string(),
        &req,
    )
}

#[derive(Deserialize, Default)]
struct SignupFormData {
    #[serde(default)]
    name: FormValue<MemberName>,
    #[serde(default)]
    email: FormValue<Email>,
    #[serde(default)]
    password: FormValue<Password>,
    #[serde(default)]
    password_confirmation: FormValue<String>,
}

impl SignupFormData {
    fn validate(&mut self) -> Option<NewProfile> {
        let name = self.name.validate();
        let email = self.email.validate();
        let password = self.password.validate();
        let confirmation = self.password_confirmation.validate();
        if let (Some(password), Some(confirmation)) = (&password, &confirmation) {
            if password.0 != *confirmation {
                self.password_confirmation
                    .add_error("Parolele nu coincid.".to_owned());
                return None;
            }
        }

        Some(NewProfile {
            email: email?.into_inner(),
            name: name?.into_inner(),
            password: password?.into_inner(),
        })
    }
}

#[derive(Template)]
#[template(path = "signup_form.html")]
struct SignupFormTemplate<'a> {
    base: BaseTemplateContext<'a>,
    form_data: &'a SignupFormData,
}

impl SignupFormTemplate<'_> {
    fn name_field(&self) -> FormFieldTemplate<'_, MemberName> {
        FormFieldTemplate::new(
            &self.form_data.name,
            "name",
            "Nume complet",
            InputConfiguration::builder().autocomplete("name").build(),
        )
    }

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

    fn password_field(&self) -> FormFieldTemplate<'_, Password> {
        FormFieldTemplate::new(
            &self.form_data.password,
            "password",
            "Parola",
            InputConfiguration::builder()
                .input_type(InputType::Password)
                .autocomplete("new-password")
                .info("Cel puțin 8 caractere.")
                .build(),
        )
    }

    fn password_confirmation_field(&self) -> FormFieldTemplate<'_, String> {
        FormFieldTemplate::new(
            &self.form_data.password_confirmation,
            "password_confirmation",
            "Confirmare parolă",
            InputConfiguration::builder()
                .input_type(InputType::Password)
                .autocomplete("new-password")
                .build(),
        )
    }
}

#[post("/logout")]
async fn logout(req: HttpRequest) -> Result<impl Responder, AppError> {
    req.add_flash_message(FlashMessage::new(FlashType::Info, "Ați fost deconectat(ă)."));
    Ok(HttpResponse::SeeOther()
        .cookie(util::create_logout_cookie())
        .append_header((
            actix_web::http::header::LOCATION,
            req.url_for_static("login_form")?.to_string(),
        ))
        .finish())
}
