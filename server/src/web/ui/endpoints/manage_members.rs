use crate::data_store::auth_token::{AuthToken, MemberRole, Privilege};
use crate::data_store::models::{Profile, ProfilePatch};
use crate::data_store::ProfileId;
use crate::web::ui::base_template::{BaseTemplateContext, NavButton};
use crate::web::ui::endpoints::password::NewPasswordFormData;
use crate::web::ui::error::AppError;
use crate::web::ui::form_values::{BoolFormValue, FormValue};
use crate::web::ui::sub_templates::form_inputs::{
    CheckboxTemplate, FormFieldTemplate, InputConfiguration, SelectEntry, SelectTemplate,
};
use crate::web::ui::util;
use crate::web::ui::validation::{MemberName, Password, Role};
use crate::web::AppState;
use actix_web::web::Html;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use askama::Template;
use log::info;
use serde::Deserialize;

#[get("/admin/members")]
async fn manage_members(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let (auth, profiles) = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageMembers)?;
        let profiles = store.get_profiles(&auth)?;
        Ok((auth, profiles))
    })
    .await??;

    let tmpl = ManageMembersTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Membri",
            auth_token: Some(&auth),
            active_nav_button: Some(NavButton::Members),
        },
        profiles: &profiles,
    };
    Ok(Html::new(tmpl.render()?))
}

#[derive(Template)]
#[template(path = "admin/manage_members.html")]
struct ManageMembersTemplate<'a> {
    base: BaseTemplateContext<'a>,
    profiles: &'a [Profile],
}

impl ManageMembersTemplate<'_> {
    fn edit_url(&self, profile: &Profile) -> Result<String, AppError> {
        Ok(self
            .base
            .request
            .url_for("edit_member_form", [profile.id.to_string()])?
            .to_string())
    }
}

#[get("/admin/members/{profile_id}/edit")]
async fn edit_member_form(
    path: web::Path<ProfileId>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let profile_id = path.into_inner();
    let session_token = util::extract_session_token(&state, &req)?;
    let (auth, profile) = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageMembers)?;
        let profile = store.get_profile(&auth, profile_id)?;
        Ok((auth, profile))
    })
    .await??;

    let form_data = MemberFormData::from(&profile);
    let password_form_data = NewPasswordFormData::default();
    let tmpl = EditMemberTemplate {
        base: base_context(&req, &auth),
        profile: &profile,
        form_data: &form_data,
        password_form_data: &password_form_data,
    };
    Ok(Html::new(tmpl.render()?))
}

#[post("/admin/members/{profile_id}/edit")]
async fn edit_member(
    path: web::Path<ProfileId>,
    state: web::Data<AppState>,
    data: web::Form<MemberFormData>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let profile_id = path.into_inner();
    let session_token = util::extract_session_token(&state, &req)?;
    let mut form_data = data.into_inner();
    let patch = form_data.validate();

    let (auth, profile, result) = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageMembers)?;
        let result: util::FormSubmitResult = match patch {
            Some(patch) if demotes_oneself(&auth, profile_id, &patch) => {
                util::FormSubmitResult::Rejected(
                    "Nu vă puteți retrage propriul rol de fondator.".to_owned(),
                )
            }
            Some(patch) => store.update_profile(&auth, profile_id, patch).into(),
            None => util::FormSubmitResult::ValidationError,
        };
        let profile = store.get_profile(&auth, profile_id)?;
        Ok((auth, profile, result))
    })
    .await??;

    if let util::FormSubmitResult::Success = result {
        info!(
            "Profile of member {} updated by member {:?}",
            profile.id,
            auth.profile_id()
        );
    }
    let password_form_data = NewPasswordFormData::default();
    let tmpl = EditMemberTemplate {
        base: base_context(&req, &auth),
        profile: &profile,
        form_data: &form_data,
        password_form_data: &password_form_data,
    };
    util::create_edit_form_response(
        result,
        &tmpl,
        "Membrul",
        req.url_for_static("manage_members")?.to_string(),
        &req,
    )
}

#[post("/admin/members/{profile_id}/password")]
async fn set_member_password(
    path: web::Path<ProfileId>,
    state: web::Data<AppState>,
    data: web::Form<NewPasswordFormData>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let profile_id = path.into_inner();
    let session_token = util::extract_session_token(&state, &req)?;
    let mut password_form_data = data.into_inner();
    let new_password = password_form_data.validate();

    let (auth, profile, result) = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        auth.check_privilege(Privilege::ManageMembers)?;
        let result: util::FormSubmitResult = match new_password {
            Some(new_password) => store.set_password(&auth, profile_id, &new_password).into(),
            None => util::FormSubmitResult::ValidationError,
        };
        let profile = store.get_profile(&auth, profile_id)?;
        Ok((auth, profile, result))
    })
    .await??;

    if let util::FormSubmitResult::Success = result {
        info!(
            "Password of member {} set by member {:?}",
            profile.id,
            auth.profile_id()
        );
    }
    password_form_data.clear_passwords();
    let form_data = MemberFormData::from(&profile);
    let tmpl = EditMemberTemplate {
        base: base_context(&req, &auth),
        profile: &profile,
        form_data: &form_data,
        password_form_data: &password_form_data,
    };
    util::create_edit_form_response(
        result,
        &tmpl,
        "Parola membrului",
        req.url_for_static("manage_members")?.to_string(),
        &req,
    )
}

/// Founders may not remove their own founder role. Another founder has to do it.
fn demotes_oneself(auth: &AuthToken, profile_id: ProfileId, patch: &ProfilePatch) -> bool {
    auth.profile_id() == Some(profile_id)
        && patch.role.is_some_and(|role| role != MemberRole::Founder)
}

fn base_context<'a>(req: &'a HttpRequest, auth: &'a AuthToken) -> BaseTemplateContext<'a> {
    BaseTemplateContext {
        request: req,
        page_title: "Editare membru",
        auth_token: Some(auth),
        active_nav_button: Some(NavButton::Members),
    }
}

#[derive(Deserialize, Default)]
struct MemberFormData {
    #[serde(default)]
    name: FormValue<MemberName>,
    #[serde(default)]
    role: FormValue<Role>,
    #[serde(default)]
    has_key: BoolFormValue,
}

impl MemberFormData {
    fn validate(&mut self) -> Option<ProfilePatch> {
        let name = self.name.validate();
        let role = self.role.validate();
        Some(ProfilePatch {
            name: Some(name?.into_inner()),
            role: Some(role?.into_inner()),
            has_key: Some(self.has_key.get_value()),
        })
    }
}

impl From<&Profile> for MemberFormData {
    fn from(value: &Profile) -> Self {
        Self {
            name: MemberName(value.name.clone()).into(),
            role: Role(value.role).into(),
            has_key: value.has_key.into(),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/edit_member.html")]
struct EditMemberTemplate<'a> {
    base: BaseTemplateContext<'a>,
    profile: &'a Profile,
    form_data: &'a MemberFormData,
    password_form_data: &'a NewPasswordFormData,
}

impl EditMemberTemplate<'_> {
    fn edit_url(&self) -> Result<String, AppError> {
        Ok(self
            .base
            .request
            .url_for("edit_member", [self.profile.id.to_string()])?
            .to_string())
    }

    fn password_url(&self) -> Result<String, AppError> {
        Ok(self
            .base
            .request
            .url_for("set_member_password", [self.profile.id.to_string()])?
            .to_string())
    }

    fn name_field(&self) -> FormFieldTemplate<'_, MemberName> {
        FormFieldTemplate::new(
            &self.form_data.name,
            "name",
            "Nume",
            InputConfiguration::default(),
        )
    }

    fn role_select(&self) -> SelectTemplate<'_, Role> {
        SelectTemplate::new(
            &self.form_data.role,
            "role",
            MemberRole::ALL
                .iter()
                .map(|role| SelectEntry {
                    value: i32::from(*role).to_string().into(),
                    text: role.name().into(),
                })
                .collect(),
            "Rol",
            InputConfiguration::default(),
        )
    }

    fn has_key_checkbox(&self) -> CheckboxTemplate<'_> {
        CheckboxTemplate::new(
            &self.form_data.has_key,
            "has_key",
            "Are cheia sălii",
            Some("Rezervările unui interval sunt confirmate când un membru cu cheie îl rezervă."),
        )
    }

    fn password_field(&self) -> FormFieldTemplate<'_, Password> {
        self.password_form_data.password_field()
    }

    fn password_confirmation_field(&self) -> FormFieldTemplate<'_, String> {
        self.password_form_data.password_confirmation_field()
    }
}
